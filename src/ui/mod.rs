//! HTML rendering. Templates are compiled into the binary and rendered with
//! handlebars, which escapes every interpolated value.

use axum::http::StatusCode;
use handlebars::{Handlebars, RenderError};
use serde::Serialize;
use serde_json::json;
use std::sync::LazyLock;

use crate::error::TrackerError;

const TEMPLATES_SRC: &[(&str, &str)] = &[
    ("error", include_str!("../../templates/error.hbs")),
    ("home", include_str!("../../templates/home.hbs")),
    ("purchases", include_str!("../../templates/purchases.hbs")),
    ("reports", include_str!("../../templates/reports.hbs")),
    ("files", include_str!("../../templates/files.hbs")),
];

const PARTIALS_SRC: &[(&str, &str)] = &[
    ("header", include_str!("../../templates/header.hbs")),
    ("footer", include_str!("../../templates/footer.hbs")),
    ("table", include_str!("../../templates/table.hbs")),
];

static TEMPLATES: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    build_registry().expect("FATAL: bundled templates failed to compile")
});

fn build_registry() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut hb = Handlebars::new();
    for (name, src) in PARTIALS_SRC {
        hb.register_partial(name, *src)?;
    }
    for (name, src) in TEMPLATES_SRC {
        hb.register_template_string(name, *src)?;
    }
    Ok(hb)
}

/// A one-line status message shown under the page title.
#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            text: text.into(),
        }
    }
}

/// `<option>` entry for select widgets.
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

pub fn render<T: Serialize>(name: &str, data: &T) -> Result<String, TrackerError> {
    Ok(TEMPLATES.render(name, data)?)
}

pub fn render_error(status: StatusCode, message: &str) -> Result<String, RenderError> {
    TEMPLATES.render(
        "error",
        &json!({
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "message": message,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_templates_compile() {
        build_registry().unwrap();
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let html = render_error(StatusCode::BAD_REQUEST, "<script>alert(1)</script>").unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn table_partial_marks_total_rows() {
        let html = render(
            "reports",
            &json!({
                "title": "Reports",
                "summary": {
                    "headers": ["Category", "Purchase Amount"],
                    "rows": [
                        {"cells": ["Cement", "₹10.00"], "emphasis": false},
                        {"cells": ["Total", "₹10.00"], "emphasis": true},
                    ],
                },
            }),
        )
        .unwrap();
        assert!(html.contains(r#"<tr class="total"><td>Total</td>"#));
    }
}
