use crate::db::Dimension;
use crate::handlers::{Page, UserView, page};
use crate::middleware::session::AuthSession;
use crate::types::report::{pivot_table, purchases_table, summary_table, title_case};
use crate::ui::SelectOption;
use crate::{TrackerError, router::AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

/// Report selections carried in the query string.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default = "default_dimension")]
    pub dimension: Dimension,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default = "default_dimension")]
    pub group: Dimension,
    #[serde(default = "default_dimension")]
    pub rows: Dimension,
    #[serde(default = "default_pivot_columns")]
    pub columns: Dimension,
}

fn default_dimension() -> Dimension {
    Dimension::Category
}

fn default_pivot_columns() -> Dimension {
    Dimension::Stage
}

/// GET /reports -> filtered listing, summary and pivot for the project.
pub async fn reports_page(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<ReportQuery>,
) -> Result<Page, TrackerError> {
    let project_id = session.project()?;
    let currency = state.currency.as_ref();

    let storage = state.storage().await?;
    let values = storage.distinct_values(project_id, query.dimension).await?;
    let selected = query
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| values.first().cloned());

    let matching = match selected.as_deref() {
        Some(v) => Some(
            storage
                .purchases_matching(project_id, query.dimension, v)
                .await?,
        ),
        None => None,
    };
    let summary = storage.summary(project_id, query.group).await?;
    let pivot = storage.pivot(project_id, query.rows, query.columns).await?;
    storage.close().await;

    let value_options: Vec<SelectOption> = values
        .iter()
        .map(|v| {
            let is_selected = selected
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(v));
            SelectOption::new(v.clone(), title_case(v), is_selected)
        })
        .collect();

    let matching_title = selected.as_deref().map(|v| {
        format!(
            "Purchases where {} is {}",
            query.dimension.title(),
            title_case(v)
        )
    });

    page(
        StatusCode::OK,
        "reports",
        &json!({
            "title": "📊 Reports",
            "user": UserView::from(&session),
            "project": session.project_label,
            "dimensions": dimension_options(query.dimension),
            "values": value_options,
            "groups": dimension_options(query.group),
            "pivot_rows": dimension_options(query.rows),
            "pivot_columns": dimension_options(query.columns),
            "matching": matching.map(|m| purchases_table(&m, currency)),
            "matching_title": matching_title,
            "group_title": query.group.title(),
            "summary": summary_table(query.group.title(), &summary, currency),
            "pivot_title": format!(
                "Purchase Amount by {} and {}",
                query.rows.title(),
                query.columns.title()
            ),
            "pivot": pivot_table(&pivot, currency),
        }),
    )
}

fn dimension_options(current: Dimension) -> Vec<SelectOption> {
    Dimension::ALL
        .iter()
        .map(|d| SelectOption::new(d.column(), d.title(), *d == current))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_query_parameters_fall_back_to_defaults() {
        let q: ReportQuery = parse_query("dimension=vendor");
        assert_eq!(q.dimension, Dimension::Vendor);
        assert_eq!(q.group, Dimension::Category);
        assert_eq!(q.rows, Dimension::Category);
        assert_eq!(q.columns, Dimension::Stage);
        assert_eq!(q.value, None);
    }

    #[test]
    fn dimension_options_mark_the_current_choice() {
        let opts = dimension_options(Dimension::ModeOfPayment);
        let selected: Vec<_> = opts.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "mode_of_payment");
    }

    fn parse_query(qs: &str) -> ReportQuery {
        let uri: axum::http::Uri = format!("/reports?{qs}").parse().unwrap();
        Query::<ReportQuery>::try_from_uri(&uri).unwrap().0
    }
}
