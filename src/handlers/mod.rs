pub mod auth;
pub mod home;
pub mod purchases;
pub mod reports;
pub mod sync;

use crate::error::TrackerError;
use crate::middleware::session::Session;
use crate::ui;
use axum::http::StatusCode;
use axum::response::Html;
use serde::Serialize;

/// Signed-in identity as shown in the page header.
#[derive(Debug, Serialize)]
pub(crate) struct UserView<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

impl<'a> From<&'a Session> for UserView<'a> {
    fn from(s: &'a Session) -> Self {
        Self {
            name: &s.name,
            email: &s.email,
        }
    }
}

pub(crate) type Page = (StatusCode, Html<String>);

pub(crate) fn page<T: Serialize>(
    status: StatusCode,
    template: &str,
    data: &T,
) -> Result<Page, TrackerError> {
    Ok((status, Html(ui::render(template, data)?)))
}
