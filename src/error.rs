use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Deserialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{error, warn};

use crate::ui;

#[derive(Debug, ThisError)]
pub enum TrackerError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Template error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlow(String),

    #[error("userinfo request failed with status {0}")]
    UserinfoFailed(StatusCode),

    #[error("missing email in userinfo response")]
    MissingEmailInUserinfo,

    #[error("{0} is not on the allow-list")]
    AccessDenied(String),

    #[error("no project selected")]
    NoProjectSelected,

    #[error("purchase {0} not found")]
    PurchaseNotFound(i64),

    #[error("Drive file {0} not found")]
    DriveFileNotFound(String),

    #[error("no remote copy of the database was found")]
    NoRemoteFile,

    #[error("Drive rejected the access token")]
    DriveUnauthorized,

    #[error("Drive API error ({status}): {message}")]
    DriveApi { status: StatusCode, message: String },
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for TrackerError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => TrackerError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                TrackerError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                TrackerError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => TrackerError::Oauth2Token(s),
        }
    }
}

impl TrackerError {
    /// Status code and the message shown to the user.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            TrackerError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong reading the local database. Try Refresh.".to_string(),
            ),
            TrackerError::Io(_) | TrackerError::Render(_) | TrackerError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred.".to_string(),
            ),
            TrackerError::Oauth2Token(_)
            | TrackerError::Oauth2Server { .. }
            | TrackerError::OauthFlow(_) => (
                StatusCode::UNAUTHORIZED,
                "An error occurred during authentication.".to_string(),
            ),
            TrackerError::UserinfoFailed(_) | TrackerError::MissingEmailInUserinfo => (
                StatusCode::UNAUTHORIZED,
                "Failed to recognize the user.".to_string(),
            ),
            TrackerError::AccessDenied(_) => (
                StatusCode::FORBIDDEN,
                "You don't have access.".to_string(),
            ),
            TrackerError::NoProjectSelected => (
                StatusCode::BAD_REQUEST,
                "Select a project on the home page first.".to_string(),
            ),
            TrackerError::PurchaseNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Purchase {id} was not found in the selected project."),
            ),
            TrackerError::DriveFileNotFound(_) => (
                StatusCode::NOT_FOUND,
                "File not found. Please check the file ID.".to_string(),
            ),
            TrackerError::NoRemoteFile => (
                StatusCode::NOT_FOUND,
                "No copy of the database was found on Google Drive.".to_string(),
            ),
            TrackerError::DriveUnauthorized => (
                StatusCode::UNAUTHORIZED,
                "Google Drive rejected the session; log in again.".to_string(),
            ),
            TrackerError::DriveApi { status, message } => (
                StatusCode::BAD_GATEWAY,
                format!("An error occurred talking to Google Drive ({status}): {message}"),
            ),
            TrackerError::Reqwest(_) | TrackerError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service is unavailable.".to_string(),
            ),
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        let page = ui::render_error(status, &message).unwrap_or_else(|e| {
            error!(error = %e, "error page failed to render");
            message
        });
        (status, Html(page)).into_response()
    }
}

/// Error envelope returned by the Drive v3 API.
#[derive(Deserialize, Debug)]
pub struct DriveErrorEnvelope {
    pub error: DriveErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct DriveErrorBody {
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_hide_the_root_cause() {
        let err = TrackerError::Database(SqlxError::RowNotFound);
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("Try Refresh"));
        assert!(!message.contains("RowNotFound"));
    }

    #[test]
    fn denied_users_get_forbidden() {
        let err = TrackerError::AccessDenied("x@example.com".into());
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!message.contains("x@example.com"));
    }

    #[test]
    fn drive_not_found_points_at_the_file_id() {
        let (status, message) = TrackerError::DriveFileNotFound("abc".into()).status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "File not found. Please check the file ID.");
    }
}
