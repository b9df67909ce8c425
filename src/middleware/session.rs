use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TrackerError;
use crate::router::AppState;

pub const SESSION_COOKIE: &str = "expense_session";

/// Per-user state carried in an encrypted cookie for the browser session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub name: String,
    /// Google access token; also authorizes Drive calls.
    pub access_token: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_label: Option<String>,
    /// Purchase awaiting delete confirmation.
    #[serde(default)]
    pub pending_delete: Option<i64>,
}

impl Session {
    pub fn from_jar(jar: &PrivateCookieJar) -> Option<Self> {
        let cookie = jar.get(SESSION_COOKIE)?;
        serde_json::from_str(cookie.value())
            .inspect_err(|e| debug!(error = %e, "discarding undecodable session cookie"))
            .ok()
    }

    /// Write the session back. No max-age: it ends with the browser session.
    pub fn store(
        &self,
        jar: PrivateCookieJar,
        secure: bool,
    ) -> Result<PrivateCookieJar, TrackerError> {
        let value = serde_json::to_string(self)?;
        let cookie = Cookie::build(Cookie::new(SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .build();
        Ok(jar.add(cookie))
    }

    pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
    }

    pub fn project(&self) -> Result<i64, TrackerError> {
        self.project_id.ok_or(TrackerError::NoProjectSelected)
    }

    pub fn select_project(&mut self, project_id: Option<i64>, label: Option<String>) {
        self.project_id = project_id;
        self.project_label = label;
        self.pending_delete = None;
    }
}

/// Extractor for pages behind the login gate.
///
/// Anonymous visitors are sent to the home page; a session whose address has
/// since left the allow-list is cleared and refused.
pub struct AuthSession(pub Session);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(jar) = PrivateCookieJar::<Key>::from_request_parts(parts, state).await;

        let Some(session) = Session::from_jar(&jar) else {
            return Err(Redirect::to("/").into_response());
        };

        if !state.access.is_allowed(&session.email) {
            warn!(email = %session.email, "session no longer on the allow-list");
            let jar = Session::clear(jar);
            let denied = TrackerError::AccessDenied(session.email);
            return Err((jar, denied).into_response());
        }

        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trips_through_private_cookie() {
        let jar = PrivateCookieJar::new(Key::generate());
        let session = Session {
            email: "owner@example.com".into(),
            name: "Owner".into(),
            access_token: "ya29.token".into(),
            project_id: Some(7),
            project_label: Some("7 - Riverside Villa".into()),
            pending_delete: Some(12),
        };
        let jar = session.store(jar, true).unwrap();
        assert_eq!(Session::from_jar(&jar), Some(session));

        let jar = Session::clear(jar);
        assert_eq!(Session::from_jar(&jar), None);
    }

    #[test]
    fn selecting_a_project_resets_pending_delete() {
        let mut session = Session {
            pending_delete: Some(3),
            ..Default::default()
        };
        session.select_project(Some(1), Some("1 - Shed".into()));
        assert_eq!(session.pending_delete, None);
        assert_eq!(session.project().unwrap(), 1);
    }
}
