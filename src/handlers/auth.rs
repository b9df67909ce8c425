use crate::google_oauth::endpoints::email_from_id_token;
use crate::google_oauth::{GoogleOauthEndpoints, admit};
use crate::middleware::session::Session;
use crate::{TrackerError, router::AppState};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

const CSRF_COOKIE: &str = "oauth_csrf_token";
const PKCE_COOKIE: &str = "oauth_pkce_verifier";

/// GET /auth/login -> redirects to Google's OAuth2 consent page.
pub async fn google_oauth_entry(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, TrackerError> {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let pkce_verifier = verifier.secret().to_string();

    let (auth_url, csrf_token) = GoogleOauthEndpoints::build_authorize_url(&state.oauth, challenge)?;

    let jar = store_oauth_cookies(jar, &csrf_token, &pkce_verifier, state.secure_cookies());

    info!("Dispatching OAuth redirect");
    Ok((jar, Redirect::to(auth_url.as_str())))
}

/// GET /auth/callback -> exchanges the code, fetches the profile and applies
/// the allow-list. Only admitted users get a session cookie.
pub async fn google_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (pkce_verifier, csrf_cookie, jar) = match load_oauth_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return respond_with_error(jar, err),
    };

    if let Some(err) = query.error.as_deref() {
        return respond_with_error(
            jar,
            TrackerError::OauthFlow(format!("consent refused: {err}")),
        );
    }

    let Some(state_param) = query.state.as_deref() else {
        return respond_with_error(
            jar,
            TrackerError::OauthFlow("missing `state` in callback".to_string()),
        );
    };

    if !bool::from(state_param.as_bytes().ct_eq(csrf_cookie.as_bytes())) {
        return respond_with_error(
            jar,
            TrackerError::OauthFlow("CSRF token mismatch".to_string()),
        );
    }

    let Some(code) = query.code.as_deref() else {
        return respond_with_error(
            jar,
            TrackerError::OauthFlow("missing `code` in callback".to_string()),
        );
    };

    let token_response = match GoogleOauthEndpoints::exchange_authorization_code(
        &state.oauth,
        AuthorizationCode::new(code.to_owned()),
        PkceCodeVerifier::new(pkce_verifier),
        state.client.clone(),
    )
    .await
    {
        Ok(res) => res,
        Err(err) => return respond_with_error(jar, err),
    };

    let access_token = token_response.access_token().secret().to_string();
    let id_token_email = token_response
        .extra_fields()
        .id_token
        .as_deref()
        .and_then(email_from_id_token);

    let profile = match GoogleOauthEndpoints::fetch_userinfo(
        &state.oauth,
        &access_token,
        state.client.clone(),
    )
    .await
    {
        Ok(p) => p,
        Err(err) => return respond_with_error(jar, err),
    };

    let admitted = match admit(state.access.as_ref(), &profile, id_token_email) {
        Ok(a) => a,
        Err(err) => {
            let jar = Session::clear(jar);
            return respond_with_error(jar, err);
        }
    };

    let session = Session {
        email: admitted.email,
        name: admitted.name,
        access_token,
        ..Default::default()
    };
    let jar = match session.store(jar.clone(), state.secure_cookies()) {
        Ok(stored) => stored,
        Err(err) => return respond_with_error(jar, err),
    };

    // first sign-in on this machine: pull the remote copy if there is one
    if let Err(e) = state.sync.bootstrap(&session.access_token).await {
        warn!(error = %e, "initial database download failed; use Refresh to retry");
    }

    info!(email = %session.email, "Authentication completed successfully");
    (jar, Redirect::to("/")).into_response()
}

/// POST /auth/logout -> drops the session cookie.
pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (Session::clear(jar), Redirect::to("/"))
}

fn store_oauth_cookies(
    jar: PrivateCookieJar,
    csrf: &CsrfToken,
    pkce_verifier: &str,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(build_cookie(CSRF_COOKIE, csrf.secret().to_string(), secure))
        .add(build_cookie(PKCE_COOKIE, pkce_verifier.to_string(), secure))
}

fn load_oauth_session(
    jar: PrivateCookieJar,
) -> Result<(String, String, PrivateCookieJar), (PrivateCookieJar, TrackerError)> {
    let Some(csrf_cookie) = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned()) else {
        let jar = clear_oauth_cookies(jar);
        return Err((
            jar,
            TrackerError::OauthFlow("Missing CSRF token in cookie".to_string()),
        ));
    };

    let Some(pkce_cookie) = jar.get(PKCE_COOKIE).map(|c| c.value().to_owned()) else {
        let jar = clear_oauth_cookies(jar);
        return Err((
            jar,
            TrackerError::OauthFlow("Missing PKCE verifier in cookie".to_string()),
        ));
    };

    let jar = clear_oauth_cookies(jar);

    Ok((pkce_cookie, csrf_cookie, jar))
}

fn clear_oauth_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(CSRF_COOKIE))
        .remove(clear_cookie(PKCE_COOKIE))
}

fn build_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn respond_with_error(jar: PrivateCookieJar, err: TrackerError) -> Response {
    (jar, err.into_response()).into_response()
}
