use crate::config::OAUTH_SCOPES;
use crate::error::TrackerError;
use crate::google_oauth::GoogleOauthConfig;

use base64::Engine;
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, StandardRevocableToken, StandardTokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

/// Stateless Google OAuth Endpoints.
pub struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Consent page URL plus the CSRF state that must come back on the callback.
    pub fn build_authorize_url(
        cfg: &GoogleOauthConfig,
        challenge: PkceCodeChallenge,
    ) -> Result<(Url, CsrfToken), TrackerError> {
        let client = build_oauth2_client(cfg)?;
        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(challenge)
            .url();
        Ok((url, csrf))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_authorization_code(
        cfg: &GoogleOauthConfig,
        code: AuthorizationCode,
        verifier: PkceCodeVerifier,
        http_client: reqwest::Client,
    ) -> Result<GoogleTokenResponse, TrackerError> {
        let client = build_oauth2_client(cfg)?;
        let token_result: GoogleTokenResponse = client
            .exchange_code(code)
            .set_pkce_verifier(verifier)
            .request_async(&http_client)
            .await?;
        info!("Authorization code exchanged successfully");
        Ok(token_result)
    }

    pub async fn fetch_userinfo(
        cfg: &GoogleOauthConfig,
        access_token: &str,
        http_client: reqwest::Client,
    ) -> Result<GoogleUserInfo, TrackerError> {
        let resp = http_client
            .get(cfg.userinfo_url.as_str())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "userinfo request rejected");
            return Err(TrackerError::UserinfoFailed(resp.status()));
        }
        let userinfo: GoogleUserInfo = resp.json().await?;
        info!("Fetch UserInfo successfully");
        Ok(userinfo)
    }
}

/// Build the Google OAuth2 client from configuration.
fn build_oauth2_client(cfg: &GoogleOauthConfig) -> Result<GoogleOauth2Client, TrackerError> {
    let client = OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(cfg.auth_url.as_str().to_string())?)
        .set_token_uri(TokenUrl::new(cfg.token_url.as_str().to_string())?)
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.as_str().to_string())?);
    Ok(client)
}

/// Read the `email` claim out of an unverified id_token payload.
///
/// Only used as a fallback when userinfo omits the address; the token came
/// straight from the token endpoint over TLS.
pub fn email_from_id_token(id_token: &str) -> Option<String> {
    let payload_b64 = id_token.split('.').nth(1)?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .ok()?;
    let payload_json = serde_json::from_slice::<Value>(&decoded).ok()?;
    payload_json
        .get("email")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

/// Subset of the OpenID userinfo document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GoogleUserInfo {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleTokenField {
    #[serde(rename = "id_token")]
    pub id_token: Option<String>,
}
impl ExtraTokenFields for GoogleTokenField {}

pub type GoogleTokenResponse = StandardTokenResponse<GoogleTokenField, BasicTokenType>;

pub(super) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
