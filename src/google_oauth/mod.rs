//! Google sign-in: authorization-code flow with PKCE, userinfo lookup and
//! the e-mail allow-list gate.

pub mod access;
pub mod endpoints;

pub use access::{AccessPolicy, Admitted, AllowList, admit};
pub use endpoints::{GoogleOauthEndpoints, GoogleUserInfo};

use crate::config::Config;
use url::Url;

#[derive(Debug, Clone)]
pub struct GoogleOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

impl From<&Config> for GoogleOauthConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            auth_url: cfg.google_auth_url.clone(),
            token_url: cfg.google_token_url.clone(),
            userinfo_url: cfg.google_userinfo_url.clone(),
        }
    }
}
