use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::db::ExpenseStorage;
use crate::drive::DriveClient;
use crate::error::TrackerError;
use crate::google_oauth::{AccessPolicy, AllowList, GoogleOauthConfig};
use crate::handlers::{auth, home, purchases, reports, sync};
use crate::service::sync::SyncService;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub oauth: Arc<GoogleOauthConfig>,
    pub access: Arc<dyn AccessPolicy>,
    pub sync: SyncService,
    pub db_path: Arc<PathBuf>,
    pub currency: Arc<str>,
    pub insecure_cookie: bool,
    key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl AppState {
    pub fn new(cfg: &Config) -> Result<Self, TrackerError> {
        let client = build_http_client(cfg)?;
        let drive = DriveClient::new(
            client.clone(),
            cfg.drive_api_base.clone(),
            cfg.drive_upload_base.clone(),
        );
        let key = Key::try_from(cfg.cookie_secret.as_bytes()).unwrap_or_else(|_| {
            warn!("cookie_secret shorter than 64 bytes; sessions will not survive a restart");
            Key::generate()
        });

        Ok(Self {
            client,
            oauth: Arc::new(GoogleOauthConfig::from(cfg)),
            access: Arc::new(AllowList::new(&cfg.allow_list)),
            sync: SyncService::new(drive, cfg),
            db_path: Arc::new(cfg.db_path.clone()),
            currency: Arc::from(cfg.currency_symbol.as_str()),
            insecure_cookie: cfg.insecure_cookie,
            key,
        })
    }

    /// Open the local database for the current request.
    pub async fn storage(&self) -> Result<ExpenseStorage, TrackerError> {
        ExpenseStorage::open(&self.db_path).await
    }

    pub fn secure_cookies(&self) -> bool {
        !self.insecure_cookie
    }
}

fn build_http_client(cfg: &Config) -> Result<reqwest::Client, TrackerError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("expense-tracker/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(60))
        // the token endpoint must not be followed across redirects
        .redirect(reqwest::redirect::Policy::none());
    // the proxy comes from config only, never from the environment
    builder = match cfg.proxy.as_ref() {
        Some(proxy_url) => builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?),
        None => builder.no_proxy(),
    };
    Ok(builder.build()?)
}

pub fn tracker_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home_page))
        .route("/healthz", get(home::healthz))
        .route("/project", post(home::select_project))
        .route("/auth/login", get(auth::google_oauth_entry))
        .route("/auth/callback", get(auth::google_oauth_callback))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/purchases",
            get(purchases::purchases_page).post(purchases::submit_purchase),
        )
        .route("/purchases/{id}/delete", post(purchases::request_delete))
        .route("/purchases/{id}/delete/confirm", post(purchases::confirm_delete))
        .route("/purchases/{id}/delete/cancel", post(purchases::cancel_delete))
        .route("/reports", get(reports::reports_page))
        .route("/sync/upload", post(sync::upload))
        .route("/sync/download", post(sync::download))
        .route("/sync/files", get(sync::list_files))
        .with_state(state)
}
