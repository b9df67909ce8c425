use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

/// Process-wide configuration: defaults < `config.toml` < `EXPENSE_*` env vars.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().expect("FATAL: invalid configuration (config.toml / EXPENSE_* env)")
});

pub const ENV_PREFIX: &str = "EXPENSE_";
pub const CONFIG_FILE: &str = "config.toml";

/// MIME type used for the Drive-hosted copy of the database.
pub const SQLITE_MIME_TYPE: &str = "application/x-sqlite3";

/// Scopes requested at login. `drive.file` lets the signed-in user's token
/// read and write the files this app created.
pub const OAUTH_SCOPES: &[&str] = &[
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/drive.file",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,

    /// Local SQLite file; also the blob that is synced to Drive.
    pub db_path: PathBuf,
    /// Name of the remote copy, used when searching Drive by name.
    pub drive_file_name: String,
    /// Pinned remote file id. When unset the id is looked up by name.
    pub drive_file_id: Option<String>,
    /// Address the remote file is shared with after each upload.
    pub share_with: Option<String>,

    /// E-mail addresses allowed past the login gate.
    pub allow_list: Vec<String>,

    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,

    /// At least 64 bytes; shorter values fall back to a random per-process key.
    pub cookie_secret: String,
    pub insecure_cookie: bool,

    pub proxy: Option<Url>,
    pub currency_symbol: String,

    pub google_auth_url: Url,
    pub google_token_url: Url,
    pub google_userinfo_url: Url,
    pub drive_api_base: Url,
    pub drive_upload_base: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            db_path: PathBuf::from("expenses.db"),
            drive_file_name: "expenses.db".to_string(),
            drive_file_id: None,
            share_with: None,
            allow_list: Vec::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: builtin_url("http://localhost:8000/auth/callback"),
            cookie_secret: String::new(),
            insecure_cookie: false,
            proxy: None,
            currency_symbol: "₹".to_string(),
            google_auth_url: builtin_url("https://accounts.google.com/o/oauth2/auth"),
            google_token_url: builtin_url("https://oauth2.googleapis.com/token"),
            google_userinfo_url: builtin_url("https://www.googleapis.com/oauth2/v3/userinfo"),
            drive_api_base: builtin_url("https://www.googleapis.com/drive/v3/"),
            drive_upload_base: builtin_url("https://www.googleapis.com/upload/drive/v3/"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }
}

fn builtin_url(raw: &str) -> Url {
    Url::parse(raw).expect("built-in URL must parse")
}
