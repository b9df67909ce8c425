#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use url::Url;

/// Unique path under the system temp dir; nothing is created.
pub fn temp_db_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "expense-tracker-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    path
}

pub fn remove_db(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
    let mut partial = path.as_os_str().to_owned();
    partial.push(".download");
    let _ = std::fs::remove_file(PathBuf::from(partial));
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
pub struct FakeDriveState {
    pub files: BTreeMap<String, StoredFile>,
    pub permissions: Vec<(String, Value)>,
    next_id: u32,
}

pub type SharedDrive = Arc<Mutex<FakeDriveState>>;

/// In-process stand-in for Google (OAuth token + userinfo) and Drive v3.
pub struct FakeGoogle {
    pub base: Url,
    pub drive: SharedDrive,
}

impl FakeGoogle {
    pub async fn spawn() -> Self {
        let drive: SharedDrive = Arc::default();
        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo))
            .route("/drive/v3/files", get(list_files))
            .route("/drive/v3/files/{id}", get(get_file).patch(patch_metadata))
            .route("/drive/v3/files/{id}/permissions", post(add_permission))
            .route("/upload/drive/v3/files", post(create_media))
            .route("/upload/drive/v3/files/{id}", patch(update_media))
            .with_state(drive.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake google");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake google crashed");
        });

        Self {
            base: Url::parse(&format!("http://{addr}/")).expect("fake base url"),
            drive,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("fake url")
    }

    pub fn drive_api_base(&self) -> Url {
        self.url("drive/v3/")
    }

    pub fn drive_upload_base(&self) -> Url {
        self.url("upload/drive/v3/")
    }

    pub fn insert_file(&self, name: &str, content: &[u8]) -> String {
        let mut drive = self.drive.lock().expect("drive lock");
        drive.next_id += 1;
        let id = format!("seed-{}", drive.next_id);
        drive.files.insert(
            id.clone(),
            StoredFile {
                name: name.to_string(),
                mime_type: "application/octet-stream".to_string(),
                content: content.to_vec(),
            },
        );
        id
    }

    pub fn file(&self, id: &str) -> Option<StoredFile> {
        self.drive.lock().expect("drive lock").files.get(id).cloned()
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn drive_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

/// The authorization code is the e-mail local part; the token echoes it.
async fn token(body: String) -> Response {
    let params: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    let Some(code) = params.get("code") else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_request" })))
            .into_response();
    };
    if !params.contains_key("code_verifier") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
            .into_response();
    }
    Json(json!({
        "access_token": format!("tok-{code}"),
        "token_type": "Bearer",
        "expires_in": 3599,
    }))
    .into_response()
}

async fn userinfo(headers: HeaderMap) -> Response {
    let Some(local) = bearer(&headers).and_then(|t| t.strip_prefix("tok-").map(str::to_string))
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    Json(json!({
        "sub": "1234",
        "email": format!("{local}@example.com"),
        "email_verified": true,
        "name": "Site Owner",
    }))
    .into_response()
}

async fn list_files(
    State(drive): State<SharedDrive>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if bearer(&headers).is_none() {
        return drive_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let drive = drive.lock().expect("drive lock");
    let wanted = params.get("q").and_then(|q| {
        q.strip_prefix("name = '")
            .and_then(|rest| rest.split_once("' and trashed = false"))
            .map(|(name, _)| name.replace("\\'", "'").replace("\\\\", "\\"))
    });
    let files: Vec<Value> = drive
        .files
        .iter()
        .filter(|(_, f)| wanted.as_ref().is_none_or(|w| &f.name == w))
        .map(|(id, f)| json!({ "id": id, "name": f.name }))
        .collect();
    Json(json!({ "files": files })).into_response()
}

async fn get_file(
    State(drive): State<SharedDrive>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let drive = drive.lock().expect("drive lock");
    let Some(file) = drive.files.get(&id) else {
        return drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}."));
    };
    if params.get("alt").map(String::as_str) == Some("media") {
        return (StatusCode::OK, file.content.clone()).into_response();
    }
    Json(json!({ "id": id, "name": file.name, "mimeType": file.mime_type })).into_response()
}

async fn patch_metadata(
    State(drive): State<SharedDrive>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut drive = drive.lock().expect("drive lock");
    let Some(file) = drive.files.get_mut(&id) else {
        return drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}."));
    };
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        file.name = name.to_string();
    }
    if let Some(mime) = body.get("mimeType").and_then(Value::as_str) {
        file.mime_type = mime.to_string();
    }
    Json(json!({ "id": id, "name": file.name, "mimeType": file.mime_type })).into_response()
}

async fn add_permission(
    State(drive): State<SharedDrive>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut drive = drive.lock().expect("drive lock");
    if !drive.files.contains_key(&id) {
        return drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}."));
    }
    drive.permissions.push((id, body));
    Json(json!({ "id": "perm-1", "type": "user", "role": "writer" })).into_response()
}

async fn create_media(State(drive): State<SharedDrive>, body: Bytes) -> Response {
    let mut drive = drive.lock().expect("drive lock");
    drive.next_id += 1;
    let id = format!("file-{}", drive.next_id);
    drive.files.insert(
        id.clone(),
        StoredFile {
            name: "Untitled".to_string(),
            mime_type: "application/octet-stream".to_string(),
            content: body.to_vec(),
        },
    );
    Json(json!({ "id": id, "name": "Untitled" })).into_response()
}

async fn update_media(
    State(drive): State<SharedDrive>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let mut drive = drive.lock().expect("drive lock");
    let Some(file) = drive.files.get_mut(&id) else {
        return drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}."));
    };
    file.content = body.to_vec();
    Json(json!({ "id": id, "name": file.name })).into_response()
}
