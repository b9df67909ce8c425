use crate::config::SQLITE_MIME_TYPE;
use crate::drive::types::{DriveFile, FileList, FileMetadata, PermissionRequest, PermissionRole};
use crate::error::{DriveErrorEnvelope, TrackerError};

use axum::http::StatusCode;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

const FILE_FIELDS: &str = "id,name,mimeType";
const LIST_PAGE_SIZE: &str = "10";

/// Thin client over the Drive v3 `files` and `permissions` resources.
///
/// Every call is issued once; callers surface failures to the user.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: Url,
    upload_base: Url,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, api_base: Url, upload_base: Url) -> Self {
        Self {
            http,
            api_base,
            upload_base,
        }
    }

    /// First page of files visible to the token.
    pub async fn list_files(&self, token: &str) -> Result<Vec<DriveFile>, TrackerError> {
        let url = endpoint(&self.api_base, &["files"])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("pageSize", LIST_PAGE_SIZE),
                ("fields", "nextPageToken, files(id, name)"),
            ])
            .send()
            .await?;
        let list: FileList = check(resp, None).await?.json().await?;
        debug!(count = list.files.len(), "listed Drive files");
        Ok(list.files)
    }

    /// Id of the first non-trashed file named exactly `name`.
    pub async fn find_by_name(
        &self,
        token: &str,
        name: &str,
    ) -> Result<Option<String>, TrackerError> {
        let url = endpoint(&self.api_base, &["files"])?;
        let q = format!("name = {} and trashed = false", quote_literal(name));
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("q", q.as_str()), ("fields", "files(id, name)")])
            .send()
            .await?;
        let list: FileList = check(resp, None).await?.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    pub async fn get_metadata(&self, token: &str, file_id: &str) -> Result<DriveFile, TrackerError> {
        let url = endpoint(&self.api_base, &["files", file_id])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        Ok(check(resp, Some(file_id)).await?.json().await?)
    }

    /// Stream the file content to `dest`, replacing it only once the whole
    /// body has been written. Returns the number of bytes written.
    pub async fn download(
        &self,
        token: &str,
        file_id: &str,
        dest: &Path,
    ) -> Result<u64, TrackerError> {
        let url = endpoint(&self.api_base, &["files", file_id])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let resp = check(resp, Some(file_id)).await?;
        let expected = resp.content_length();

        let tmp = partial_path(dest);
        let written = match write_body(resp, &tmp, dest, file_id, expected).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        info!(file_id, bytes = written, path = %dest.display(), "downloaded database from Drive");
        Ok(written)
    }

    /// Upload `src` as `name`. With `existing_id` the file must exist and its
    /// content is replaced; otherwise a new file is created.
    pub async fn upload(
        &self,
        token: &str,
        name: &str,
        existing_id: Option<&str>,
        src: &Path,
    ) -> Result<DriveFile, TrackerError> {
        let bytes = tokio::fs::read(src).await?;
        let size = bytes.len();

        let file_id = match existing_id {
            Some(id) => {
                self.get_metadata(token, id).await?;
                info!(file_id = id, "updating the existing Drive file");
                let url = endpoint(&self.upload_base, &["files", id])?;
                let resp = self
                    .http
                    .patch(url)
                    .bearer_auth(token)
                    .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
                    .header(CONTENT_TYPE, SQLITE_MIME_TYPE)
                    .body(bytes)
                    .send()
                    .await?;
                let file: DriveFile = check(resp, Some(id)).await?.json().await?;
                file.id
            }
            None => {
                info!(name, "creating a new Drive file");
                let url = endpoint(&self.upload_base, &["files"])?;
                let resp = self
                    .http
                    .post(url)
                    .bearer_auth(token)
                    .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
                    .header(CONTENT_TYPE, SQLITE_MIME_TYPE)
                    .body(bytes)
                    .send()
                    .await?;
                let file: DriveFile = check(resp, None).await?.json().await?;
                file.id
            }
        };

        let file = self.set_metadata(token, &file_id, name).await?;
        info!(file_id = %file.id, bytes = size, "database uploaded to Drive");
        Ok(file)
    }

    async fn set_metadata(
        &self,
        token: &str,
        file_id: &str,
        name: &str,
    ) -> Result<DriveFile, TrackerError> {
        let url = endpoint(&self.api_base, &["files", file_id])?;
        let body = FileMetadata {
            name: name.to_string(),
            mime_type: SQLITE_MIME_TYPE.to_string(),
        };
        let resp = self
            .http
            .patch(url)
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&body)
            .send()
            .await?;
        Ok(check(resp, Some(file_id)).await?.json().await?)
    }

    /// Grant `role` on the file to a single user.
    pub async fn share(
        &self,
        token: &str,
        file_id: &str,
        email: &str,
        role: PermissionRole,
    ) -> Result<(), TrackerError> {
        let url = endpoint(&self.api_base, &["files", file_id, "permissions"])?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&PermissionRequest::user(email, role))
            .send()
            .await?;
        check(resp, Some(file_id)).await?;
        info!(file_id, email, "file shared");
        Ok(())
    }
}

/// Write the response body to `tmp`, then move it over `dest`.
async fn write_body(
    resp: reqwest::Response,
    tmp: &Path,
    dest: &Path,
    file_id: &str,
    expected: Option<u64>,
) -> Result<u64, TrackerError> {
    let mut file = tokio::fs::File::create(tmp).await?;
    let mut written: u64 = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(total) = expected.filter(|t| *t > 0) {
            debug!(file_id, progress = written * 100 / total, "download progress %");
        }
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, dest).await?;
    Ok(written)
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TrackerError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map non-2xx responses onto the error taxonomy.
async fn check(
    resp: reqwest::Response,
    file_id: Option<&str>,
) -> Result<reqwest::Response, TrackerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match (status, file_id) {
        (StatusCode::NOT_FOUND, Some(id)) => {
            return Err(TrackerError::DriveFileNotFound(id.into()));
        }
        (StatusCode::UNAUTHORIZED, _) => return Err(TrackerError::DriveUnauthorized),
        _ => {}
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DriveErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
    Err(TrackerError::DriveApi { status, message })
}

/// Quote a value for the Drive `q` query language.
fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_owned();
    os.push(".download");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote_literal("expenses.db"), "'expenses.db'");
        assert_eq!(quote_literal("o'brien\\x"), r"'o\'brien\\x'");
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let base = Url::parse("https://www.googleapis.com/drive/v3/").unwrap();
        let url = endpoint(&base, &["files", "a b/c", "permissions"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/drive/v3/files/a%20b%2Fc/permissions"
        );
    }

    #[test]
    fn partial_download_sits_next_to_destination() {
        assert_eq!(
            partial_path(Path::new("/data/expenses.db")),
            PathBuf::from("/data/expenses.db.download")
        );
    }
}
