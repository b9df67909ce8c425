use serde::{Deserialize, Serialize};

/// File resource as returned by Drive v3 (`fields=id,name,mimeType`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Metadata patch applied after a media upload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRole {
    Reader,
    Writer,
}

/// Body of `POST files/{id}/permissions` for a single user grant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: PermissionRole,
    pub email_address: String,
}

impl PermissionRequest {
    pub fn user(email: impl Into<String>, role: PermissionRole) -> Self {
        Self {
            kind: "user".to_string(),
            role,
            email_address: email.into(),
        }
    }
}
