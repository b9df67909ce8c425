//! Google Drive v3 wrapper used as whole-file storage for the database.

pub mod client;
pub mod types;

pub use client::DriveClient;
pub use types::{DriveFile, PermissionRole};
