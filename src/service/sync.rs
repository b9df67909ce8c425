use crate::config::Config;
use crate::db::ExpenseStorage;
use crate::drive::{DriveClient, DriveFile, PermissionRole};
use crate::error::TrackerError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Whole-file sync between the local database and its Drive copy.
///
/// Last write wins: nothing compares the two copies before overwriting.
#[derive(Clone)]
pub struct SyncService {
    drive: DriveClient,
    db_path: PathBuf,
    file_name: String,
    pinned_id: Option<String>,
    share_with: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub file_id: String,
    pub created: bool,
    pub shared_with: Option<String>,
    /// Upload succeeded but sharing did not.
    pub share_error: Option<String>,
}

impl SyncService {
    pub fn new(drive: DriveClient, cfg: &Config) -> Self {
        Self {
            drive,
            db_path: cfg.db_path.clone(),
            file_name: cfg.drive_file_name.clone(),
            pinned_id: cfg.drive_file_id.clone().filter(|s| !s.trim().is_empty()),
            share_with: cfg.share_with.clone().filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub async fn list(&self, token: &str) -> Result<Vec<DriveFile>, TrackerError> {
        self.drive.list_files(token).await
    }

    /// The configured file id, or the first file with the configured name.
    pub async fn remote_id(&self, token: &str) -> Result<Option<String>, TrackerError> {
        if let Some(id) = &self.pinned_id {
            return Ok(Some(id.clone()));
        }
        self.drive.find_by_name(token, &self.file_name).await
    }

    /// Upload the local file. Updates the remote copy when one with the same
    /// name exists, creates it otherwise, then shares it if configured.
    pub async fn save(&self, token: &str) -> Result<SaveOutcome, TrackerError> {
        let existing = self.drive.find_by_name(token, &self.file_name).await?;
        let target = existing.map(|found| self.pinned_id.clone().unwrap_or(found));
        let created = target.is_none();

        let file = self
            .drive
            .upload(token, &self.file_name, target.as_deref(), &self.db_path)
            .await?;

        let mut outcome = SaveOutcome {
            file_id: file.id,
            created,
            shared_with: None,
            share_error: None,
        };
        if let Some(email) = &self.share_with {
            match self
                .drive
                .share(token, &outcome.file_id, email, PermissionRole::Writer)
                .await
            {
                Ok(()) => outcome.shared_with = Some(email.clone()),
                Err(e) => {
                    warn!(file_id = %outcome.file_id, error = %e, "sharing failed after upload");
                    outcome.share_error = Some(e.status_and_message().1);
                }
            }
        }
        Ok(outcome)
    }

    /// Overwrite the local file with the remote copy. Returns bytes written.
    pub async fn refresh(&self, token: &str) -> Result<u64, TrackerError> {
        let id = self
            .remote_id(token)
            .await?
            .ok_or(TrackerError::NoRemoteFile)?;
        let bytes = self.drive.download(token, &id, &self.db_path).await?;
        self.prepare_local().await?;
        Ok(bytes)
    }

    /// Fetch the remote copy only when the local database holds no data yet.
    pub async fn bootstrap(&self, token: &str) -> Result<Option<u64>, TrackerError> {
        if self.has_local_data().await? {
            info!(path = %self.db_path.display(), "local database has data; skipping download");
            return Ok(None);
        }
        let Some(id) = self.remote_id(token).await? else {
            info!(name = %self.file_name, "no remote database found; starting empty");
            self.prepare_local().await?;
            return Ok(None);
        };
        let bytes = self.drive.download(token, &id, &self.db_path).await?;
        self.prepare_local().await?;
        Ok(Some(bytes))
    }

    async fn has_local_data(&self) -> Result<bool, TrackerError> {
        if !tokio::fs::try_exists(&self.db_path).await? {
            return Ok(false);
        }
        let storage = ExpenseStorage::open(&self.db_path).await?;
        let blank = async {
            storage.init_schema().await?;
            storage.is_blank().await
        }
        .await;
        storage.close().await;
        Ok(!blank?)
    }

    async fn prepare_local(&self) -> Result<(), TrackerError> {
        let storage = ExpenseStorage::open(&self.db_path).await?;
        storage.init_schema().await?;
        storage.close().await;
        Ok(())
    }
}
