mod common;

use common::{FakeGoogle, remove_db, temp_db_path};
use expense_tracker::config::{Config, SQLITE_MIME_TYPE};
use expense_tracker::db::ExpenseStorage;
use expense_tracker::drive::{DriveClient, PermissionRole};
use expense_tracker::error::TrackerError;
use expense_tracker::service::sync::SyncService;

const TOKEN: &str = "tok-owner";

fn drive_client(fake: &FakeGoogle) -> DriveClient {
    let http = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client");
    DriveClient::new(http, fake.drive_api_base(), fake.drive_upload_base())
}

fn config(fake: &FakeGoogle, db_path: std::path::PathBuf) -> Config {
    Config {
        db_path,
        drive_file_name: "expenses.db".into(),
        drive_api_base: fake.drive_api_base(),
        drive_upload_base: fake.drive_upload_base(),
        ..Default::default()
    }
}

async fn seed_local(path: &std::path::Path) {
    let storage = ExpenseStorage::open(path).await.expect("open db");
    storage.init_schema().await.expect("schema");
    sqlx::query("INSERT INTO projects (project_id, project_name) VALUES (1, 'Riverside Villa')")
        .execute(storage.pool())
        .await
        .expect("seed project");
    storage.close().await;
}

#[tokio::test]
async fn upload_then_download_restores_identical_bytes() {
    let fake = FakeGoogle::spawn().await;
    let drive = drive_client(&fake);

    let src = temp_db_path("drive-src");
    seed_local(&src).await;
    let original = std::fs::read(&src).expect("read source");

    let created = drive
        .upload(TOKEN, "expenses.db", None, &src)
        .await
        .expect("create upload");
    assert_eq!(created.name, "expenses.db");
    let stored = fake.file(&created.id).expect("file stored");
    assert_eq!(stored.mime_type, SQLITE_MIME_TYPE);
    assert_eq!(stored.content, original);

    let dest = temp_db_path("drive-dest");
    let written = drive
        .download(TOKEN, &created.id, &dest)
        .await
        .expect("download");
    assert_eq!(written, original.len() as u64);
    assert_eq!(std::fs::read(&dest).expect("read dest"), original);

    let storage = ExpenseStorage::open(&dest).await.expect("open copy");
    let projects = storage.list_projects().await.expect("projects");
    storage.close().await;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].label(), "1 - Riverside Villa");

    remove_db(&src);
    remove_db(&dest);
}

#[tokio::test]
async fn updating_a_missing_file_reports_not_found() {
    let fake = FakeGoogle::spawn().await;
    let drive = drive_client(&fake);
    let src = temp_db_path("drive-missing");
    seed_local(&src).await;

    let err = drive
        .upload(TOKEN, "expenses.db", Some("no-such-id"), &src)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::DriveFileNotFound(ref id) if id == "no-such-id"));
    assert_eq!(
        err.status_and_message().1,
        "File not found. Please check the file ID."
    );

    let err = drive
        .download(TOKEN, "no-such-id", &src)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::DriveFileNotFound(_)));
    // the local file is untouched by a failed download
    assert!(src.exists());

    remove_db(&src);
}

#[tokio::test]
async fn failed_download_leaves_no_partial_file() {
    let fake = FakeGoogle::spawn().await;
    let drive = drive_client(&fake);
    let id = fake.insert_file("expenses.db", b"SQLite format 3\0");

    // a directory in place of the database makes the final rename fail
    let dest = temp_db_path("drive-rename");
    std::fs::create_dir_all(&dest).expect("dest dir");
    let partial = std::path::PathBuf::from(format!("{}.download", dest.display()));

    let err = drive.download(TOKEN, &id, &dest).await.unwrap_err();
    assert!(matches!(err, TrackerError::Io(_)), "{err:?}");
    assert!(!partial.exists());
    assert!(dest.is_dir());

    std::fs::remove_dir_all(&dest).expect("cleanup");
}

#[tokio::test]
async fn find_by_name_and_share() {
    let fake = FakeGoogle::spawn().await;
    let drive = drive_client(&fake);
    fake.insert_file("other.db", b"x");
    let id = fake.insert_file("o'brien.db", b"y");

    assert_eq!(
        drive.find_by_name(TOKEN, "o'brien.db").await.expect("find"),
        Some(id.clone())
    );
    assert_eq!(drive.find_by_name(TOKEN, "absent.db").await.expect("find"), None);
    assert_eq!(drive.list_files(TOKEN).await.expect("list").len(), 2);

    drive
        .share(TOKEN, &id, "site@example.com", PermissionRole::Writer)
        .await
        .expect("share");
    let perms = fake.drive.lock().expect("drive lock").permissions.clone();
    assert_eq!(perms.len(), 1);
    assert_eq!(perms[0].0, id);
    assert_eq!(perms[0].1["type"], "user");
    assert_eq!(perms[0].1["role"], "writer");
    assert_eq!(perms[0].1["emailAddress"], "site@example.com");
}

#[tokio::test]
async fn rejected_token_is_reported_as_unauthorized() {
    let fake = FakeGoogle::spawn().await;
    let err = drive_client(&fake).list_files("").await.unwrap_err();
    assert!(matches!(err, TrackerError::DriveUnauthorized));
}

#[tokio::test]
async fn save_creates_once_then_updates_in_place() {
    let fake = FakeGoogle::spawn().await;
    let path = temp_db_path("sync-save");
    seed_local(&path).await;
    let cfg = Config {
        share_with: Some("site@example.com".into()),
        ..config(&fake, path.clone())
    };
    let sync = SyncService::new(drive_client(&fake), &cfg);

    let first = sync.save(TOKEN).await.expect("first save");
    assert!(first.created);
    assert_eq!(first.shared_with.as_deref(), Some("site@example.com"));
    assert_eq!(first.share_error, None);

    let storage = ExpenseStorage::open(&path).await.expect("open");
    sqlx::query("INSERT INTO projects (project_id, project_name) VALUES (2, 'Shed')")
        .execute(storage.pool())
        .await
        .expect("second project");
    storage.close().await;

    let second = sync.save(TOKEN).await.expect("second save");
    assert!(!second.created);
    assert_eq!(second.file_id, first.file_id);
    assert_eq!(
        fake.file(&first.file_id).expect("remote").content,
        std::fs::read(&path).expect("local")
    );
    assert_eq!(fake.drive.lock().expect("drive lock").files.len(), 1);

    remove_db(&path);
}

#[tokio::test]
async fn refresh_overwrites_local_changes_and_bootstrap_only_fills_blank_databases() {
    let fake = FakeGoogle::spawn().await;

    // publish a database with one project
    let remote_src = temp_db_path("sync-remote");
    seed_local(&remote_src).await;
    let remote_bytes = std::fs::read(&remote_src).expect("read remote");
    fake.insert_file("expenses.db", &remote_bytes);

    // a blank local file gets the remote copy at bootstrap
    let path = temp_db_path("sync-local");
    let storage = ExpenseStorage::open(&path).await.expect("open");
    storage.init_schema().await.expect("schema");
    storage.close().await;

    let sync = SyncService::new(drive_client(&fake), &config(&fake, path.clone()));
    let fetched = sync.bootstrap(TOKEN).await.expect("bootstrap");
    assert_eq!(fetched, Some(remote_bytes.len() as u64));

    // local edits survive a second bootstrap
    let storage = ExpenseStorage::open(&path).await.expect("open");
    sqlx::query("INSERT INTO projects (project_id, project_name) VALUES (9, 'Local only')")
        .execute(storage.pool())
        .await
        .expect("local project");
    storage.close().await;
    assert_eq!(sync.bootstrap(TOKEN).await.expect("bootstrap"), None);

    // refresh wins over them
    sync.refresh(TOKEN).await.expect("refresh");
    let storage = ExpenseStorage::open(&path).await.expect("open");
    let ids: Vec<i64> = storage
        .list_projects()
        .await
        .expect("projects")
        .into_iter()
        .map(|p| p.project_id)
        .collect();
    storage.close().await;
    assert_eq!(ids, vec![1]);

    remove_db(&remote_src);
    remove_db(&path);
}

#[tokio::test]
async fn refresh_without_a_remote_copy_is_an_error() {
    let fake = FakeGoogle::spawn().await;
    let path = temp_db_path("sync-none");
    let sync = SyncService::new(drive_client(&fake), &config(&fake, path.clone()));
    let err = sync.refresh(TOKEN).await.unwrap_err();
    assert!(matches!(err, TrackerError::NoRemoteFile));
    remove_db(&path);
}
