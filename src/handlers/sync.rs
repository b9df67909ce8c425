use crate::handlers::home::render_home;
use crate::handlers::{Page, UserView, page};
use crate::middleware::session::AuthSession;
use crate::service::sync::SaveOutcome;
use crate::ui::Flash;
use crate::{TrackerError, router::AppState};
use axum::{extract::State, http::StatusCode};
use serde_json::json;
use tracing::info;

/// POST /sync/upload -> push the local database to Drive ("Save").
pub async fn upload(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Page, TrackerError> {
    let outcome = state.sync.save(&session.access_token).await?;
    info!(file_id = %outcome.file_id, created = outcome.created, "save completed");
    render_home(&state, Some(&session), Some(save_flash(&outcome))).await
}

/// POST /sync/download -> replace the local database with the Drive copy
/// ("Refresh").
pub async fn download(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Page, TrackerError> {
    let bytes = state.sync.refresh(&session.access_token).await?;
    info!(bytes, "refresh completed");
    let flash = Flash::success(format!(
        "Database downloaded successfully: {}",
        state.sync.db_path().display()
    ));
    render_home(&state, Some(&session), Some(flash)).await
}

/// GET /sync/files -> files visible to the app on Drive.
pub async fn list_files(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Page, TrackerError> {
    let files = state.sync.list(&session.access_token).await?;
    page(
        StatusCode::OK,
        "files",
        &json!({
            "title": "Files on Google Drive",
            "user": UserView::from(&session),
            "project": session.project_label,
            "files": files,
        }),
    )
}

fn save_flash(outcome: &SaveOutcome) -> Flash {
    let verb = if outcome.created { "uploaded" } else { "updated" };
    let mut text = format!(
        "Database {verb} successfully! File ID: {}",
        outcome.file_id
    );
    if let Some(email) = &outcome.shared_with {
        text.push_str(&format!(" File shared successfully with {email}"));
    }
    match &outcome.share_error {
        Some(err) => Flash::error(format!("{text} Sharing failed: {err}")),
        None => Flash::success(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::FlashKind;

    fn outcome() -> SaveOutcome {
        SaveOutcome {
            file_id: "1AbC".into(),
            created: false,
            shared_with: None,
            share_error: None,
        }
    }

    #[test]
    fn update_message_names_the_file() {
        let flash = save_flash(&outcome());
        assert!(matches!(flash.kind, FlashKind::Success));
        assert_eq!(flash.text, "Database updated successfully! File ID: 1AbC");
    }

    #[test]
    fn share_failure_keeps_the_upload_message() {
        let flash = save_flash(&SaveOutcome {
            created: true,
            share_error: Some("denied".into()),
            ..outcome()
        });
        assert!(matches!(flash.kind, FlashKind::Error));
        assert!(flash.text.starts_with("Database uploaded successfully! File ID: 1AbC"));
        assert!(flash.text.ends_with("Sharing failed: denied"));
    }
}
