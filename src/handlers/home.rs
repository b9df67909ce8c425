use crate::handlers::{Page, UserView, page};
use crate::middleware::session::{AuthSession, Session};
use crate::ui::{Flash, SelectOption};
use crate::{TrackerError, router::AppState};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

pub async fn healthz() -> &'static str {
    "ok"
}

/// GET / -> login link for visitors, project picker for signed-in users.
pub async fn home_page(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, TrackerError> {
    let session = Session::from_jar(&jar);
    match session {
        Some(s) if !state.access.is_allowed(&s.email) => {
            warn!(email = %s.email, "dropping session for address outside the allow-list");
            let page = render_home(&state, None, None).await?;
            Ok((Session::clear(jar), page).into_response())
        }
        session => Ok(render_home(&state, session.as_ref(), None).await?.into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectChoice {
    #[serde(default)]
    pub project_id: String,
}

/// POST /project -> remember the chosen project; an empty choice clears it.
pub async fn select_project(
    State(state): State<AppState>,
    AuthSession(mut session): AuthSession,
    jar: PrivateCookieJar,
    Form(choice): Form<ProjectChoice>,
) -> Result<Response, TrackerError> {
    let raw = choice.project_id.trim();
    if raw.is_empty() {
        session.select_project(None, None);
        let jar = session.store(jar, state.secure_cookies())?;
        return Ok((jar, Redirect::to("/")).into_response());
    }

    let project = match raw.parse::<i64>() {
        Ok(id) => {
            let storage = state.storage().await?;
            let found = storage.get_project(id).await?;
            storage.close().await;
            found
        }
        Err(_) => None,
    };
    let Some(project) = project else {
        let flash = Flash::error(format!("Project {raw} does not exist."));
        let (_, html) = render_home(&state, Some(&session), Some(flash)).await?;
        return Ok((StatusCode::BAD_REQUEST, html).into_response());
    };

    info!(project_id = project.project_id, "project selected");
    session.select_project(Some(project.project_id), Some(project.label()));
    let jar = session.store(jar, state.secure_cookies())?;
    Ok((jar, Redirect::to("/")).into_response())
}

pub(crate) async fn render_home(
    state: &AppState,
    session: Option<&Session>,
    flash: Option<Flash>,
) -> Result<Page, TrackerError> {
    let Some(session) = session else {
        return page(
            StatusCode::OK,
            "home",
            &json!({ "title": "Expense Tracker", "flash": flash }),
        );
    };

    let storage = state.storage().await?;
    let projects = storage.list_projects().await?;
    storage.close().await;

    let options: Vec<SelectOption> = projects
        .iter()
        .map(|p| {
            SelectOption::new(
                p.project_id.to_string(),
                p.label(),
                session.project_id == Some(p.project_id),
            )
        })
        .collect();

    page(
        StatusCode::OK,
        "home",
        &json!({
            "title": "Expense Tracker",
            "user": UserView::from(session),
            "projects": options,
            "project": session.project_label,
            "flash": flash,
        }),
    )
}
