use crate::db::{ExpenseStorage, Lookup};
use crate::handlers::{Page, UserView, page};
use crate::middleware::session::{AuthSession, Session};
use crate::types::form::{FormErrors, MANDATORY_MESSAGE, PurchaseForm};
use crate::types::report::{format_currency, purchases_table};
use crate::ui::{Flash, SelectOption};
use crate::{TrackerError, router::AppState};
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct ListingRow {
    id: i64,
    cells: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PendingDelete {
    id: i64,
    item_name: String,
    amount: String,
}

/// GET /purchases -> entry form plus the project's purchases.
pub async fn purchases_page(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Page, TrackerError> {
    render_purchases(&state, &session, StatusCode::OK, &blank_form(), None, None).await
}

/// POST /purchases -> validate and insert one row.
pub async fn submit_purchase(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Form(form): Form<PurchaseForm>,
) -> Result<Page, TrackerError> {
    let project_id = session.project()?;

    let new = match form.validate(project_id) {
        Ok(new) => new,
        Err(errors) => {
            warn!(fields = ?errors.fields(), "purchase form rejected");
            return render_purchases(
                &state,
                &session,
                StatusCode::UNPROCESSABLE_ENTITY,
                &form,
                Some(&errors),
                Some(Flash::error(MANDATORY_MESSAGE)),
            )
            .await;
        }
    };

    let storage = state.storage().await?;
    let purchase_id = storage.insert_purchase(&new).await?;
    storage.close().await;
    info!(project_id, purchase_id, "purchase recorded");

    render_purchases(
        &state,
        &session,
        StatusCode::OK,
        &blank_form(),
        None,
        Some(Flash::success("Data submitted successfully!")),
    )
    .await
}

/// POST /purchases/{id}/delete -> ask for confirmation.
pub async fn request_delete(
    State(state): State<AppState>,
    AuthSession(mut session): AuthSession,
    jar: PrivateCookieJar,
    Path(purchase_id): Path<i64>,
) -> Result<Response, TrackerError> {
    let project_id = session.project()?;

    let storage = state.storage().await?;
    let found = storage.get_purchase(project_id, purchase_id).await?;
    storage.close().await;
    if found.is_none() {
        return Err(TrackerError::PurchaseNotFound(purchase_id));
    }

    session.pending_delete = Some(purchase_id);
    let jar = session.store(jar, state.secure_cookies())?;
    Ok((jar, Redirect::to("/purchases")).into_response())
}

/// POST /purchases/{id}/delete/confirm -> delete the pending purchase.
pub async fn confirm_delete(
    State(state): State<AppState>,
    AuthSession(mut session): AuthSession,
    jar: PrivateCookieJar,
    Path(purchase_id): Path<i64>,
) -> Result<Response, TrackerError> {
    let project_id = session.project()?;

    if session.pending_delete != Some(purchase_id) {
        return not_pending(&state, &session, purchase_id).await;
    }

    // the confirmation is consumed whether or not the delete succeeds
    session.pending_delete = None;
    let jar = session.store(jar, state.secure_cookies())?;

    let storage = state.storage().await?;
    let deleted = storage.delete_purchase(project_id, purchase_id).await;
    storage.close().await;
    if let Err(err) = deleted {
        warn!(project_id, purchase_id, error = %err, "confirmed delete failed");
        return Ok((jar, err).into_response());
    }
    info!(project_id, purchase_id, "purchase deleted");

    let page = render_purchases(
        &state,
        &session,
        StatusCode::OK,
        &blank_form(),
        None,
        Some(Flash::success(format!(
            "Purchase {purchase_id} deleted successfully."
        ))),
    )
    .await?;
    Ok((jar, page).into_response())
}

/// POST /purchases/{id}/delete/cancel -> drop the pending confirmation.
pub async fn cancel_delete(
    State(state): State<AppState>,
    AuthSession(mut session): AuthSession,
    jar: PrivateCookieJar,
    Path(purchase_id): Path<i64>,
) -> Result<Response, TrackerError> {
    if session.pending_delete != Some(purchase_id) {
        return not_pending(&state, &session, purchase_id).await;
    }

    session.pending_delete = None;
    let jar = session.store(jar, state.secure_cookies())?;

    let page = render_purchases(
        &state,
        &session,
        StatusCode::OK,
        &blank_form(),
        None,
        Some(Flash::info("Deletion cancelled.")),
    )
    .await?;
    Ok((jar, page).into_response())
}

/// 409 page for a confirm or cancel that names a purchase other than the
/// pending one. The session is left as it was.
async fn not_pending(
    state: &AppState,
    session: &Session,
    purchase_id: i64,
) -> Result<Response, TrackerError> {
    let flash = Flash::error(format!(
        "Purchase {purchase_id} is not awaiting confirmation."
    ));
    let page = render_purchases(
        state,
        session,
        StatusCode::CONFLICT,
        &blank_form(),
        None,
        Some(flash),
    )
    .await?;
    Ok(page.into_response())
}

fn blank_form() -> PurchaseForm {
    PurchaseForm {
        date: chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
        ..Default::default()
    }
}

fn options(values: Vec<String>, current: &str) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(|v| {
            let selected = v == current;
            SelectOption::new(v.clone(), v, selected)
        })
        .collect()
}

async fn render_purchases(
    state: &AppState,
    session: &Session,
    status: StatusCode,
    form: &PurchaseForm,
    errors: Option<&FormErrors>,
    flash: Option<Flash>,
) -> Result<Page, TrackerError> {
    let project_id = session.project()?;
    let storage = state.storage().await?;
    let result = load_page_data(&storage, project_id, session.pending_delete, state).await;
    storage.close().await;
    let data = result?;

    page(
        status,
        "purchases",
        &json!({
            "title": "Data Entry",
            "user": UserView::from(session),
            "project": session.project_label,
            "flash": flash,
            "errors": errors.map(|e| &e.errors),
            "form": form,
            "stages": options(data.stages, &form.stage),
            "categories": options(data.categories, &form.category),
            "payment_modes": options(data.payment_modes, &form.mode_of_payment),
            "pending": data.pending,
            "headers": data.headers,
            "listing": data.listing,
        }),
    )
}

struct PageData {
    stages: Vec<String>,
    categories: Vec<String>,
    payment_modes: Vec<String>,
    headers: Vec<String>,
    listing: Vec<ListingRow>,
    pending: Option<PendingDelete>,
}

async fn load_page_data(
    storage: &ExpenseStorage,
    project_id: i64,
    pending_delete: Option<i64>,
    state: &AppState,
) -> Result<PageData, TrackerError> {
    let stages = storage.lookup(Lookup::Stage).await?;
    let categories = storage.lookup(Lookup::Category).await?;
    let payment_modes = storage.lookup(Lookup::PaymentMode).await?;

    let purchases = storage.list_purchases(project_id).await?;
    let table = purchases_table(&purchases, &state.currency);
    let listing = purchases
        .iter()
        .zip(table.rows)
        .map(|(p, row)| ListingRow {
            id: p.purchase_id,
            cells: row.cells,
        })
        .collect();

    let pending = match pending_delete {
        Some(id) => storage
            .get_purchase(project_id, id)
            .await?
            .map(|p| PendingDelete {
                id: p.purchase_id,
                item_name: p.item_name,
                amount: format_currency(&state.currency, p.purchase_amount),
            }),
        None => None,
    };

    Ok(PageData {
        stages,
        categories,
        payment_modes,
        headers: table.headers,
        listing,
        pending,
    })
}
