use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info, warn};

use donations_ledger::{Credentials, IngestOutcome, secrets_match};
use donations_types::api::{IngestResponse, ReconcileResponse};
use donations_types::events::FormsEvent;

use crate::error::ApiError;
use crate::session;
use crate::state::AppState;

pub const HOOK_SECRET_HEADER: &str = "x-hook-secret";

/// `POST /hooks/forms`: events from the forms collaborator, relayed with the
/// visitor's cookies and authorization.
pub async fn forms_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(event): Json<FormsEvent>,
) -> Result<Response, ApiError> {
    let presented = headers
        .get(HOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(&state.hook_secret, presented) {
        warn!("Rejected forms event with bad hook secret");
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Invalid hook secret"));
    }

    let credentials = session::credentials(&headers, &jar, &state.jwt_secret);

    match event {
        FormsEvent::EntryCreated {
            form_id,
            entry_id,
            fields,
        } => {
            let ingestion = state
                .ledger
                .on_form_submitted(&credentials, form_id, entry_id, &fields)
                .await;

            let jar = match &ingestion.issued_session {
                Some(token) => jar.add(session::session_cookie(token, state.site.cookie_secure)),
                None => jar,
            };
            let redirect = state
                .ledger
                .donation_forms()
                .is_donation_form(form_id)
                .then(|| state.site.items_url.clone());

            let body = IngestResponse {
                ingested: matches!(ingestion.outcome, IngestOutcome::Created(_)),
                redirect,
            };
            Ok((jar, Json(body)).into_response())
        }
        FormsEvent::PaymentStatusChanged {
            entry_id,
            status,
            action_id,
            amount,
        } => {
            if !state.ledger.trigger().fires(&status, action_id) {
                debug!(
                    "Ignoring payment status '{}' for action {} (entry {})",
                    status, action_id, entry_id
                );
                return Ok(Json(ReconcileResponse {
                    reconciled: false,
                    deleted: 0,
                })
                .into_response());
            }
            info!(
                "Payment complete for entry {} (amount {})",
                entry_id,
                amount.as_deref().unwrap_or("unknown")
            );
            reconcile(&state, credentials, jar).await
        }
    }
}

/// Clears every identity the request carries.
async fn reconcile(
    state: &AppState,
    credentials: Credentials,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let identities = credentials.identities();
    if identities.is_empty() {
        warn!("Payment completed but no account or session identifies the payer");
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Cannot determine whose donations to clear",
        ));
    }

    let app = state.clone();
    let (deleted, expire) = tokio::task::spawn_blocking(move || {
        let mut deleted = 0;
        let mut expire = false;
        for identity in &identities {
            let done = app.ledger.on_payment_completed(identity)?;
            deleted += done.deleted;
            expire |= done.expire_session;
        }
        Ok::<_, donations_ledger::LedgerError>((deleted, expire))
    })
    .await??;

    let jar = if expire { session::expire_session(jar) } else { jar };
    Ok((
        jar,
        Json(ReconcileResponse {
            reconciled: true,
            deleted,
        }),
    )
        .into_response())
}
