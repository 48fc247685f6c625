use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use donations_ledger::TotalCheck;
use donations_types::api::CheckoutQuery;

use crate::error::ApiError;
use crate::render;
use crate::session;
use crate::state::AppState;

pub const INVALID_TOTAL: &str = "Invalid total amount parameter.";
pub const NO_DONATIONS: &str = "No donations found. Please add donations to proceed.";
pub const TOTAL_MISMATCH: &str = "Total amount mismatch. Please ensure the donation amount is valid.";

/// `GET /checkout[?total_amount=X]`. A present `total_amount` must match the
/// visitor's stored sum before anything is rendered.
pub async fn checkout(
    State(state): State<AppState>,
    Query(query): Query<CheckoutQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let identity = session::credentials(&headers, &jar, &state.jwt_secret).identity();

    let app = state.clone();
    let lookup = identity.clone();
    let (check, listing) = tokio::task::spawn_blocking(move || {
        let check = match query.total_amount.as_deref() {
            Some(claimed) => Some(app.ledger.validate_total(lookup.as_ref(), claimed)?),
            None => None,
        };
        let listing = app.ledger.list_entries(lookup.as_ref())?;
        Ok::<_, donations_ledger::LedgerError>((check, listing))
    })
    .await??;

    let blocked = match check {
        Some(TotalCheck::InvalidTotal) => Some(INVALID_TOTAL),
        Some(TotalCheck::NoDonations) => Some(NO_DONATIONS),
        Some(TotalCheck::Mismatch { .. }) => Some(TOTAL_MISMATCH),
        Some(TotalCheck::Valid) | None => None,
    };
    if let Some(reason) = blocked {
        return Ok((StatusCode::BAD_REQUEST, Html(render::error_page(reason))).into_response());
    }

    let token = identity.as_ref().map(|id| state.ledger.issue_token(id));
    Ok(Html(render::checkout_page(&listing, token.as_deref(), &state.site)).into_response())
}
