use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use donations_ledger::Listing;
use donations_types::api::{
    ActionResponse, DeleteDonationRequest, DonationItem, DonationsQuery, MessageResponse,
    UpdateAmountRequest,
};
use donations_types::{AccountId, Identity, SessionToken};

use crate::error::ApiError;
use crate::session;
use crate::state::AppState;

/// `GET /donations?user_id=&sid=`. A positive `user_id` wins, then the bearer
/// account, then `sid`.
pub async fn list_donations(
    State(state): State<AppState>,
    Query(query): Query<DonationsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = query
        .user_id
        .and_then(AccountId::new)
        .or_else(|| session::bearer_account(&headers, &state.jwt_secret))
        .map(Identity::Account)
        .or_else(|| {
            query
                .sid
                .as_deref()
                .and_then(SessionToken::parse)
                .map(Identity::Session)
        });

    let ledger = state.clone();
    let lookup = identity.clone();
    let listing = tokio::task::spawn_blocking(move || ledger.ledger.list_entries(lookup.as_ref()))
        .await??;

    let rows = match listing {
        Listing::Entries(rows) => rows,
        Listing::NoIdentity | Listing::Empty => {
            debug!("No donations for {:?}", identity);
            return Ok((
                StatusCode::NOT_FOUND,
                Json(MessageResponse::new("No donations found")),
            )
                .into_response());
        }
    };

    let items: Vec<DonationItem> = rows
        .into_iter()
        .map(|row| DonationItem {
            label: row.label,
            amount: row.amount,
            entry_id: row.source_entry_id,
            account_id: row.owner.account_id(),
            session_token: row.owner.session_token().cloned(),
        })
        .collect();

    Ok(Json(items).into_response())
}

/// `POST /donations/update`
pub async fn update_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(req): Form<UpdateAmountRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let identity = session::credentials(&headers, &jar, &state.jwt_secret).identity();

    state
        .ledger
        .update_amount(identity.as_ref(), &req.security, req.entry_id, &req.amount)
        .await?;

    Ok(Json(ActionResponse::redirect(back_to(&headers, &state.site.home_url))))
}

/// `POST /donations/delete`
pub async fn delete_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(req): Form<DeleteDonationRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let identity = session::credentials(&headers, &jar, &state.jwt_secret).identity();

    state
        .ledger
        .delete_entry(identity.as_ref(), &req.security, req.entry_id)
        .await?;

    Ok(Json(ActionResponse::redirect(back_to(&headers, &state.site.home_url))))
}

/// The page the request came from, else `fallback`.
fn back_to(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
