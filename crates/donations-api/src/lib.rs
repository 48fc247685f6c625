pub mod checkout;
pub mod donations;
pub mod error;
pub mod forms_client;
pub mod hooks;
pub mod render;
pub mod session;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner, SiteConfig};

/// All ledger routes. Layers and static assets are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/donations", get(donations::list_donations))
        .route("/donations/update", post(donations::update_donation))
        .route("/donations/delete", post(donations::delete_donation))
        .route("/checkout", get(checkout::checkout))
        .route("/hooks/forms", post(hooks::forms_event))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
