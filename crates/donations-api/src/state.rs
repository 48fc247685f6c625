use std::sync::Arc;

use donations_ledger::DonationLedger;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub ledger: DonationLedger,
    pub jwt_secret: String,
    pub hook_secret: String,
    pub site: SiteConfig,
}

/// Links and cookie settings used when rendering pages and responses.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Target of "Proceed to Payment"; receives `total_amount`.
    pub checkout_url: String,
    /// Where visitors go after submitting a donation form.
    pub items_url: String,
    pub home_url: String,
    pub payment_form_url: Option<String>,
    pub cookie_secure: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            checkout_url: "/checkout".into(),
            items_url: "/checkout".into(),
            home_url: "/".into(),
            payment_form_url: None,
            cookie_secure: false,
        }
    }
}
