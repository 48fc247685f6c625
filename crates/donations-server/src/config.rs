use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use donations_api::SiteConfig;
use donations_ledger::{DonationForms, PaymentTrigger};

/// Secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub form_secret: String,
    pub hook_secret: String,
    pub donation_forms: DonationForms,
    pub trigger: PaymentTrigger,
    pub site: SiteConfig,
    pub forms_api_url: Option<String>,
    pub forms_api_key: Option<String>,
    pub retention_hours: Option<u64>,
    pub assets_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port: u16 = or("DONATIONS_PORT", "3000")
            .parse()
            .context("DONATIONS_PORT must be a port number")?;

        let donation_forms = match var("DONATIONS_FORM_FIELDS") {
            Some(raw) => raw
                .parse::<DonationForms>()
                .context("DONATIONS_FORM_FIELDS is invalid")?,
            None => DonationForms::default(),
        };

        let trigger = match var("DONATIONS_PAYMENT_ACTION_ID") {
            Some(raw) => PaymentTrigger::new(
                raw.parse()
                    .context("DONATIONS_PAYMENT_ACTION_ID must be an integer")?,
            ),
            None => PaymentTrigger::default(),
        };

        let retention_hours = match var("DONATIONS_RETENTION_HOURS") {
            Some(raw) => {
                let hours: u64 = raw
                    .parse()
                    .context("DONATIONS_RETENTION_HOURS must be a whole number of hours")?;
                if hours == 0 {
                    bail!("DONATIONS_RETENTION_HOURS must be positive");
                }
                Some(hours)
            }
            None => None,
        };

        let cookie_secure = match var("DONATIONS_COOKIE_SECURE").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("DONATIONS_COOKIE_SECURE must be true or false, got '{}'", other),
        };

        Ok(Self {
            host: or("DONATIONS_HOST", "0.0.0.0"),
            port,
            db_path: or("DONATIONS_DB_PATH", "donations.db").into(),
            jwt_secret: secret(var("DONATIONS_JWT_SECRET"), "DONATIONS_JWT_SECRET")?,
            form_secret: secret(var("DONATIONS_FORM_SECRET"), "DONATIONS_FORM_SECRET")?,
            hook_secret: secret(var("DONATIONS_HOOK_SECRET"), "DONATIONS_HOOK_SECRET")?,
            donation_forms,
            trigger,
            site: SiteConfig {
                checkout_url: or("DONATIONS_CHECKOUT_URL", "/checkout"),
                items_url: or("DONATIONS_ITEMS_URL", "/checkout"),
                home_url: or("DONATIONS_HOME_URL", "/"),
                payment_form_url: var("DONATIONS_PAYMENT_FORM_URL"),
                cookie_secure,
            },
            forms_api_url: var("DONATIONS_FORMS_API_URL"),
            forms_api_key: var("DONATIONS_FORMS_API_KEY"),
            retention_hours,
            assets_dir: or("DONATIONS_ASSETS_DIR", "./assets").into(),
        })
    }
}

fn secret(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !PLACEHOLDER_SECRETS.contains(&v.as_str()) => Ok(v),
        _ => bail!("{} is unset or still a placeholder. Set it in your .env file and restart.", name),
    }
}
