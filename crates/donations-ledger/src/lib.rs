//! Pending-donation ledger: identity resolution, ingestion of donation form
//! entries, owner-gated edits, checkout total validation and post-payment
//! reconciliation.
//!
//! Storage and the external forms collaborator are reached through the
//! [`LedgerStore`] and [`FormsDirectory`] ports so the core carries no
//! dependency on a particular database or HTTP client.

pub mod checkout;
pub mod config;
pub mod entries;
pub mod error;
pub mod forms;
pub mod identity;
pub mod ingest;
pub mod integrity;
pub mod ledger;
pub mod memory;
pub mod store;

pub use checkout::{Reconciliation, TotalCheck};
pub use config::{ConfigError, DonationForms, PaymentTrigger};
pub use entries::Listing;
pub use error::LedgerError;
pub use forms::{DetachedForms, FormsDirectory, InMemoryForms, UpstreamError};
pub use identity::{Credentials, Resolution, SESSION_COOKIE, SESSION_TTL_HOURS, resolve};
pub use ingest::{IngestOutcome, Ingestion};
pub use integrity::{IntegrityKey, secrets_match};
pub use ledger::DonationLedger;
pub use memory::InMemoryStore;
pub use store::{Inserted, LedgerStore, NewDonation, StoreError};
