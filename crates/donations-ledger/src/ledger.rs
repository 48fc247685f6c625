use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use donations_types::Identity;

use crate::config::{DonationForms, PaymentTrigger};
use crate::error::LedgerError;
use crate::forms::FormsDirectory;
use crate::integrity::IntegrityKey;
use crate::store::{LedgerStore, StoreError};

/// The ledger core. Operations live in the `ingest`, `entries` and `checkout`
/// modules; each takes the acting identity explicitly.
pub struct DonationLedger {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) forms: Arc<dyn FormsDirectory>,
    pub(crate) donation_forms: DonationForms,
    pub(crate) trigger: PaymentTrigger,
    pub(crate) integrity: IntegrityKey,
}

impl DonationLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        forms: Arc<dyn FormsDirectory>,
        donation_forms: DonationForms,
        trigger: PaymentTrigger,
        integrity: IntegrityKey,
    ) -> Self {
        Self {
            store,
            forms,
            donation_forms,
            trigger,
            integrity,
        }
    }

    /// Runs one store call on the blocking pool, off the async workers.
    pub(crate) async fn with_store<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn LedgerStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| StoreError::Backend(format!("store task failed: {}", e)))?
    }

    pub fn donation_forms(&self) -> &DonationForms {
        &self.donation_forms
    }

    pub fn trigger(&self) -> PaymentTrigger {
        self.trigger
    }

    /// Anti-forgery token to embed in pages served to `identity`.
    pub fn issue_token(&self, identity: &Identity) -> String {
        self.integrity.issue(identity, Utc::now())
    }

    /// Checks the anti-forgery token before anything else about a mutation.
    pub(crate) fn authorize_mutation<'a>(
        &self,
        identity: Option<&'a Identity>,
        token: &str,
    ) -> Result<&'a Identity, LedgerError> {
        let Some(identity) = identity else {
            return Err(LedgerError::authorization("Invalid session"));
        };
        if !self.integrity.verify(identity, token, Utc::now()) {
            warn!("Rejected donation mutation with bad security token for {}", identity);
            return Err(LedgerError::authorization("Invalid security token"));
        }
        Ok(identity)
    }
}
