use tracing::{debug, info, warn};

use donations_types::{Amount, DonationEntry, EntryId, Identity};

use crate::error::LedgerError;
use crate::forms::UpstreamError;
use crate::ledger::DonationLedger;

/// Result of [`DonationLedger::list_entries`]. Callers render `NoIdentity` and
/// `Empty` the same way, but they are distinct signals.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// Neither an account nor a session token was available; no lookup ran.
    NoIdentity,
    Empty,
    Entries(Vec<DonationEntry>),
}

impl Listing {
    pub fn entries(&self) -> &[DonationEntry] {
        match self {
            Self::Entries(rows) => rows,
            _ => &[],
        }
    }

    pub fn total(&self) -> Amount {
        self.entries()
            .iter()
            .fold(Amount::ZERO, |acc, row| acc.saturating_add(row.amount))
    }
}

impl DonationLedger {
    /// Rows owned by `identity`, oldest first.
    pub fn list_entries(&self, identity: Option<&Identity>) -> Result<Listing, LedgerError> {
        let Some(identity) = identity else {
            return Ok(Listing::NoIdentity);
        };
        let rows = self.store.list_for(identity)?;
        Ok(if rows.is_empty() {
            Listing::Empty
        } else {
            Listing::Entries(rows)
        })
    }

    /// Change the amount of one of the visitor's rows, then write it through to
    /// the external entry. Write-through failure leaves the ledger change in place.
    pub async fn update_amount(
        &self,
        identity: Option<&Identity>,
        security_token: &str,
        entry_id: EntryId,
        new_amount: &str,
    ) -> Result<DonationEntry, LedgerError> {
        let identity = self.authorize_mutation(identity, security_token)?;
        let amount: Amount = new_amount
            .parse()
            .map_err(|e| LedgerError::validation(format!("{}", e)))?;

        let mut entry = self.owned_entry(identity, entry_id).await?;
        let id = entry.id;
        if !self.with_store(move |store| store.update_amount(id, amount)).await? {
            return Err(LedgerError::authorization("Donation not found for this session"));
        }
        info!("Donation {} amount changed {} -> {} by {}", entry.id, entry.amount, amount, identity);
        entry.amount = amount;

        match self.donation_forms.amount_field(entry.source_form_id) {
            Some(field_id) => {
                let result = self
                    .forms
                    .update_entry_field(entry.source_entry_id, field_id, amount)
                    .await;
                log_propagation("update", entry.source_entry_id, result);
            }
            None => debug!(
                "Form {} no longer mapped, not propagating amount for entry {}",
                entry.source_form_id, entry.source_entry_id
            ),
        }

        Ok(entry)
    }

    /// Remove one of the visitor's rows and best-effort destroy the external entry.
    pub async fn delete_entry(
        &self,
        identity: Option<&Identity>,
        security_token: &str,
        entry_id: EntryId,
    ) -> Result<DonationEntry, LedgerError> {
        let identity = self.authorize_mutation(identity, security_token)?;
        let entry = self.owned_entry(identity, entry_id).await?;

        let id = entry.id;
        if !self.with_store(move |store| store.delete(id)).await? {
            return Err(LedgerError::authorization("Donation not found for this session"));
        }
        info!("Donation {} (entry {}) deleted by {}", entry.id, entry.source_entry_id, identity);

        let result = self.forms.destroy_entry(entry.source_entry_id).await;
        log_propagation("destroy", entry.source_entry_id, result);

        Ok(entry)
    }

    /// Ownership check. A missing row is reported the same as a foreign one.
    async fn owned_entry(
        &self,
        identity: &Identity,
        entry_id: EntryId,
    ) -> Result<DonationEntry, LedgerError> {
        match self.with_store(move |store| store.find_by_entry(entry_id)).await? {
            Some(entry) if &entry.owner == identity => Ok(entry),
            Some(_) => {
                warn!("{} tried to modify entry {} it does not own", identity, entry_id);
                Err(LedgerError::authorization("Donation not found for this session"))
            }
            None => Err(LedgerError::authorization("Donation not found for this session")),
        }
    }
}

fn log_propagation(action: &str, entry_id: EntryId, result: Result<(), UpstreamError>) {
    match result {
        Ok(()) => debug!("Forms entry {} {}d", entry_id, action),
        Err(UpstreamError::NotFound) => debug!("Forms entry {} is gone, skipping {}", entry_id, action),
        Err(e) => warn!("Could not {} forms entry {}: {}", action, entry_id, e),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::config::PaymentTrigger;
    use crate::forms::{DetachedForms, FormsDirectory, InMemoryForms};
    use crate::identity::Credentials;
    use crate::integrity::IntegrityKey;
    use crate::ledger::testing::{
        Harness, ThreadRecordingStore, account, harness, session, session_creds,
    };
    use crate::store::LedgerStore;

    async fn seed(h: &Harness, creds: &Credentials, entry_id: EntryId, amount: &str) -> DonationEntry {
        h.forms.insert_entry(entry_id, [(81, amount.to_string())]);
        let fields = BTreeMap::from([("81".to_string(), json!(amount))]);
        match h.ledger.on_form_submitted(creds, 6, entry_id, &fields).await.outcome {
            crate::ingest::IngestOutcome::Created(entry) => entry,
            other => panic!("seed failed: {:?}", other),
        }
    }

    #[tokio::test]
    async fn listing_distinguishes_no_identity_from_empty() {
        let h = harness();
        assert_eq!(h.ledger.list_entries(None).unwrap(), Listing::NoIdentity);
        assert_eq!(h.ledger.list_entries(Some(&session("s1"))).unwrap(), Listing::Empty);

        seed(&h, &session_creds("s1"), 1, "5").await;
        seed(&h, &session_creds("s1"), 2, "7.25").await;
        let listing = h.ledger.list_entries(Some(&session("s1"))).unwrap();
        let ids: Vec<_> = listing.entries().iter().map(|e| e.source_entry_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(listing.total().to_string(), "12.25");
    }

    #[tokio::test]
    async fn owner_updates_amount_and_external_entry() {
        let h = harness();
        let owner = session("s1");
        seed(&h, &session_creds("s1"), 10, "50.00").await;
        let token = h.ledger.issue_token(&owner);

        let updated = h
            .ledger
            .update_amount(Some(&owner), &token, 10, "75.50")
            .await
            .unwrap();

        assert_eq!(updated.amount.to_string(), "75.50");
        assert_eq!(h.store.find_by_entry(10).unwrap().unwrap().amount.to_string(), "75.50");
        assert_eq!(h.forms.entry_field(10, 81).as_deref(), Some("75.50"));
    }

    #[tokio::test]
    async fn update_survives_missing_external_entry() {
        let h = harness();
        let owner = session("s1");
        seed(&h, &session_creds("s1"), 10, "50.00").await;
        h.forms.destroy_entry(10).await.unwrap();
        let token = h.ledger.issue_token(&owner);

        let updated = h.ledger.update_amount(Some(&owner), &token, 10, "1").await.unwrap();
        assert_eq!(updated.amount.to_string(), "1.00");
    }

    #[tokio::test]
    async fn unreachable_forms_directory_keeps_ledger_changes() {
        let h = harness();
        seed(&h, &session_creds("s1"), 10, "50.00").await;
        seed(&h, &session_creds("s1"), 11, "5.00").await;
        let detached = DonationLedger::new(
            h.store.clone(),
            Arc::new(DetachedForms),
            "6=81".parse().unwrap(),
            PaymentTrigger::default(),
            IntegrityKey::new("test-secret"),
        );
        let owner = session("s1");
        let token = detached.issue_token(&owner);

        let updated = detached
            .update_amount(Some(&owner), &token, 10, "12.5")
            .await
            .unwrap();
        assert_eq!(updated.amount.to_string(), "12.50");
        assert_eq!(h.store.find_by_entry(10).unwrap().unwrap().amount.to_string(), "12.50");

        let removed = detached.delete_entry(Some(&owner), &token, 10).await.unwrap();
        assert_eq!(removed.source_entry_id, 10);
        assert!(h.store.find_by_entry(10).unwrap().is_none());
        assert!(h.store.find_by_entry(11).unwrap().is_some());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn store_calls_run_off_the_async_worker() {
        let store = Arc::new(ThreadRecordingStore::default());
        let ledger = DonationLedger::new(
            store.clone(),
            Arc::new(InMemoryForms::new().with_form(6, "Lamp Offering")),
            "6=81".parse().unwrap(),
            PaymentTrigger::default(),
            IntegrityKey::new("test-secret"),
        );
        let owner = session("s1");
        let fields = BTreeMap::from([("81".to_string(), json!("5"))]);
        let ingestion = ledger.on_form_submitted(&session_creds("s1"), 6, 1, &fields).await;
        assert!(matches!(ingestion.outcome, crate::ingest::IngestOutcome::Created(_)));

        let token = ledger.issue_token(&owner);
        ledger.update_amount(Some(&owner), &token, 1, "6").await.unwrap();
        ledger.delete_entry(Some(&owner), &token, 1).await.unwrap();

        // insert, then lookup + update, then lookup + delete
        let worker = std::thread::current().id();
        let threads = store.threads();
        assert_eq!(threads.len(), 5);
        assert!(threads.iter().all(|t| *t != worker));
    }

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let h = harness();
        seed(&h, &session_creds("s1"), 10, "50.00").await;
        let intruder = session("s2");
        let token = h.ledger.issue_token(&intruder);

        let err = h
            .ledger
            .update_amount(Some(&intruder), &token, 10, "1.00")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authorization(_)));
        assert_eq!(h.store.find_by_entry(10).unwrap().unwrap().amount.to_string(), "50.00");

        let other_account = account(9);
        let token = h.ledger.issue_token(&other_account);
        let err = h
            .ledger
            .update_amount(Some(&other_account), &token, 10, "1.00")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authorization(_)));
    }

    #[tokio::test]
    async fn bad_token_is_rejected_before_validation() {
        let h = harness();
        let owner = session("s1");
        seed(&h, &session_creds("s1"), 10, "50.00").await;

        let err = h
            .ledger
            .update_amount(Some(&owner), "forged", 10, "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authorization(_)));

        let err = h.ledger.delete_entry(None, "", 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Authorization(_)));
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn invalid_amount_is_a_validation_error() {
        let h = harness();
        let owner = session("s1");
        seed(&h, &session_creds("s1"), 10, "50.00").await;
        let token = h.ledger.issue_token(&owner);

        for bad in ["", "-1", "abc", "NaN", "inf"] {
            let err = h.ledger.update_amount(Some(&owner), &token, 10, bad).await.unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let h = harness();
        let owner = session("s1");
        seed(&h, &session_creds("s1"), 10, "5").await;
        seed(&h, &session_creds("s1"), 11, "6").await;
        seed(&h, &session_creds("s2"), 12, "7").await;
        let token = h.ledger.issue_token(&owner);

        let removed = h.ledger.delete_entry(Some(&owner), &token, 10).await.unwrap();
        assert_eq!(removed.source_entry_id, 10);
        assert!(h.store.find_by_entry(10).unwrap().is_none());
        assert!(h.store.find_by_entry(11).unwrap().is_some());
        assert!(h.store.find_by_entry(12).unwrap().is_some());
        assert!(!h.forms.has_entry(10));
        assert!(h.forms.has_entry(11));
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let h = harness();
        seed(&h, &session_creds("s1"), 10, "5").await;
        let intruder = session("s2");
        let token = h.ledger.issue_token(&intruder);

        let err = h.ledger.delete_entry(Some(&intruder), &token, 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Authorization(_)));
        assert_eq!(h.store.len(), 1);
    }

    proptest! {
        /// A non-owner's update never changes the stored amount.
        #[test]
        fn foreign_updates_never_change_amount(original in 0i64..1_000_000, attempted in 0i64..1_000_000) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let h = harness();
                let original = Amount::from_cents(original).unwrap();
                seed(&h, &session_creds("owner"), 1, &original.to_string()).await;

                let intruder = session("intruder");
                let token = h.ledger.issue_token(&intruder);
                let attempted = Amount::from_cents(attempted).unwrap().to_string();
                let result = h.ledger.update_amount(Some(&intruder), &token, 1, &attempted).await;

                prop_assert!(matches!(result, Err(LedgerError::Authorization(_))));
                prop_assert_eq!(h.store.find_by_entry(1).unwrap().unwrap().amount, original);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
