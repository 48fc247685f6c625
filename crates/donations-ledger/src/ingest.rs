use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use donations_types::events::FormsEvent;
use donations_types::{Amount, DonationEntry, EntryId, FormId, SessionToken};

use crate::identity::{self, Credentials};
use crate::ledger::DonationLedger;
use crate::store::{Inserted, NewDonation};

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The form is not donation-enabled.
    Ignored,
    /// Donation form, but the amount field was missing or unparseable.
    MissingAmount,
    Created(DonationEntry),
    /// The entry had already been ingested; the existing row is returned.
    Duplicate(DonationEntry),
    /// The store rejected the insert. Logged; there is no caller to report to.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub outcome: IngestOutcome,
    /// Session token minted for this visitor; the caller persists it.
    pub issued_session: Option<SessionToken>,
}

impl Ingestion {
    fn without_identity(outcome: IngestOutcome) -> Self {
        Self {
            outcome,
            issued_session: None,
        }
    }
}

impl DonationLedger {
    /// React to a submitted form entry, appending a ledger row for donation
    /// forms. Never fails outward.
    pub async fn on_form_submitted(
        &self,
        credentials: &Credentials,
        form_id: FormId,
        entry_id: EntryId,
        fields: &BTreeMap<String, serde_json::Value>,
    ) -> Ingestion {
        let Some(field_id) = self.donation_forms.amount_field(form_id) else {
            debug!("Form {} is not a donation form, ignoring entry {}", form_id, entry_id);
            return Ingestion::without_identity(IngestOutcome::Ignored);
        };

        let amount = match FormsEvent::field_value(fields, field_id).map(|v| v.parse::<Amount>()) {
            Some(Ok(amount)) => amount,
            Some(Err(e)) => {
                warn!(
                    "Unparseable donation amount in field {} of form {} entry {}: {}",
                    field_id, form_id, entry_id, e
                );
                return Ingestion::without_identity(IngestOutcome::MissingAmount);
            }
            None => {
                warn!("No donation amount found for form {} entry {}", form_id, entry_id);
                return Ingestion::without_identity(IngestOutcome::MissingAmount);
            }
        };

        let resolution = identity::resolve(credentials);

        let label = match self.forms.form_name(form_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not fetch name of form {}: {}", form_id, e);
                format!("Donation form {}", form_id)
            }
        };

        let row = NewDonation {
            owner: resolution.identity.clone(),
            source_form_id: form_id,
            source_entry_id: entry_id,
            amount,
            label,
            created_at: Utc::now(),
        };

        match self.with_store(move |store| store.insert(row)).await {
            Ok(Inserted::Created(entry)) => {
                info!(
                    "Donation {} of {} recorded for {} (form {}, entry {})",
                    entry.id, entry.amount, entry.owner, form_id, entry_id
                );
                Ingestion {
                    outcome: IngestOutcome::Created(entry),
                    issued_session: resolution.issued,
                }
            }
            Ok(Inserted::Existing(entry)) => {
                warn!("Entry {} was already ingested as donation {}", entry_id, entry.id);
                Ingestion::without_identity(IngestOutcome::Duplicate(entry))
            }
            Err(e) => {
                error!("Failed to insert donation for entry {}: {}", entry_id, e);
                Ingestion::without_identity(IngestOutcome::Failed)
            }
        }
    }
}
