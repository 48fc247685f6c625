use chrono::{DateTime, Utc};
use thiserror::Error;

use donations_types::{Amount, DonationEntry, DonationId, EntryId, FormId, Identity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("corrupt ledger row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// A row to be created. The store assigns the [`DonationId`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewDonation {
    pub owner: Identity,
    pub source_form_id: FormId,
    pub source_entry_id: EntryId,
    pub amount: Amount,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Result of [`LedgerStore::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted {
    Created(DonationEntry),
    /// A row for the same source entry already existed; nothing was written.
    Existing(DonationEntry),
}

/// Storage port over ledger rows. Each call must be atomic on its own; no
/// cross-call transaction is expected.
pub trait LedgerStore: Send + Sync {
    /// Insert a row unless one already exists for `source_entry_id`.
    fn insert(&self, row: NewDonation) -> Result<Inserted, StoreError>;

    fn find_by_entry(&self, entry_id: EntryId) -> Result<Option<DonationEntry>, StoreError>;

    /// Rows owned by `owner`, oldest first.
    fn list_for(&self, owner: &Identity) -> Result<Vec<DonationEntry>, StoreError>;

    /// Returns `false` when the row no longer exists.
    fn update_amount(&self, id: DonationId, amount: Amount) -> Result<bool, StoreError>;

    /// Returns `false` when the row no longer exists.
    fn delete(&self, id: DonationId) -> Result<bool, StoreError>;

    fn delete_for(&self, owner: &Identity) -> Result<usize, StoreError>;

    /// Remove every row created before `cutoff`.
    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
