use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use donations_types::{Amount, DonationEntry, DonationId, EntryId, Identity};

use crate::store::{Inserted, LedgerStore, NewDonation, StoreError};

/// In-memory store used for tests and local demos.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    rows: BTreeMap<DonationId, DonationEntry>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {}", e)))
    }
}

impl LedgerStore for InMemoryStore {
    fn insert(&self, row: NewDonation) -> Result<Inserted, StoreError> {
        let mut state = self.write()?;
        if let Some(existing) = state
            .rows
            .values()
            .find(|r| r.source_entry_id == row.source_entry_id)
        {
            return Ok(Inserted::Existing(existing.clone()));
        }

        state.next_id += 1;
        let entry = DonationEntry {
            id: DonationId(state.next_id),
            owner: row.owner,
            source_form_id: row.source_form_id,
            source_entry_id: row.source_entry_id,
            amount: row.amount,
            label: row.label,
            created_at: row.created_at,
        };
        state.rows.insert(entry.id, entry.clone());
        Ok(Inserted::Created(entry))
    }

    fn find_by_entry(&self, entry_id: EntryId) -> Result<Option<DonationEntry>, StoreError> {
        Ok(self
            .read()?
            .rows
            .values()
            .find(|r| r.source_entry_id == entry_id)
            .cloned())
    }

    fn list_for(&self, owner: &Identity) -> Result<Vec<DonationEntry>, StoreError> {
        let mut rows: Vec<DonationEntry> = self
            .read()?
            .rows
            .values()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        Ok(rows)
    }

    fn update_amount(&self, id: DonationId, amount: Amount) -> Result<bool, StoreError> {
        Ok(match self.write()?.rows.get_mut(&id) {
            Some(row) => {
                row.amount = amount;
                true
            }
            None => false,
        })
    }

    fn delete(&self, id: DonationId) -> Result<bool, StoreError> {
        Ok(self.write()?.rows.remove(&id).is_some())
    }

    fn delete_for(&self, owner: &Identity) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let before = state.rows.len();
        state.rows.retain(|_, r| &r.owner != owner);
        Ok(before - state.rows.len())
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let before = state.rows.len();
        state.rows.retain(|_, r| r.created_at >= cutoff);
        Ok(before - state.rows.len())
    }
}
