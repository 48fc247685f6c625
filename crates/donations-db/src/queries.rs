use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use donations_ledger::{Inserted, LedgerStore, NewDonation, StoreError};
use donations_types::{Amount, DonationEntry, DonationId, EntryId, Identity};

use crate::Database;
use crate::models::DonationRow;

impl Database {
    // -- Donation items --

    /// Inserts unless `entry_id` is already present. Returns the stored row and
    /// whether this call created it.
    pub fn insert_donation(&self, row: &NewDonation) -> Result<(DonationRow, bool)> {
        let (account_id, session_token) = owner_columns(&row.owner);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO donation_items
                    (account_id, session_token, form_id, entry_id, amount_cents, label, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(entry_id) DO NOTHING",
                params![
                    account_id,
                    session_token,
                    row.source_form_id,
                    row.source_entry_id,
                    row.amount.cents(),
                    row.label,
                    timestamp(row.created_at),
                ],
            )?;
            let stored = query_by_entry(&tx, row.source_entry_id)?
                .ok_or_else(|| anyhow::anyhow!("entry {} vanished after insert", row.source_entry_id))?;
            tx.commit()?;
            Ok((stored, inserted == 1))
        })
    }

    pub fn get_donation_by_entry(&self, entry_id: EntryId) -> Result<Option<DonationRow>> {
        self.with_conn(|conn| query_by_entry(conn, entry_id))
    }

    pub fn get_donations_for(&self, owner: &Identity) -> Result<Vec<DonationRow>> {
        let (account_id, session_token) = owner_columns(owner);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donation_items
                 WHERE account_id IS ?1 AND session_token IS ?2
                 ORDER BY created_at, id",
                DonationRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![account_id, session_token], DonationRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_donation_amount(&self, id: DonationId, amount: Amount) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE donation_items SET amount_cents = ?1 WHERE id = ?2",
                params![amount.cents(), id.0],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_donation(&self, id: DonationId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM donation_items WHERE id = ?1", [id.0])?;
            Ok(changed == 1)
        })
    }

    pub fn delete_donations_for(&self, owner: &Identity) -> Result<usize> {
        let (account_id, session_token) = owner_columns(owner);
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM donation_items WHERE account_id IS ?1 AND session_token IS ?2",
                params![account_id, session_token],
            )?;
            Ok(deleted)
        })
    }

    pub fn delete_donations_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM donation_items WHERE created_at < ?1",
                [timestamp(cutoff)],
            )?;
            Ok(deleted)
        })
    }
}

impl LedgerStore for Database {
    fn insert(&self, row: NewDonation) -> Result<Inserted, StoreError> {
        let (stored, created) = self.insert_donation(&row).map_err(backend)?;
        let entry = stored.into_entry()?;
        Ok(if created {
            Inserted::Created(entry)
        } else {
            Inserted::Existing(entry)
        })
    }

    fn find_by_entry(&self, entry_id: EntryId) -> Result<Option<DonationEntry>, StoreError> {
        self.get_donation_by_entry(entry_id)
            .map_err(backend)?
            .map(DonationRow::into_entry)
            .transpose()
    }

    fn list_for(&self, owner: &Identity) -> Result<Vec<DonationEntry>, StoreError> {
        self.get_donations_for(owner)
            .map_err(backend)?
            .into_iter()
            .map(DonationRow::into_entry)
            .collect()
    }

    fn update_amount(&self, id: DonationId, amount: Amount) -> Result<bool, StoreError> {
        self.set_donation_amount(id, amount).map_err(backend)
    }

    fn delete(&self, id: DonationId) -> Result<bool, StoreError> {
        self.delete_donation(id).map_err(backend)
    }

    fn delete_for(&self, owner: &Identity) -> Result<usize, StoreError> {
        self.delete_donations_for(owner).map_err(backend)
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.delete_donations_before(cutoff).map_err(backend)
    }
}

fn query_by_entry(conn: &Connection, entry_id: EntryId) -> Result<Option<DonationRow>> {
    let sql = format!("SELECT {} FROM donation_items WHERE entry_id = ?1", DonationRow::COLUMNS);
    let row = conn
        .query_row(&sql, [entry_id], DonationRow::from_row)
        .optional()?;
    Ok(row)
}

/// `(account_id, session_token)` column values for an owner; exactly one is set.
fn owner_columns(owner: &Identity) -> (Option<i64>, Option<String>) {
    match owner {
        Identity::Account(id) => (Some(id.get()), None),
        Identity::Session(token) => (None, Some(token.as_str().to_string())),
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn backend(e: anyhow::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}
