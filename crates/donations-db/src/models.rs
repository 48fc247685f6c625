use chrono::{DateTime, Utc};

use donations_ledger::StoreError;
use donations_types::{AccountId, Amount, DonationEntry, DonationId, Identity, SessionToken};

/// `donation_items` row as stored. Converted into a [`DonationEntry`] at the
/// port boundary so corrupt rows surface as errors instead of panics.
pub struct DonationRow {
    pub id: i64,
    pub account_id: Option<i64>,
    pub session_token: Option<String>,
    pub form_id: i64,
    pub entry_id: i64,
    pub amount_cents: i64,
    pub label: String,
    pub created_at: String,
}

impl DonationRow {
    pub const COLUMNS: &'static str =
        "id, account_id, session_token, form_id, entry_id, amount_cents, label, created_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            session_token: row.get(2)?,
            form_id: row.get(3)?,
            entry_id: row.get(4)?,
            amount_cents: row.get(5)?,
            label: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn into_entry(self) -> Result<DonationEntry, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt { id: self.id, reason };

        let owner = match (self.account_id, self.session_token.as_deref()) {
            (Some(id), None) => AccountId::new(id)
                .map(Identity::Account)
                .ok_or_else(|| corrupt(format!("non-positive account_id {}", id)))?,
            (None, Some(token)) => SessionToken::parse(token)
                .map(Identity::Session)
                .ok_or_else(|| corrupt("malformed session_token".to_string()))?,
            _ => return Err(corrupt("row must have exactly one owner".to_string())),
        };
        let amount = Amount::from_cents(self.amount_cents)
            .map_err(|e| corrupt(format!("amount_cents {}: {}", self.amount_cents, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| corrupt(format!("created_at '{}': {}", self.created_at, e)))?;

        Ok(DonationEntry {
            id: DonationId(self.id),
            owner,
            source_form_id: self.form_id,
            source_entry_id: self.entry_id,
            amount,
            label: self.label,
            created_at,
        })
    }
}
