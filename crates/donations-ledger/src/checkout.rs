use chrono::{Duration, Utc};
use tracing::{info, warn};

use donations_types::{Amount, Identity};

use crate::error::LedgerError;
use crate::ledger::DonationLedger;

/// Absorbs rounding introduced by currency formatting upstream.
const TOLERANCE: f64 = 0.01;

/// Verdict of [`DonationLedger::validate_total`]. Anything but `Valid` blocks
/// progression to payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalCheck {
    Valid,
    NoDonations,
    Mismatch { stored: Amount },
    /// The claimed total was not a positive finite number; no lookup ran.
    InvalidTotal,
}

impl TotalCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// What the reconciler did for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub deleted: usize,
    /// The identity was an anonymous session whose cookie must now be expired.
    pub expire_session: bool,
}

impl DonationLedger {
    /// Compare a claimed checkout total against the stored sum of the
    /// visitor's rows.
    pub fn validate_total(
        &self,
        identity: Option<&Identity>,
        claimed_total: &str,
    ) -> Result<TotalCheck, LedgerError> {
        let claimed = match claimed_total.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => v,
            _ => {
                warn!("Rejected checkout with invalid total '{}'", claimed_total);
                return Ok(TotalCheck::InvalidTotal);
            }
        };

        let Some(identity) = identity else {
            return Ok(TotalCheck::NoDonations);
        };
        let rows = self.store.list_for(identity)?;
        if rows.is_empty() {
            return Ok(TotalCheck::NoDonations);
        }

        let stored = rows
            .iter()
            .fold(Amount::ZERO, |acc, row| acc.saturating_add(row.amount));
        if (stored.as_f64() - claimed).abs() < TOLERANCE {
            Ok(TotalCheck::Valid)
        } else {
            warn!(
                "Checkout total mismatch for {}: claimed {}, stored {}",
                identity, claimed, stored
            );
            Ok(TotalCheck::Mismatch { stored })
        }
    }

    /// Clear every row owned by `identity` after its payment completed.
    pub fn on_payment_completed(&self, identity: &Identity) -> Result<Reconciliation, LedgerError> {
        let deleted = self.store.delete_for(identity)?;
        info!("Reconciled {}: deleted {} donation record(s)", identity, deleted);
        Ok(Reconciliation {
            deleted,
            expire_session: identity.is_anonymous(),
        })
    }

    /// Drop rows older than `max_age`, for ledgers whose visitors never returned.
    pub fn purge_abandoned(&self, max_age: Duration) -> Result<usize, LedgerError> {
        let cutoff = Utc::now() - max_age;
        Ok(self.store.purge_before(cutoff)?)
    }
}
