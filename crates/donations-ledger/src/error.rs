use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced to ledger callers.
///
/// Forms-directory failures never appear here: write-through to the external
/// record is best-effort and only logged.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-range amount or total.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing/invalid anti-forgery token, or the row belongs to someone else.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// No ledger rows for the resolved identity.
    #[error("no donations found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }
}
