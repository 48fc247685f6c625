use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a form in the external forms collaborator.
pub type FormId = i64;
/// Identifier of a field within an external form.
pub type FieldId = i64;
/// Identifier of a submitted entry in the external forms collaborator.
pub type EntryId = i64;

// -- Identity --

/// Authenticated account identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for AccountId {
    type Error = String;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| format!("account id must be positive, got {}", id))
    }
}

impl From<AccountId> for i64 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque anonymous-visitor token persisted in the `donation_session_id` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    const MAX_LEN: usize = 128;

    /// Mint a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied token. Empty, oversized, or tokens with
    /// characters outside `[A-Za-z0-9_-]` are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return None;
        }
        raw.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionToken {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| "malformed session token".to_string())
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The key under which ledger rows are grouped: exactly one of an account or
/// an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Account(AccountId),
    Session(SessionToken),
}

impl Identity {
    /// Stable textual form, used when binding anti-forgery tokens.
    pub fn key(&self) -> String {
        match self {
            Self::Account(id) => format!("account:{}", id),
            Self::Session(token) => format!("session:{}", token),
        }
    }

    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Account(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    pub fn session_token(&self) -> Option<&SessionToken> {
        match self {
            Self::Account(_) => None,
            Self::Session(token) => Some(token),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

// -- Amount --

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must not be negative")]
    Negative,

    #[error("amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("amount exceeds the maximum of {}", Amount::MAX)]
    OutOfRange,
}

/// Non-negative currency amount with two-digit precision, held as cents.
///
/// The upper bound matches a `DECIMAL(10, 2)` column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(9_999_999_999);

    pub fn from_cents(cents: i64) -> Result<Self, AmountError> {
        if cents < 0 {
            return Err(AmountError::Negative);
        }
        if cents > Self::MAX.0 {
            return Err(AmountError::OutOfRange);
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Sum without the `MAX` bound; totals may exceed a single row's range.
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses plain decimal notation (`"50"`, `"50.00"`, `".5"`). More than two
    /// fractional digits are rounded half-up to the cent.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if s.starts_with('-') {
            return Err(AmountError::Negative);
        }

        let malformed = || AmountError::Malformed(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let mut cents: i64 = 0;
        for b in whole.bytes() {
            cents = cents
                .checked_mul(10)
                .and_then(|c| c.checked_add(i64::from(b - b'0')))
                .ok_or(AmountError::OutOfRange)?;
        }
        cents = cents.checked_mul(100).ok_or(AmountError::OutOfRange)?;

        let digits: Vec<i64> = frac.bytes().map(|b| i64::from(b - b'0')).collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = i64::from(digits.get(2).is_some_and(|d| *d >= 5));
        cents = cents
            .checked_add(tenths * 10 + hundredths + round_up)
            .ok_or(AmountError::OutOfRange)?;

        Self::from_cents(cents)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// -- Ledger rows --

/// Ledger-assigned row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub i64);

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pending donation line item awaiting checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationEntry {
    pub id: DonationId,
    pub owner: Identity,
    pub source_form_id: FormId,
    pub source_entry_id: EntryId,
    pub amount: Amount,
    /// Form display name captured at ingestion; never refreshed.
    pub label: String,
    pub created_at: DateTime<Utc>,
}
