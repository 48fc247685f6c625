use serde::{Deserialize, Serialize};

use crate::models::{AccountId, Amount, EntryId, SessionToken};

// -- Read endpoint --

#[derive(Debug, Default, Deserialize)]
pub struct DonationsQuery {
    pub user_id: Option<i64>,
    pub sid: Option<String>,
}

/// One ledger row as returned by `GET /donations`. Carries the owner key the
/// listing was made for: `account_id` for accounts, `session_token` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationItem {
    pub label: String,
    pub amount: Amount,
    pub entry_id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<SessionToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Mutate endpoints --

#[derive(Debug, Deserialize)]
pub struct UpdateAmountRequest {
    pub entry_id: EntryId,
    pub amount: String,
    pub security: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDonationRequest {
    pub entry_id: EntryId,
    pub security: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            success: true,
            redirect: Some(url.into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            redirect: None,
            message: Some(message.into()),
        }
    }
}

// -- Checkout --

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutQuery {
    pub total_amount: Option<String>,
}

// -- Hooks --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub reconciled: bool,
    pub deleted: usize,
}
