use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{EntryId, FieldId, FormId};

/// Callbacks sent by the forms collaborator to `POST /hooks/forms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FormsEvent {
    /// A visitor submitted a form. `fields` is keyed by field id.
    EntryCreated {
        form_id: FormId,
        entry_id: EntryId,
        #[serde(default)]
        fields: BTreeMap<String, serde_json::Value>,
    },

    /// The payment processor reported a status change for a payment action.
    PaymentStatusChanged {
        entry_id: EntryId,
        status: String,
        action_id: i64,
        #[serde(default)]
        amount: Option<String>,
    },
}

impl FormsEvent {
    /// Textual value of a submitted field, if present. Numbers are rendered
    /// in their JSON form.
    pub fn field_value(fields: &BTreeMap<String, serde_json::Value>, field_id: FieldId) -> Option<String> {
        match fields.get(&field_id.to_string())? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
