use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use donations_types::{FieldId, FormId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("malformed form mapping '{0}': expected formId=fieldId")]
    Malformed(String),

    #[error("form and field ids must be positive, got '{0}'")]
    NonPositive(String),

    #[error("form {0} is mapped more than once")]
    Duplicate(FormId),

    #[error("no donation forms configured")]
    Empty,
}

/// Donation-enabled forms and the field holding each form's amount.
///
/// A form is donation-enabled exactly when it has a mapping, so every enabled
/// form is guaranteed an amount field once the value is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationForms {
    fields: BTreeMap<FormId, FieldId>,
}

impl DonationForms {
    pub fn new(pairs: impl IntoIterator<Item = (FormId, FieldId)>) -> Result<Self, ConfigError> {
        let mut fields = BTreeMap::new();
        for (form_id, field_id) in pairs {
            if form_id <= 0 || field_id <= 0 {
                return Err(ConfigError::NonPositive(format!("{}={}", form_id, field_id)));
            }
            if fields.insert(form_id, field_id).is_some() {
                return Err(ConfigError::Duplicate(form_id));
            }
        }
        if fields.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(Self { fields })
    }

    pub fn is_donation_form(&self, form_id: FormId) -> bool {
        self.fields.contains_key(&form_id)
    }

    pub fn amount_field(&self, form_id: FormId) -> Option<FieldId> {
        self.fields.get(&form_id).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for DonationForms {
    /// The temple site's production forms.
    fn default() -> Self {
        Self {
            fields: BTreeMap::from([
                (2, 46),
                (5, 59),
                (6, 81),
                (8, 144),
                (10, 213),
                (11, 243),
                (13, 261),
                (14, 298),
                (18, 408),
                (21, 475),
                (24, 514),
                (29, 626),
                (31, 702),
                (32, 736),
                (34, 777),
                (35, 811),
            ]),
        }
    }
}

impl FromStr for DonationForms {
    type Err = ConfigError;

    /// Parses `"13=261, 6=81"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (form, field) = part
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed(part.to_string()))?;
            let form_id: FormId = form
                .trim()
                .parse()
                .map_err(|_| ConfigError::Malformed(part.to_string()))?;
            let field_id: FieldId = field
                .trim()
                .parse()
                .map_err(|_| ConfigError::Malformed(part.to_string()))?;
            pairs.push((form_id, field_id));
        }
        Self::new(pairs)
    }
}

/// Which payment-processor events count as a completed donation checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTrigger {
    pub action_id: i64,
}

impl PaymentTrigger {
    pub const COMPLETE: &'static str = "complete";

    pub fn new(action_id: i64) -> Self {
        Self { action_id }
    }

    pub fn fires(&self, status: &str, action_id: i64) -> bool {
        status == Self::COMPLETE && action_id == self.action_id
    }
}

impl Default for PaymentTrigger {
    fn default() -> Self {
        Self::new(43398)
    }
}
