use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use donations_types::{Amount, EntryId, FieldId, FormId};

/// Failure talking to the forms collaborator. Never fatal to the ledger.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("forms record not found")]
    NotFound,

    #[error("forms directory is not configured")]
    Unavailable,

    #[error("forms request failed: {0}")]
    Request(String),
}

/// Port to the external forms collaborator that owns the original submissions.
#[async_trait]
pub trait FormsDirectory: Send + Sync {
    /// Current display name of a form.
    async fn form_name(&self, form_id: FormId) -> Result<String, UpstreamError>;

    /// Overwrite one field of a stored entry with a new amount.
    async fn update_entry_field(
        &self,
        entry_id: EntryId,
        field_id: FieldId,
        amount: Amount,
    ) -> Result<(), UpstreamError>;

    async fn destroy_entry(&self, entry_id: EntryId) -> Result<(), UpstreamError>;
}

/// Directory used when no forms collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedForms;

#[async_trait]
impl FormsDirectory for DetachedForms {
    async fn form_name(&self, _form_id: FormId) -> Result<String, UpstreamError> {
        Err(UpstreamError::Unavailable)
    }

    async fn update_entry_field(
        &self,
        _entry_id: EntryId,
        _field_id: FieldId,
        _amount: Amount,
    ) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unavailable)
    }

    async fn destroy_entry(&self, _entry_id: EntryId) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unavailable)
    }
}

/// In-memory forms collaborator for tests and local demos.
#[derive(Default)]
pub struct InMemoryForms {
    names: RwLock<HashMap<FormId, String>>,
    entries: RwLock<HashMap<EntryId, HashMap<FieldId, String>>>,
}

impl InMemoryForms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(self, form_id: FormId, name: impl Into<String>) -> Self {
        self.rename_form(form_id, name);
        self
    }

    pub fn rename_form(&self, form_id: FormId, name: impl Into<String>) {
        if let Ok(mut names) = self.names.write() {
            names.insert(form_id, name.into());
        }
    }

    pub fn insert_entry(&self, entry_id: EntryId, fields: impl IntoIterator<Item = (FieldId, String)>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entry_id, fields.into_iter().collect());
        }
    }

    pub fn has_entry(&self, entry_id: EntryId) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(&entry_id))
            .unwrap_or(false)
    }

    pub fn entry_field(&self, entry_id: EntryId, field_id: FieldId) -> Option<String> {
        self.entries
            .read()
            .ok()?
            .get(&entry_id)?
            .get(&field_id)
            .cloned()
    }
}

#[async_trait]
impl FormsDirectory for InMemoryForms {
    async fn form_name(&self, form_id: FormId) -> Result<String, UpstreamError> {
        self.names
            .read()
            .map_err(|e| UpstreamError::Request(e.to_string()))?
            .get(&form_id)
            .cloned()
            .ok_or(UpstreamError::NotFound)
    }

    async fn update_entry_field(
        &self,
        entry_id: EntryId,
        field_id: FieldId,
        amount: Amount,
    ) -> Result<(), UpstreamError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        let fields = entries.get_mut(&entry_id).ok_or(UpstreamError::NotFound)?;
        fields.insert(field_id, amount.to_string());
        Ok(())
    }

    async fn destroy_entry(&self, entry_id: EntryId) -> Result<(), UpstreamError> {
        self.entries
            .write()
            .map_err(|e| UpstreamError::Request(e.to_string()))?
            .remove(&entry_id)
            .map(|_| ())
            .ok_or(UpstreamError::NotFound)
    }
}
