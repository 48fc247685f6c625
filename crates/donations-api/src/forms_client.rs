use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

use donations_ledger::{FormsDirectory, UpstreamError};
use donations_types::{Amount, EntryId, FieldId, FormId};

/// REST client for the forms collaborator.
pub struct HttpFormsDirectory {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormRecord {
    name: String,
}

impl HttpFormsDirectory {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, UpstreamError> {
        let resp = req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                UpstreamError::Unavailable
            } else {
                UpstreamError::Request(e.to_string())
            }
        })?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(UpstreamError::NotFound),
            s if s.is_success() => Ok(resp),
            s => Err(UpstreamError::Request(format!("unexpected status {}", s))),
        }
    }
}

#[async_trait]
impl FormsDirectory for HttpFormsDirectory {
    async fn form_name(&self, form_id: FormId) -> Result<String, UpstreamError> {
        let resp = self
            .send(self.request(Method::GET, &format!("/forms/{}", form_id)))
            .await?;
        let record: FormRecord = resp
            .json()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        Ok(record.name)
    }

    async fn update_entry_field(
        &self,
        entry_id: EntryId,
        field_id: FieldId,
        amount: Amount,
    ) -> Result<(), UpstreamError> {
        let path = format!("/entries/{}/fields/{}", entry_id, field_id);
        self.send(
            self.request(Method::PUT, &path)
                .json(&json!({ "value": amount.to_string() })),
        )
        .await?;
        Ok(())
    }

    async fn destroy_entry(&self, entry_id: EntryId) -> Result<(), UpstreamError> {
        self.send(self.request(Method::DELETE, &format!("/entries/{}", entry_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let forms = HttpFormsDirectory::new("http://forms.local/api/", None);
        assert_eq!(forms.base_url, "http://forms.local/api");
    }

    #[tokio::test]
    async fn unreachable_collaborator_is_unavailable() {
        let forms = HttpFormsDirectory::new("http://127.0.0.1:1", Some("key".into()));
        assert!(matches!(forms.form_name(6).await, Err(UpstreamError::Unavailable)));
    }
}
