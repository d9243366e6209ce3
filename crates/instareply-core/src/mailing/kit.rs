use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::ProviderError;
use crate::util::http;

use super::MailingList;

/// Kit (v4 API) mailing-list client.
pub struct KitClient {
    api_key: String,
    api_base: String,
}

impl KitClient {
    pub fn new(api_key: String, api_base: &str) -> Self {
        Self {
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", self.api_base, path);
        debug!("Kit request to {}", url);

        let response = http::client()
            .post(&url)
            .header("X-Kit-Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!("Kit response {} from {}", status.as_u16(), path);

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MailingList for KitClient {
    async fn create_subscriber(&self, email: &str) -> Result<(), ProviderError> {
        self.post(
            "/subscribers",
            json!({ "email_address": email, "state": "active" }),
        )
        .await?;
        Ok(())
    }

    async fn create_tag(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let data = self.post("/tags", json!({ "name": name })).await?;
        Ok(parse_tag_id(&data))
    }

    async fn tag_subscriber(&self, tag_id: &str, email: &str) -> Result<(), ProviderError> {
        self.post(
            &format!("/tags/{}/subscribers", tag_id),
            json!({ "email_address": email }),
        )
        .await?;
        Ok(())
    }
}

/// Extract `tag.id` from a tag response. Kit sends a number; strings are
/// accepted too.
fn parse_tag_id(data: &serde_json::Value) -> Option<String> {
    match data.get("tag")?.get("id")? {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
