use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use crate::error::ChatError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub api_key_configured: bool,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Host portion of the endpoint, if the base URL parses
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }

    /// Send one message and return the assistant's reply text.
    pub async fn send(&self, message: &str) -> std::result::Result<String, ChatError> {
        let response = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(&ChatRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.response)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Health check failed with status: {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

async fn status_error(response: Response) -> ChatError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ChatError::Status {
        code: status.as_u16(),
        detail: error_detail(status, &body),
    }
}

/// Pick the error detail for a non-success response.
///
/// A JSON body without a usable `detail` keeps the generic status string; only
/// an unparseable body falls back to the reason phrase.
fn error_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(detail) if !is_blank_detail(detail) => match detail {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            _ => ChatError::generic_status(status.as_u16()),
        },
        Err(_) => status
            .canonical_reason()
            .map(|reason| reason.to_string())
            .unwrap_or_else(|| ChatError::generic_status(status.as_u16())),
    }
}

/// `null`, `false`, `0` and `""` carry no detail
fn is_blank_detail(detail: &serde_json::Value) -> bool {
    match detail {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(text) => text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}
