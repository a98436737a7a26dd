// 📡 Sheets Store - EntryStore over the script web app
//
// Every action is a GET on one endpoint: `?action=<name>&<params>`.
// Responses are JSON objects; a top-level `error` fails the call whatever
// the action.

use crate::config::{StoreConfig, USER_AGENT};
use crate::error::{Result, StoreError};
use crate::row::RowRecord;
use crate::store::EntryStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct FetchDataResponse {
    #[serde(default)]
    data: Option<Vec<RowRecord>>,
}

#[derive(Debug, Deserialize)]
struct CheckIdResponse {
    #[serde(default)]
    used: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RecordTimestampResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Truthy top-level `error` field, rendered as text
fn envelope_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Body text → JSON, whatever content type the endpoint claimed
fn parse_envelope(text: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(text.trim())
        .map_err(|e| StoreError::InvalidResponse(format!("not JSON ({})", e)))?;

    if let Some(message) = envelope_error(&body) {
        return Err(StoreError::Remote(message));
    }
    Ok(body)
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct SheetsStore {
    http_client: reqwest::Client,
    web_app_url: String,
}

impl SheetsStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        info!(url = %config.web_app_url, timeout_secs = config.timeout_secs, "Entry store client initialized");

        Ok(Self {
            http_client,
            web_app_url: config.web_app_url.clone(),
        })
    }

    pub fn web_app_url(&self) -> &str {
        &self.web_app_url
    }

    /// Issue one action and return the checked JSON envelope
    async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = vec![("action", action)];
        query.extend_from_slice(params);

        debug!(action = %action, url = %self.web_app_url, "Making GET request");

        let result = self.send(action, &query).await;
        if let Err(e) = &result {
            error!(action = %action, error = %e, "GET request failed");
        }
        result
    }

    async fn send(&self, action: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http_client
            .get(&self.web_app_url)
            .query(query)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        debug!(action = %action, status = status.as_u16(), "Response received");
        if !status.is_success() {
            return Err(StoreError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        parse_envelope(&text)
    }

    async fn call_as<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let body = self.call(action, params).await?;
        serde_json::from_value(body)
            .map_err(|e| StoreError::InvalidResponse(format!("unexpected {} response ({})", action, e)))
    }
}

#[async_trait]
impl EntryStore for SheetsStore {
    async fn ping(&self) -> Result<()> {
        self.call("test", &[]).await?;
        info!("Connection test successful");
        Ok(())
    }

    async fn fetch_rows(&self) -> Result<Vec<RowRecord>> {
        let response: FetchDataResponse = self.call_as("fetchData", &[]).await?;
        let rows = response.data.unwrap_or_default();
        info!(rows = rows.len(), "Fetched sheet data");
        Ok(rows)
    }

    async fn is_registered(&self, id: &str, month: &str) -> Result<bool> {
        let response: CheckIdResponse = self
            .call_as("checkId", &[("idNumber", id), ("month", month)])
            .await?;
        let used = response.used.unwrap_or(false);
        debug!(id = %id, month = %month, used, "ID check result");
        Ok(used)
    }

    async fn record_timestamp(&self, id: &str, month: &str) -> Result<()> {
        let response: RecordTimestampResponse = self
            .call_as("recordTimestamp", &[("id", id), ("monthData", month)])
            .await?;

        if response.success != Some(true) {
            let message = response
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Failed to record timestamp".to_string());
            warn!(id = %id, month = %month, error = %message, "Timestamp not recorded");
            return Err(StoreError::Remote(message));
        }

        info!(id = %id, month = %month, "Timestamp recorded");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
