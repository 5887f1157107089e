//! HTTP client for the pharmacy directory service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::record::{CallerRecord, NewPharmacy};
use super::{CallerDirectory, RetryPolicy};
use crate::config::DirectoryConfig;
use crate::error::DirectoryError;

/// Client for the directory's REST resource (`GET/POST base`, `PUT base/{id}`).
pub struct DirectoryClient {
    base_url: String,
    config: DirectoryConfig,
    client: Client,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectoryError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn retry(&self) -> RetryPolicy {
        self.config.retry
    }

    /// Look a pharmacy up by phone, surfacing transport failures.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<CallerRecord>, DirectoryError> {
        let records = self.fetch_all_raw().await?;

        let found = records
            .iter()
            .map(CallerRecord::from_json)
            .find(|record| record.matches_phone(phone));

        match &found {
            Some(record) => info!(phone, pharmacy = %record.name, "Found pharmacy for phone number"),
            None => info!(phone, "No pharmacy found for phone number"),
        }
        Ok(found)
    }

    /// Every pharmacy in the directory.
    pub async fn list_all(&self) -> Result<Vec<CallerRecord>, DirectoryError> {
        let records = self.fetch_all_raw().await?;
        Ok(records.iter().map(CallerRecord::from_json).collect())
    }

    /// Pharmacies processing at least `threshold` prescriptions.
    pub async fn high_volume(&self, threshold: u32) -> Result<Vec<CallerRecord>, DirectoryError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|record| record.rx_volume >= threshold)
            .collect())
    }

    /// Create a pharmacy record; returns the record as stored by the service.
    pub async fn create(&self, pharmacy: &NewPharmacy) -> Result<CallerRecord, DirectoryError> {
        let value = self
            .retry()
            .run("create_pharmacy", move || async move {
                let response = self
                    .client
                    .post(&self.base_url)
                    .json(pharmacy)
                    .send()
                    .await
                    .map_err(|e| self.map_send_error(e))?;
                read_json(response).await
            })
            .await?;

        let record = CallerRecord::from_json(&value);
        info!(id = %record.id, name = %record.name, "Created pharmacy record");
        Ok(record)
    }

    /// Apply a partial update to the pharmacy with the given id.
    pub async fn update(&self, id: &str, updates: &Value) -> Result<CallerRecord, DirectoryError> {
        let url = format!("{}/{}", self.base_url, id);
        let url = url.as_str();
        let value = self
            .retry()
            .run("update_pharmacy", move || async move {
                let response = self
                    .client
                    .put(url)
                    .json(updates)
                    .send()
                    .await
                    .map_err(|e| self.map_send_error(e))?;
                read_json(response).await
            })
            .await?;

        let record = CallerRecord::from_json(&value);
        info!(id = %record.id, "Updated pharmacy record");
        Ok(record)
    }

    /// Single unretried request with a short timeout; true on HTTP 200.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(&self.base_url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "Directory availability check failed");
                false
            }
        }
    }

    async fn fetch_all_raw(&self) -> Result<Vec<Value>, DirectoryError> {
        let value = self
            .retry()
            .run("list_pharmacies", move || async move {
                let response = self
                    .client
                    .get(&self.base_url)
                    .send()
                    .await
                    .map_err(|e| self.map_send_error(e))?;
                read_json(response).await
            })
            .await?;

        match value {
            Value::Array(items) => {
                debug!(count = items.len(), "Fetched pharmacy list");
                Ok(items)
            }
            other => Err(DirectoryError::InvalidPayload(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> DirectoryError {
        if e.is_timeout() {
            DirectoryError::Timeout {
                timeout: self.config.timeout,
            }
        } else if e.is_connect() {
            DirectoryError::Connection(e.to_string())
        } else {
            DirectoryError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl CallerDirectory for DirectoryClient {
    /// Persistent failures are reported as "not found" so the call can
    /// continue as a new lead.
    async fn lookup(&self, phone: &str) -> Result<Option<CallerRecord>, DirectoryError> {
        match self.find_by_phone(phone).await {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(phone, error = %e, "Directory lookup failed, treating caller as unknown");
                Ok(None)
            }
        }
    }
}

async fn read_json(response: Response) -> Result<Value, DirectoryError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DirectoryError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| DirectoryError::Request(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| DirectoryError::InvalidPayload(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = DirectoryClient::new(DirectoryConfig {
            base_url: "http://localhost:1/pharmacies/".into(),
            ..DirectoryConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1/pharmacies");
    }

    #[test]
    fn json_kind_names() {
        assert_eq!(json_kind(&serde_json::json!({})), "an object");
        assert_eq!(json_kind(&serde_json::json!("x")), "a string");
    }
}
