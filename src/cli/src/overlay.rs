//! HTTP client for the overlay submission and lookup endpoints.

use crate::errors::ClientError;
use crate::services::{OverlayService, SubmitReceipt};
use async_trait::async_trait;
use postboard_core::wire::{ErrorObject, LookupRequest, SubmitRequest, SubmitResponse};
use postboard_core::{Action, LookupOutput};
use tracing::{debug, info, warn};

/// Overlay client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOverlay {
    base_url: String,
    client: reqwest::Client,
}

impl HttpOverlay {
    /// Creates a client for the overlay at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// The overlay base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turns a raw lookup reply into outputs, or the error object it carries.
pub fn parse_lookup_response(body: &[u8]) -> Result<Vec<LookupOutput>, ClientError> {
    let text = std::str::from_utf8(body).map_err(|e| ClientError::LookupError {
        code: "ERR_BAD_RESPONSE".to_string(),
        description: format!("lookup reply is not UTF-8: {}", e),
    })?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| ClientError::LookupError {
        code: "ERR_BAD_RESPONSE".to_string(),
        description: format!("lookup reply is not JSON: {}", e),
    })?;

    if let Some(error) = ErrorObject::from_value(&value) {
        return Err(ClientError::LookupError {
            code: error.code.unwrap_or_else(|| "ERR_UNKNOWN".to_string()),
            description: error.description,
        });
    }

    let rows: Vec<serde_json::Value> = serde_json::from_value(value).map_err(|e| ClientError::LookupError {
        code: "ERR_BAD_RESPONSE".to_string(),
        description: format!("unexpected lookup reply: {}", e),
    })?;

    // A malformed row costs only that row
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<LookupOutput>(row) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Dropping lookup row {}: {}", index, e);
                None
            }
        })
        .collect())
}

/// Turns a raw submit reply into a receipt.
pub fn parse_submit_response(txid: &str, topic: &str, body: &[u8]) -> Result<SubmitReceipt, ClientError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ClientError::SubmissionError(format!("submit reply is not JSON: {}", e)))?;

    if let Some(error) = ErrorObject::from_value(&value) {
        return Err(ClientError::SubmissionError(format!(
            "{} ({})",
            error.description,
            error.code.unwrap_or_else(|| "ERR_UNKNOWN".to_string())
        )));
    }

    let response: SubmitResponse = serde_json::from_value(value)
        .map_err(|e| ClientError::SubmissionError(format!("unexpected submit reply: {}", e)))?;
    Ok(SubmitReceipt {
        txid: txid.to_string(),
        admitted: response.topics.get(topic).cloned().unwrap_or_default(),
    })
}

#[async_trait]
impl OverlayService for HttpOverlay {
    async fn submit(&self, action: &Action, topics: &[String]) -> Result<SubmitReceipt, ClientError> {
        let url = format!("{}/submit", self.base_url);
        let request = SubmitRequest {
            action: action.clone(),
            topics: topics.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("Failed to reach overlay: {}", e)))?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("Submit reply ({}): {}", status, String::from_utf8_lossy(&body));

        let topic = topics.first().map(String::as_str).unwrap_or_default();
        let receipt = parse_submit_response(&action.txid, topic, &body)?;
        if !status.is_success() {
            return Err(ClientError::SubmissionError(format!("overlay answered {}", status)));
        }

        info!("Submitted {} ({} outputs admitted)", receipt.txid, receipt.admitted.len());
        Ok(receipt)
    }

    async fn lookup(&self, provider: &str, query: serde_json::Value) -> Result<Vec<LookupOutput>, ClientError> {
        let url = format!("{}/lookup", self.base_url);
        let request = LookupRequest {
            provider: provider.to_string(),
            query,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("Failed to reach overlay: {}", e)))?;
        let status = response.status();
        let body = response.bytes().await?;

        let outputs = parse_lookup_response(&body)?;
        if !status.is_success() {
            return Err(ClientError::NetworkError(format!("overlay answered {}", status)));
        }

        debug!("Lookup {} returned {} outputs", provider, outputs.len());
        Ok(outputs)
    }
}
