//! Circle CCTP V2 HTTP client

mod webhook;

pub use webhook::{process_webhook_event, sign_webhook_payload, verify_webhook_signature, WebhookEvent};

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::config::CircleConfig;
use crate::core::errors::BorderHopError;

/// Burn request for the source chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CctpTransferRequest {
    /// Decimal USDC amount as a string
    pub amount: String,
    pub destination_address: String,
    pub destination_domain: u32,
    pub source_domain: u32,
    pub sender_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CctpTransferResponse {
    pub transfer_id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CctpStatus {
    pub status: String,
    #[serde(default)]
    pub burn_tx_hash: Option<String>,
    #[serde(default)]
    pub mint_tx_hash: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Circle wraps every payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct DomainsData {
    domains: Vec<Value>,
}

pub struct CircleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CircleClient {
    pub fn new(config: &CircleConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.effective_base_url(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.as_deref().unwrap_or_default())
    }

    /// Burn USDC on the source chain.
    pub async fn initiate_transfer(
        &self,
        request: &CctpTransferRequest,
    ) -> Result<CctpTransferResponse, BorderHopError> {
        info!(
            source_domain = request.source_domain,
            destination_domain = request.destination_domain,
            amount = %request.amount,
            "Initiating CCTP transfer"
        );

        let url = format!("{}/transfers/burn", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(request)
            .send()
            .await
            .map_err(|e| BorderHopError::CircleError(format!("burn request failed: {}", e)))?;

        let data: CctpTransferResponse = Self::read_data(response).await?;
        info!(cctp_transfer_id = %data.transfer_id, "CCTP transfer initiated");
        Ok(data)
    }

    pub async fn get_transfer_status(&self, transfer_id: &str) -> Result<CctpStatus, BorderHopError> {
        debug!(cctp_transfer_id = %transfer_id, "Fetching CCTP transfer status");

        let url = format!("{}/transfers/{}", self.base_url, transfer_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| BorderHopError::CircleError(format!("status request failed: {}", e)))?;

        Self::read_data(response).await
    }

    pub async fn get_supported_domains(&self) -> Result<Vec<Value>, BorderHopError> {
        let url = format!("{}/domains", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| BorderHopError::CircleError(format!("domains request failed: {}", e)))?;

        let data: DomainsData = Self::read_data(response).await?;
        Ok(data.domains)
    }

    async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T, BorderHopError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            warn!(%status, "Circle API error: {}", message);
            return Err(BorderHopError::CircleError(message));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| BorderHopError::CircleError(format!("invalid Circle response: {}", e)))?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_without_key_is_unconfigured() {
        let client = CircleClient::new(&CircleConfig::default());
        assert!(!client.is_configured());
        assert_eq!(client.base_url(), "https://api-sandbox.circle.com/v1");

        let empty_key = CircleConfig { api_key: Some(String::new()), ..Default::default() };
        assert!(!CircleClient::new(&empty_key).is_configured());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = CctpTransferRequest {
            amount: "100".into(),
            destination_address: "0xabc".into(),
            destination_domain: 6,
            source_domain: 0,
            sender_address: "0xdef".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["destinationDomain"], 6);
        assert_eq!(v["senderAddress"], "0xdef");
    }

    #[test]
    fn test_status_parses_partial_payload() {
        let env: Envelope<CctpStatus> =
            serde_json::from_str(r#"{"data":{"status":"pending","burnTxHash":"0x1"}}"#).unwrap();
        assert_eq!(env.data.status, "pending");
        assert_eq!(env.data.burn_tx_hash.as_deref(), Some("0x1"));
        assert!(env.data.mint_tx_hash.is_none());
    }
}
