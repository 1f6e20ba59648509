//! Transaction-status resolution against the upstream payment gateway.
//!
//! One inbound callback triggers exactly one status query (plus at most one
//! retry on a transient transport failure). The response is interpreted into
//! a closed set of outcomes; anything that is not an explicit verdict lands
//! in `Indeterminate` and is treated as a failure downstream.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::checksum::{CHECKSUM_HEADER, MERCHANT_HEADER};
use crate::config::GatewayConfig;
use crate::error::CallbackError;

/// Identifies one payment attempt: the merchant-assigned transaction id and
/// the owning user. Read-only to this pipeline.
#[derive(Debug, Clone)]
pub struct TransactionReference {
    pub user_id: String,
    pub transaction_id: String,
}

/// The only three verdicts the pipeline distinguishes. A credential is issued
/// on `Settled` and on nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Settled,
    Failed,
    Indeterminate,
}

/// Outcome of one upstream query, with raw diagnostics for logging. Lives
/// only for the duration of the request.
#[derive(Debug, Clone)]
pub struct GatewayStatusResult {
    pub outcome: StatusOutcome,
    pub http_status: Option<u16>,
    pub detail: Option<String>,
}

#[async_trait]
pub trait StatusGateway: Send + Sync {
    /// Query the upstream gateway for the transaction's status. Transport
    /// and interpretation failures fold into an `Indeterminate` result
    /// rather than an error.
    async fn transaction_status(
        &self,
        txn: &TransactionReference,
        checksum: &str,
    ) -> GatewayStatusResult;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    success: Option<bool>,
}

/// Production resolver speaking HTTP to the configured gateway.
pub struct HttpStatusGateway {
    client: Client,
    base_url: String,
    status_path: String,
    merchant_id: String,
    timeout: Duration,
}

impl HttpStatusGateway {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            status_path: config.status_path.clone(),
            merchant_id: config.merchant_id.clone().unwrap_or_default(),
            timeout: config.timeout,
        }
    }

    fn status_url(&self, transaction_id: &str) -> String {
        format!(
            "{}{}{}/{}",
            self.base_url, self.status_path, self.merchant_id, transaction_id
        )
    }

    async fn query_once(
        &self,
        txn: &TransactionReference,
        checksum: &str,
    ) -> Result<GatewayStatusResult, reqwest::Error> {
        let response = self
            .client
            .get(self.status_url(&txn.transaction_id))
            .header(CHECKSUM_HEADER, checksum)
            .header(MERCHANT_HEADER, &self.merchant_id)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(interpret(status, &body, &txn.transaction_id))
    }
}

#[async_trait]
impl StatusGateway for HttpStatusGateway {
    async fn transaction_status(
        &self,
        txn: &TransactionReference,
        checksum: &str,
    ) -> GatewayStatusResult {
        let mut retried = false;
        loop {
            match self.query_once(txn, checksum).await {
                Ok(result) => return result,
                Err(e) if !retried && (e.is_timeout() || e.is_connect()) => {
                    retried = true;
                    tracing::debug!(
                        transaction_id = %txn.transaction_id,
                        "transient gateway error, retrying once: {}",
                        e
                    );
                }
                Err(e) => {
                    CallbackError::UpstreamUnavailable(e.to_string()).log(&txn.transaction_id);
                    return GatewayStatusResult {
                        outcome: StatusOutcome::Indeterminate,
                        http_status: None,
                        detail: Some(e.to_string()),
                    };
                }
            }
        }
    }
}

/// Map an upstream response to a verdict.
///
/// Only a 2xx body with an explicit `success` flag counts as a verdict;
/// everything else is `Indeterminate`. An explicit `success: false` is the
/// one case that maps to `Failed`.
fn interpret(status: StatusCode, body: &str, transaction_id: &str) -> GatewayStatusResult {
    let http_status = Some(status.as_u16());

    if !status.is_success() {
        CallbackError::UpstreamUnavailable(format!("status {}", status)).log(transaction_id);
        return GatewayStatusResult {
            outcome: StatusOutcome::Indeterminate,
            http_status,
            detail: Some(body.chars().take(200).collect()),
        };
    }

    match serde_json::from_str::<StatusResponse>(body) {
        Ok(StatusResponse { success: Some(true) }) => GatewayStatusResult {
            outcome: StatusOutcome::Settled,
            http_status,
            detail: None,
        },
        Ok(StatusResponse { success: Some(false) }) => GatewayStatusResult {
            outcome: StatusOutcome::Failed,
            http_status,
            detail: Some(body.chars().take(200).collect()),
        },
        Ok(StatusResponse { success: None }) => {
            CallbackError::MalformedUpstreamResponse("missing success field".to_string())
                .log(transaction_id);
            GatewayStatusResult {
                outcome: StatusOutcome::Indeterminate,
                http_status,
                detail: Some(body.chars().take(200).collect()),
            }
        }
        Err(e) => {
            CallbackError::MalformedUpstreamResponse(e.to_string()).log(transaction_id);
            GatewayStatusResult {
                outcome: StatusOutcome::Indeterminate,
                http_status,
                detail: Some(body.chars().take(200).collect()),
            }
        }
    }
}
