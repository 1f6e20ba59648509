//! Integrity signatures for upstream status queries.
//!
//! The gateway authenticates status requests with a SHA-256 digest over the
//! request material concatenated with a shared secret, formatted as
//! `{hexDigest}###{keyIndex}` so the receiver knows which rotated secret was
//! used. The signature authenticates this service to the gateway; it is never
//! sent to the browser.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::GatewayConfig;
use crate::error::CallbackError;

/// Header carrying the computed signature on outbound status queries.
pub const CHECKSUM_HEADER: &str = "x-checksum";
/// Header carrying the merchant identifier on outbound status queries.
pub const MERCHANT_HEADER: &str = "x-merchant-id";

/// Computes and verifies status-query signatures for one merchant.
///
/// Construction fails closed: without a merchant id and at least one secret
/// no signature can exist, so no upstream call may be attempted.
#[derive(Clone)]
pub struct ChecksumSigner {
    status_path: String,
    merchant_id: String,
    secrets: Vec<String>,
    active_key_index: usize,
}

impl ChecksumSigner {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, CallbackError> {
        let merchant_id = config
            .merchant_id
            .clone()
            .ok_or(CallbackError::Configuration("merchant id"))?;

        if config.secrets.is_empty() {
            return Err(CallbackError::Configuration("shared secrets"));
        }
        if config.active_key_index >= config.secrets.len() {
            return Err(CallbackError::Configuration("active key index"));
        }

        Ok(Self {
            status_path: config.status_path.clone(),
            merchant_id,
            secrets: config.secrets.clone(),
            active_key_index: config.active_key_index,
        })
    }

    /// Signature for a status query on `transaction_id`, using the active
    /// secret: `{hexDigest}###{keyIndex}`.
    pub fn sign(&self, transaction_id: &str) -> String {
        let digest = signature_digest(
            &self.status_path,
            &self.merchant_id,
            transaction_id,
            &self.secrets[self.active_key_index],
        );
        format!("{}###{}", digest, self.active_key_index)
    }

    /// Recompute the signature for `transaction_id` against the key index the
    /// presented value names and compare in constant time.
    pub fn verify(&self, transaction_id: &str, presented: &str) -> bool {
        let Some((digest, index)) = presented.rsplit_once("###") else {
            return false;
        };
        let Ok(index) = index.parse::<usize>() else {
            return false;
        };
        let Some(secret) = self.secrets.get(index) else {
            return false;
        };

        let expected = signature_digest(&self.status_path, &self.merchant_id, transaction_id, secret);

        // Length check is not constant-time, but that's fine - signature length
        // is not secret (it's always 64 hex chars for SHA-256)
        if expected.len() != digest.len() {
            return false;
        }

        expected.as_bytes().ct_eq(digest.as_bytes()).into()
    }
}

/// SHA-256 over `{statusPath}{merchantId}/{transactionId}{secret}`, hex-encoded.
fn signature_digest(status_path: &str, merchant_id: &str, transaction_id: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(status_path.as_bytes());
    hasher.update(merchant_id.as_bytes());
    hasher.update(b"/");
    hasher.update(transaction_id.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
