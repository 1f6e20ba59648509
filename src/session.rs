//! Session credential minting for confirmed payments.
//!
//! The credential is an Ed25519-signed JWT asserting that one specific
//! transaction for one specific user was confirmed paid. Issuer and audience
//! are pinned to the payment-confirmation purpose so the token cannot stand
//! in for general account authentication, and the expiry window is a fixed
//! few minutes from issuance.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::SigningKey;
use jwt_simple::prelude::*;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{AppError, CallbackError, Result};

/// Cookie carrying the signed credential back to the browser.
pub const AUTH_COOKIE: &str = "authToken";

const TOKEN_ISSUER: &str = "paygate";
const TOKEN_AUDIENCE: &str = "payment-confirmation";

/// Custom claims carried by the credential. Standard claims (iss, aud, jti,
/// iat, exp) are handled by jwt-simple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "paymentSuccess")]
    pub payment_success: bool,
}

/// Sole producer of session credentials. No other component constructs or
/// inspects one.
pub struct SessionIssuer {
    key_pair: Ed25519KeyPair,
    ttl_secs: u64,
    cookie_secure: bool,
}

impl SessionIssuer {
    pub fn from_config(config: &SessionConfig) -> std::result::Result<Self, CallbackError> {
        let encoded = config
            .signing_key_b64
            .as_ref()
            .ok_or_else(|| CallbackError::CredentialSigning("signing key not configured".into()))?;

        let decoded = BASE64.decode(encoded.trim()).map_err(|e| {
            CallbackError::CredentialSigning(format!("invalid signing key encoding: {}", e))
        })?;

        if decoded.len() != 32 {
            return Err(CallbackError::CredentialSigning(format!(
                "signing key must be 32 bytes, got {}",
                decoded.len()
            )));
        }

        let key_bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| CallbackError::CredentialSigning("failed to convert key bytes".into()))?;

        let signing_key = SigningKey::from_bytes(&key_bytes);
        let key_pair = Ed25519KeyPair::from_bytes(&signing_key.to_keypair_bytes())
            .map_err(|e| CallbackError::CredentialSigning(format!("failed to create key pair: {}", e)))?;

        Ok(Self {
            key_pair,
            ttl_secs: config.ttl_secs,
            cookie_secure: config.cookie_secure,
        })
    }

    /// Generate a new Ed25519 signing key.
    /// Returns (seed_base64, public_key_base64).
    pub fn generate_keypair() -> (String, String) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let seed_b64 = BASE64.encode(signing_key.to_bytes());
        let public_b64 = BASE64.encode(signing_key.verifying_key().to_bytes());
        (seed_b64, public_b64)
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Mint a credential confirming `transaction_id` for `user_id`, valid for
    /// the configured window starting at `now` (Unix seconds).
    pub fn mint(
        &self,
        user_id: &str,
        transaction_id: &str,
        now: i64,
    ) -> std::result::Result<String, CallbackError> {
        let custom = SessionClaims {
            user_id: user_id.to_string(),
            transaction_id: transaction_id.to_string(),
            payment_success: true,
        };

        let mut claims = Claims::with_custom_claims(custom, Duration::from_secs(self.ttl_secs))
            .with_issuer(TOKEN_ISSUER)
            .with_audience(TOKEN_AUDIENCE)
            .with_jwt_id(uuid::Uuid::new_v4().to_string());

        let issued = UnixTimeStamp::from_secs(now as u64);
        claims.issued_at = Some(issued);
        claims.invalid_before = Some(issued);
        claims.expires_at = Some(UnixTimeStamp::from_secs(now as u64 + self.ttl_secs));

        self.key_pair
            .sign(claims)
            .map_err(|e| CallbackError::CredentialSigning(format!("failed to sign token: {}", e)))
    }

    /// Verify a credential and extract its claims. Expiry is checked with
    /// zero clock tolerance.
    pub fn verify(&self, token: &str) -> Result<JWTClaims<SessionClaims>> {
        let mut options = VerificationOptions::default();
        options.time_tolerance = Some(Duration::from_secs(0));
        options.allowed_issuers = Some(HashSet::from_strings(&[TOKEN_ISSUER]));
        options.allowed_audiences = Some(HashSet::from_strings(&[TOKEN_AUDIENCE]));

        self.key_pair
            .public_key()
            .verify_token::<SessionClaims>(token, Some(options))
            .map_err(|e| AppError::BadRequest(format!("Invalid token: {}", e)))
    }

    /// Wrap a minted token in the protected cookie: inaccessible to page
    /// scripts, same-site navigation only, scoped to the site root, expiring
    /// with the credential.
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(AUTH_COOKIE, token);
        cookie.set_http_only(true);
        cookie.set_secure(self.cookie_secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::seconds(self.ttl_secs as i64));
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_issuer() -> SessionIssuer {
        let (seed, _) = SessionIssuer::generate_keypair();
        SessionIssuer::from_config(&SessionConfig {
            signing_key_b64: Some(seed),
            ttl_secs: 600,
            cookie_secure: false,
        })
        .unwrap()
    }

    #[test]
    fn test_mint_and_verify() {
        let issuer = test_issuer();
        let now = Utc::now().timestamp();

        let token = issuer.mint("42", "TXN123", now).unwrap();
        let verified = issuer.verify(&token).unwrap();

        assert_eq!(verified.custom.user_id, "42");
        assert_eq!(verified.custom.transaction_id, "TXN123");
        assert!(verified.custom.payment_success);
        assert_eq!(verified.issuer.as_deref(), Some(TOKEN_ISSUER));
        assert!(verified.jwt_id.is_some());
    }

    #[test]
    fn test_expiry_window_is_fixed() {
        let issuer = test_issuer();
        let now = Utc::now().timestamp();

        let token = issuer.mint("42", "TXN123", now).unwrap();
        let verified = issuer.verify(&token).unwrap();

        let issued = verified.issued_at.unwrap().as_secs();
        let expires = verified.expires_at.unwrap().as_secs();
        assert_eq!(expires - issued, 600);
        assert_eq!(issued, now as u64);
    }

    #[test]
    fn test_expired_credential_is_rejected() {
        let issuer = test_issuer();
        let backdated = Utc::now().timestamp() - 601;

        let token = issuer.mint("42", "TXN123", backdated).unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_foreign_key_cannot_forge_credentials() {
        let issuer = test_issuer();
        let other = test_issuer();
        let now = Utc::now().timestamp();

        let token = other.mint("42", "TXN123", now).unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_cookie_attributes() {
        let issuer = test_issuer();
        let cookie = issuer.cookie("token-value".to_string());

        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "token-value");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
    }

    #[test]
    fn test_missing_signing_key_is_a_signing_error() {
        let result = SessionIssuer::from_config(&SessionConfig {
            signing_key_b64: None,
            ttl_secs: 600,
            cookie_secure: true,
        });
        assert!(matches!(result, Err(CallbackError::CredentialSigning(_))));
    }
}
