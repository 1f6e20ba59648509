//! Test utilities and fixtures for Paygate integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;

pub use paygate::config::{GatewayConfig, RedirectConfig, SessionConfig};
pub use paygate::gateway::{
    GatewayStatusResult, StatusGateway, StatusOutcome, TransactionReference,
};
pub use paygate::handlers;
pub use paygate::redirect::RedirectPolicy;
pub use paygate::session::{SessionIssuer, AUTH_COOKIE};
pub use paygate::settlement::SqliteSettlementStore;
pub use paygate::state::AppState;

/// Scripted upstream gateway: always reports the configured outcome and
/// counts how many status queries were made.
pub struct ScriptedGateway {
    outcome: StatusOutcome,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    pub fn new(outcome: StatusOutcome) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                outcome,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl StatusGateway for ScriptedGateway {
    async fn transaction_status(
        &self,
        _txn: &TransactionReference,
        _checksum: &str,
    ) -> GatewayStatusResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        GatewayStatusResult {
            outcome: self.outcome,
            http_status: Some(200),
            detail: None,
        }
    }
}

pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        base_url: "http://127.0.0.1:9100".to_string(),
        status_path: "/transaction/status/".to_string(),
        merchant_id: Some("MERCHANT1".to_string()),
        secrets: vec!["alpha-secret".to_string()],
        active_key_index: 0,
        timeout: Duration::from_secs(5),
    }
}

/// Gateway config with no merchant credentials, for fail-closed tests.
pub fn unconfigured_gateway_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: None,
        secrets: vec![],
        ..test_gateway_config()
    }
}

pub fn test_issuer() -> Arc<SessionIssuer> {
    let (seed, _) = SessionIssuer::generate_keypair();
    Arc::new(
        SessionIssuer::from_config(&SessionConfig {
            signing_key_b64: Some(seed),
            ttl_secs: 600,
            cookie_secure: false,
        })
        .unwrap(),
    )
}

pub fn test_redirects() -> RedirectPolicy {
    RedirectPolicy::from_config(&RedirectConfig {
        success_url: "/success".to_string(),
        failure_url: "/failed".to_string(),
        allowed_hosts: vec![],
    })
    .unwrap()
}

pub struct TestApp {
    pub app: Router,
    pub issuer: Arc<SessionIssuer>,
    pub gateway_calls: Arc<AtomicUsize>,
    pub settlement: Arc<SqliteSettlementStore>,
}

pub fn app_with_outcome(outcome: StatusOutcome) -> TestApp {
    app_with(test_gateway_config(), outcome)
}

pub fn app_with(gateway_config: GatewayConfig, outcome: StatusOutcome) -> TestApp {
    let (gateway, gateway_calls) = ScriptedGateway::new(outcome);
    let issuer = test_issuer();
    let settlement = Arc::new(SqliteSettlementStore::in_memory().unwrap());

    let state = AppState {
        gateway_config,
        gateway: Arc::new(gateway),
        issuer: Some(issuer.clone()),
        redirects: test_redirects(),
        settlement: settlement.clone(),
    };

    TestApp {
        app: handlers::router().with_state(state),
        issuer,
        gateway_calls,
        settlement,
    }
}

/// App whose session issuer is unavailable (no signing key configured).
pub fn app_without_issuer(outcome: StatusOutcome) -> TestApp {
    let (gateway, gateway_calls) = ScriptedGateway::new(outcome);
    let issuer = test_issuer();
    let settlement = Arc::new(SqliteSettlementStore::in_memory().unwrap());

    let state = AppState {
        gateway_config: test_gateway_config(),
        gateway: Arc::new(gateway),
        issuer: None,
        redirects: test_redirects(),
        settlement: settlement.clone(),
    };

    TestApp {
        app: handlers::router().with_state(state),
        issuer,
        gateway_calls,
        settlement,
    }
}

pub fn callback_request(user_id: &str, txnid: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/payment/callback/{}?txnid={}", user_id, txnid))
        .body(Body::empty())
        .unwrap()
}

/// Extract the `authToken` value from a response's Set-Cookie header.
pub fn auth_cookie_token<B>(response: &axum::http::Response<B>) -> Option<String> {
    let set_cookie = response.headers().get("set-cookie")?.to_str().ok()?;
    let value = set_cookie.split(';').next()?;
    value
        .strip_prefix(&format!("{}=", AUTH_COOKIE))
        .map(str::to_string)
}
