use std::env;
use std::time::Duration;

/// Top-level service configuration, loaded once at startup and handed to the
/// components that need it. Nothing reads the environment after this point.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub settlement_db_path: String,
    pub dev_mode: bool,
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
    pub redirects: RedirectConfig,
}

/// Upstream gateway credentials and endpoint shape.
///
/// `merchant_id` and `secrets` are optional on purpose: the checksum signer
/// fails closed per request when they are absent instead of crashing the
/// process at startup. No `Debug` impl - `secrets` must never reach logs.
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub status_path: String,
    pub merchant_id: Option<String>,
    /// Rotated shared secrets; the position in this list is the key index.
    pub secrets: Vec<String>,
    pub active_key_index: usize,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct SessionConfig {
    /// Base64-encoded 32-byte Ed25519 seed. Absent means the issuer is
    /// unavailable and settled callbacks fail closed.
    pub signing_key_b64: Option<String>,
    pub ttl_secs: u64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub success_url: String,
    pub failure_url: String,
    /// Hosts an absolute redirect destination may point at. Relative
    /// same-site paths are always allowed.
    pub allowed_hosts: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let timeout_ms: u64 = env::var("GATEWAY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let gateway = GatewayConfig {
            base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9100".to_string()),
            status_path: env::var("GATEWAY_STATUS_PATH")
                .unwrap_or_else(|_| "/transaction/status/".to_string()),
            merchant_id: env::var("GATEWAY_MERCHANT_ID").ok().filter(|v| !v.is_empty()),
            secrets: env::var("GATEWAY_KEYS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            active_key_index: env::var("GATEWAY_KEY_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            timeout: Duration::from_millis(timeout_ms),
        };

        let session = SessionConfig {
            signing_key_b64: env::var("SESSION_SIGNING_KEY").ok().filter(|v| !v.is_empty()),
            ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            cookie_secure: !dev_mode,
        };

        let redirects = RedirectConfig {
            success_url: env::var("SUCCESS_URL").unwrap_or_else(|_| "/success".to_string()),
            failure_url: env::var("FAILURE_URL").unwrap_or_else(|_| "/failed".to_string()),
            allowed_hosts: env::var("ALLOWED_REDIRECT_HOSTS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_lowercase)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self {
            host,
            port,
            settlement_db_path: env::var("SETTLEMENT_DB_PATH")
                .unwrap_or_else(|_| "paygate.db".to_string()),
            dev_mode,
            gateway,
            session,
            redirects,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
