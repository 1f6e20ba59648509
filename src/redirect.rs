//! Redirect destinations for the callback response.
//!
//! Destinations come from configuration, never from request-derived strings.
//! Relative same-site paths are accepted as-is; absolute URLs must name an
//! allowlisted host, checked once at policy construction.

use crate::config::RedirectConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    success_url: String,
    failure_url: String,
}

impl RedirectPolicy {
    pub fn from_config(config: &RedirectConfig) -> Result<Self> {
        for url in [&config.success_url, &config.failure_url] {
            if !destination_allowed(url, &config.allowed_hosts) {
                return Err(AppError::Internal(format!(
                    "redirect destination not allowed: {}",
                    url
                )));
            }
        }

        Ok(Self {
            success_url: config.success_url.trim_end_matches('/').to_string(),
            failure_url: config.failure_url.clone(),
        })
    }

    /// Success destination for a user, e.g. `/success/42`.
    pub fn success_for(&self, user_id: &str) -> String {
        format!("{}/{}", self.success_url, urlencoding::encode(user_id))
    }

    pub fn failure(&self) -> &str {
        &self.failure_url
    }
}

/// A destination is allowed if it is a same-site path, or an http(s) URL
/// whose host is on the allowlist. Protocol-relative URLs are rejected.
fn destination_allowed(url: &str, allowed_hosts: &[String]) -> bool {
    if url.starts_with('/') {
        return !url.starts_with("//");
    }

    let rest = match url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
        Some(rest) => rest,
        None => return false,
    };

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    !host.is_empty() && allowed_hosts.iter().any(|allowed| *allowed == host)
}
