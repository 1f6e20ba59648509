use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::StatusGateway;
use crate::redirect::RedirectPolicy;
use crate::session::SessionIssuer;
use crate::settlement::SettlementStore;

/// Per-process state shared by the handlers. Everything request-scoped lives
/// on the stack of one callback invocation.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub gateway: Arc<dyn StatusGateway>,
    /// Absent when no signing key is configured; settled callbacks then fail
    /// closed instead of issuing an unsigned credential.
    pub issuer: Option<Arc<SessionIssuer>>,
    pub redirects: RedirectPolicy,
    pub settlement: Arc<dyn SettlementStore>,
}
