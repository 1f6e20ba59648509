use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure taxonomy for the callback pipeline.
///
/// Every kind resolves to the failure redirect; none of them reach the
/// browser as error detail.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("gateway configuration missing: {0}")]
    Configuration(&'static str),

    #[error("payment gateway unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("payment gateway rejected the transaction")]
    UpstreamRejected,

    #[error("malformed gateway response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("credential signing failed: {0}")]
    CredentialSigning(String),
}

impl CallbackError {
    /// Log at the severity the kind warrants: configuration and signing
    /// failures need operator attention, an upstream rejection is expected
    /// traffic.
    pub fn log(&self, transaction_id: &str) {
        match self {
            CallbackError::Configuration(_) | CallbackError::CredentialSigning(_) => {
                tracing::error!(transaction_id, "{}", self);
            }
            CallbackError::UpstreamUnavailable(_) | CallbackError::MalformedUpstreamResponse(_) => {
                tracing::warn!(transaction_id, "{}", self);
            }
            CallbackError::UpstreamRejected => {
                tracing::info!(transaction_id, "{}", self);
            }
        }
    }
}
