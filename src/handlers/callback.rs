use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::checksum::ChecksumSigner;
use crate::error::{AppError, CallbackError, Result};
use crate::extractors::{Path, Query};
use crate::gateway::{StatusOutcome, TransactionReference};
use crate::settlement;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub txnid: String,
}

/// Callback after payment - verifies the claimed transaction against the
/// upstream gateway and either issues the session cookie with a redirect to
/// the success page, or redirects to the failure page with no cookie.
///
/// Every run starts fresh: there is no transaction-state store here, so a
/// repeated callback (browser reload, duplicate gateway redirect) re-queries
/// upstream rather than trusting a cached verdict.
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let transaction_id = query.txnid.trim();
    if transaction_id.is_empty() {
        return Err(AppError::BadRequest("Missing transaction identifier".into()));
    }
    if user_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing user identifier".into()));
    }

    let txn = TransactionReference {
        user_id,
        transaction_id: transaction_id.to_string(),
    };

    // Fail closed: without merchant credentials no upstream call is
    // attempted and the outcome is indeterminate.
    let signer = match ChecksumSigner::from_config(&state.gateway_config) {
        Ok(signer) => signer,
        Err(e) => {
            e.log(&txn.transaction_id);
            return Ok(failure_redirect(&state));
        }
    };

    let checksum = signer.sign(&txn.transaction_id);
    let result = state.gateway.transaction_status(&txn, &checksum).await;

    match result.outcome {
        StatusOutcome::Settled => {
            let Some(issuer) = state.issuer.as_ref() else {
                CallbackError::CredentialSigning("signing key not configured".into())
                    .log(&txn.transaction_id);
                return Ok(failure_redirect(&state));
            };

            let token = match issuer.mint(&txn.user_id, &txn.transaction_id, Utc::now().timestamp())
            {
                Ok(token) => token,
                Err(e) => {
                    e.log(&txn.transaction_id);
                    return Ok(failure_redirect(&state));
                }
            };

            // Best-effort; the redirect does not wait for the ledger.
            settlement::spawn_mark_settled(
                state.settlement.clone(),
                txn.user_id.clone(),
                txn.transaction_id.clone(),
            );

            tracing::info!(
                user_id = %txn.user_id,
                transaction_id = %txn.transaction_id,
                "payment settled, session credential issued"
            );

            let jar = CookieJar::new().add(issuer.cookie(token));
            let destination = state.redirects.success_for(&txn.user_id);
            Ok((jar, Redirect::to(&destination)).into_response())
        }
        StatusOutcome::Failed => {
            CallbackError::UpstreamRejected.log(&txn.transaction_id);
            Ok(failure_redirect(&state))
        }
        // Cause already logged at the resolver, where it is known.
        StatusOutcome::Indeterminate => Ok(failure_redirect(&state)),
    }
}

fn failure_redirect(state: &AppState) -> Response {
    Redirect::to(state.redirects.failure()).into_response()
}
