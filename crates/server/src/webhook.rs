//! Payment-provider webhook.
//!
//! The raw body is handed to the engine untouched: the signature covers the
//! exact bytes. Duplicates are acknowledged like first deliveries so the
//! provider stops retrying.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use engine::{FundingOutcome, SIGNATURE_HEADER};

use crate::{ServerError, server::ServerState};

pub async fn payments(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ServerError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.engine.reconcile_funding(signature, &body).await? {
        FundingOutcome::Processed { .. } | FundingOutcome::Duplicate { .. } => {
            Ok((StatusCode::OK, "OK"))
        }
        FundingOutcome::Ignored => Ok((StatusCode::OK, "ignored")),
    }
}
