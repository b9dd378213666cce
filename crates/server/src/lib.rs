use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use provider::{FundingInit, PaymentProvider, ProviderError};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod groups;
mod invitations;
mod provider;
mod server;
mod settlement;
mod user;
mod wallet;
mod webhook;

pub enum ServerError {
    Engine(EngineError),
    Provider(ProviderError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
        EngineError::BadMetadata(_) | EngineError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::Validation(_)
        | EngineError::NoMembersToSplit => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Provider(err) => {
                tracing::error!("payment provider error: {err}");
                (StatusCode::BAD_GATEWAY, "payment provider unavailable".to_string())
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<ProviderError> for ServerError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use super::*;

    fn status(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_errors_map_to_statuses() {
        let s = || "x".to_string();
        assert_eq!(status(EngineError::Forbidden(s())), StatusCode::FORBIDDEN);
        assert_eq!(status(EngineError::KeyNotFound(s())), StatusCode::NOT_FOUND);
        assert_eq!(status(EngineError::ExistingKey(s())), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::Conflict(s())), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::Unauthorized(s())), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(EngineError::InsufficientFunds(s())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status(EngineError::BadMetadata(s())), StatusCode::BAD_REQUEST);
        assert_eq!(status(EngineError::InvalidPayload(s())), StatusCode::BAD_REQUEST);
        assert_eq!(status(EngineError::Timeout(s())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status(EngineError::InvalidAmount(s())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(EngineError::Validation(s())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(EngineError::NoMembersToSplit),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn database_errors_are_not_leaked() {
        use http_body_util::BodyExt;

        let res = ServerError::from(EngineError::Database(DbErr::Custom(
            "no such table: secrets".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
