use api_types::settlement::{SettleRequest, SettleResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{Money, SettleCmd};

use crate::{ServerError, server::ServerState, user};

/// Pay down a split from the caller's wallet.
pub async fn settle(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<i64>,
    Json(payload): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, ServerError> {
    let outcome = state
        .engine
        .settle_split(SettleCmd::new(
            split_id,
            user.id,
            Money::new(payload.amount_minor),
        ))
        .await?;

    Ok(Json(SettleResponse {
        split_id: outcome.split_id,
        remaining_owed_minor: outcome.remaining_owed.minor(),
        is_fully_settled: outcome.is_fully_settled,
    }))
}
