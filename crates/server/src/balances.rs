//! Read-only balance views.

use api_types::balance::{BalanceView, BalancesResponse, GroupSummaryResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{ServerError, server::ServerState, user};

fn views(balances: Vec<engine::Balance>) -> Vec<BalanceView> {
    balances
        .into_iter()
        .map(|b| BalanceView {
            user_id: b.user_id,
            username: b.username,
            total_minor: b.total.minor(),
        })
        .collect()
}

pub async fn owed(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state.engine.balances_owed(user.id).await?;
    Ok(Json(BalancesResponse {
        balances: views(balances),
    }))
}

pub async fn owed_to_me(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state.engine.balances_owed_to(user.id).await?;
    Ok(Json(BalancesResponse {
        balances: views(balances),
    }))
}

pub async fn group_summary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<GroupSummaryResponse>, ServerError> {
    let summary = state.engine.group_summary(group_id, user.id).await?;
    Ok(Json(GroupSummaryResponse {
        group_id: summary.group_id,
        group_name: summary.group_name,
        debtors: views(summary.debtors),
    }))
}
