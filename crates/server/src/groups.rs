//! Group scaffolding endpoints.

use api_types::group::{GroupCreated, GroupNew, MemberAdd};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, user};

pub async fn group_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let group = state
        .engine
        .new_group(&payload.name, payload.description.as_deref(), user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(GroupCreated { id: group.id })))
}

pub async fn member_add(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
    Json(payload): Json<MemberAdd>,
) -> Result<StatusCode, ServerError> {
    let member = state.engine.user_id_by_username(&payload.username).await?;
    state
        .engine
        .add_group_member(group_id, user.id, member)
        .await?;
    Ok(StatusCode::CREATED)
}
