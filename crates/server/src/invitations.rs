//! Invitation endpoints.

use api_types::invitation::{
    InvitationCreated, InvitationListResponse, InvitationStatus, InvitationView, InviteRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::InviteCmd;

use crate::{ServerError, server::ServerState, user};

fn map_status(status: engine::InvitationStatus) -> InvitationStatus {
    match status {
        engine::InvitationStatus::Pending => InvitationStatus::Pending,
        engine::InvitationStatus::Accepted => InvitationStatus::Accepted,
        engine::InvitationStatus::Expired => InvitationStatus::Expired,
        engine::InvitationStatus::Revoked => InvitationStatus::Revoked,
    }
}

fn view(invitation: engine::Invitation) -> InvitationView {
    InvitationView {
        id: invitation.id,
        group_id: invitation.group_id,
        email: invitation.email,
        status: map_status(invitation.status),
        expires_at: invitation.expires_at,
    }
}

pub async fn invite(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
    Json(payload): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationCreated>), ServerError> {
    let mut cmd = InviteCmd::new(group_id, user.id, payload.email);
    if let Some(hours) = payload.ttl_hours {
        let ttl = chrono::Duration::try_hours(hours)
            .ok_or_else(|| ServerError::Generic("ttl_hours out of range".to_string()))?;
        cmd = cmd.ttl(ttl);
    }

    let issued = state.engine.invite_member(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvitationCreated {
            invitation: view(issued.invitation),
            token: issued.token,
        }),
    ))
}

pub async fn list_pending(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<InvitationListResponse>, ServerError> {
    let invitations = state
        .engine
        .list_pending_invitations(group_id, user.id)
        .await?
        .into_iter()
        .map(view)
        .collect();
    Ok(Json(InvitationListResponse { invitations }))
}

pub async fn accept(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationView>, ServerError> {
    let invitation = state.engine.accept_invitation(&token, user.id).await?;
    Ok(Json(view(invitation)))
}

pub async fn revoke(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(invitation_id): Path<i64>,
) -> Result<Json<InvitationView>, ServerError> {
    let invitation = state
        .engine
        .revoke_invitation(invitation_id, user.id)
        .await?;
    Ok(Json(view(invitation)))
}
