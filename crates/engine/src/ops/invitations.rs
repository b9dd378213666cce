use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{
    EngineError, InviteCmd, Invitation, InvitationStatus, IssuedInvitation, MemberRole,
    Notification, ResultEngine, hash_token, invitations, users,
};

use super::{Engine, normalize_email};

/// What happened to a token inside the accept unit of work. An expired
/// invitation is committed as such before the caller is told.
enum Acceptance {
    Accepted(Invitation),
    Expired,
}

impl Engine {
    /// Invite `email` to a group. Admins only.
    ///
    /// Returns the raw token exactly once; only its SHA-256 hash is stored.
    pub async fn invite_member(&self, cmd: InviteCmd) -> ResultEngine<IssuedInvitation> {
        let InviteCmd {
            group_id,
            inviter,
            email,
            ttl,
        } = cmd;
        let email = normalize_email(&email)?;
        if ttl <= chrono::Duration::zero() {
            return Err(EngineError::Validation(
                "invitation ttl must be > 0".to_string(),
            ));
        }

        let (issued, notification) = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let group = engine.require_admin(db_tx, group_id, inviter).await?;

                    let pending = invitations::Entity::find()
                        .filter(invitations::Column::GroupId.eq(group_id))
                        .filter(invitations::Column::Email.eq(email.as_str()))
                        .filter(
                            invitations::Column::Status.eq(InvitationStatus::Pending.as_str()),
                        )
                        .one(db_tx)
                        .await?;
                    if pending.is_some() {
                        return Err(EngineError::ExistingKey(format!(
                            "pending invitation for {email}"
                        )));
                    }
                    if engine.email_is_member(db_tx, group_id, &email).await? {
                        return Err(EngineError::ExistingKey(format!(
                            "{email} already in group"
                        )));
                    }

                    let token = engine.references.invitation_token();
                    let now = engine.clock.now();
                    let model = invitations::new_active(
                        group_id,
                        email.clone(),
                        hash_token(&token),
                        inviter,
                        now + ttl,
                        now,
                    )
                    .insert(db_tx)
                    .await?;
                    let invitation = Invitation::try_from(model)?;
                    tracing::info!(invitation_id = invitation.id, group_id, "invitation created");

                    let notification = Notification::new(
                        email,
                        format!("You're invited to join {}", group.name),
                        format!(
                            "Use this code to join {} before {}: {token}",
                            group.name, invitation.expires_at
                        ),
                    );
                    Ok((IssuedInvitation { invitation, token }, notification))
                })
            })
            .await?;

        self.notify(notification);
        Ok(issued)
    }

    /// Redeem a raw token and join the group as a member.
    pub async fn accept_invitation(&self, token: &str, user_id: i64) -> ResultEngine<Invitation> {
        let token_hash = hash_token(token.trim());
        let acceptance = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    engine.require_user(db_tx, user_id).await?;
                    let model = invitations::Entity::find()
                        .filter(invitations::Column::TokenHash.eq(token_hash.as_str()))
                        .one(db_tx)
                        .await?
                        .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))?;
                    let invitation = Invitation::try_from(model)?;
                    invitation.status.transition(InvitationStatus::Accepted)?;

                    if invitation.expires_at <= engine.clock.now() {
                        engine
                            .move_invitation(db_tx, invitation.id, InvitationStatus::Expired)
                            .await?;
                        return Ok(Acceptance::Expired);
                    }
                    if engine
                        .member_role(db_tx, invitation.group_id, user_id)
                        .await?
                        .is_some()
                    {
                        return Err(EngineError::ExistingKey(format!(
                            "user {user_id} in group {}",
                            invitation.group_id
                        )));
                    }

                    engine
                        .move_invitation(db_tx, invitation.id, InvitationStatus::Accepted)
                        .await?;
                    engine
                        .insert_member(db_tx, invitation.group_id, user_id, MemberRole::Member)
                        .await?;
                    tracing::info!(
                        invitation_id = invitation.id,
                        group_id = invitation.group_id,
                        user_id,
                        "invitation accepted"
                    );
                    Ok(Acceptance::Accepted(Invitation {
                        status: InvitationStatus::Accepted,
                        ..invitation
                    }))
                })
            })
            .await?;

        match acceptance {
            Acceptance::Accepted(invitation) => Ok(invitation),
            Acceptance::Expired => Err(EngineError::Conflict(
                "invitation expired".to_string(),
            )),
        }
    }

    /// `pending -> revoked`. Admins of the invitation's group only.
    pub async fn revoke_invitation(
        &self,
        invitation_id: i64,
        admin: i64,
    ) -> ResultEngine<Invitation> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = invitations::Entity::find_by_id(invitation_id)
                    .one(db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))?;
                engine.require_admin(db_tx, model.group_id, admin).await?;
                let invitation = Invitation::try_from(model)?;
                let status = invitation.status.transition(InvitationStatus::Revoked)?;
                engine
                    .move_invitation(db_tx, invitation.id, status)
                    .await?;
                tracing::info!(invitation_id, "invitation revoked");
                Ok(Invitation {
                    status,
                    ..invitation
                })
            })
        })
        .await
    }

    /// Pending invitations of a group, newest first. Admins only.
    pub async fn list_pending_invitations(
        &self,
        group_id: i64,
        admin: i64,
    ) -> ResultEngine<Vec<Invitation>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_admin(db_tx, group_id, admin).await?;
                let rows = invitations::Entity::find()
                    .filter(invitations::Column::GroupId.eq(group_id))
                    .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                    .order_by_desc(invitations::Column::CreatedAt)
                    .all(db_tx)
                    .await?;
                rows.into_iter().map(Invitation::try_from).collect()
            })
        })
        .await
    }

    /// Mark every pending invitation past `now` as expired, in one statement.
    ///
    /// Returns the number of rows changed; a second run with nothing due
    /// changes none.
    pub async fn expire_invitations(&self, now: DateTime<Utc>) -> ResultEngine<u64> {
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let result = invitations::Entity::update_many()
                    .col_expr(
                        invitations::Column::Status,
                        Expr::value(InvitationStatus::Expired.as_str()),
                    )
                    .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                    .filter(invitations::Column::ExpiresAt.lt(now))
                    .exec(db_tx)
                    .await?;
                Ok(result.rows_affected)
            })
        })
        .await
    }

    /// Guarded status change: only rows still `pending` move.
    async fn move_invitation(
        &self,
        db: &DatabaseTransaction,
        invitation_id: i64,
        to: InvitationStatus,
    ) -> ResultEngine<()> {
        let result = invitations::Entity::update_many()
            .col_expr(invitations::Column::Status, Expr::value(to.as_str()))
            .filter(invitations::Column::Id.eq(invitation_id))
            .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "invitation {invitation_id} is no longer pending"
            )));
        }
        Ok(())
    }

    async fn email_is_member(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        email: &str,
    ) -> ResultEngine<bool> {
        let accounts = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .all(db)
            .await?;
        for account in accounts {
            if self.member_role(db, group_id, account.id).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
