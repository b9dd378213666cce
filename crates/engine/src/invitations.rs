//! Group invitations.
//!
//! Status is a small state machine over
//! `{pending, accepted, expired, revoked}`: transitions only leave
//! `pending`, every other status is terminal. The raw token handed to the
//! invitee is never stored, only its SHA-256 hash.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Validates a transition; only `pending` may move, and never to itself.
    pub fn transition(self, to: InvitationStatus) -> Result<InvitationStatus, EngineError> {
        if self.is_terminal() || to == Self::Pending {
            return Err(EngineError::Conflict(format!(
                "invitation cannot move from {} to {}",
                self.as_str(),
                to.as_str()
            )));
        }
        Ok(to)
    }
}

impl TryFrom<&str> for InvitationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid invitation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub group_id: i64,
    pub email: String,
    pub status: InvitationStatus,
    pub invited_by: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Returned once on creation: the raw token is not recoverable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_invitations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: i64,
    pub email: String,
    #[sea_orm(unique)]
    pub token_hash: String,
    pub status: String,
    pub invited_by: i64,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Invitation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            group_id: model.group_id,
            email: model.email,
            status: InvitationStatus::try_from(model.status.as_str())?,
            invited_by: model.invited_by,
            expires_at: model.expires_at,
            created_at: model.created_at,
        })
    }
}

pub(crate) fn new_active(
    group_id: i64,
    email: String,
    token_hash: String,
    invited_by: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        group_id: ActiveValue::Set(group_id),
        email: ActiveValue::Set(email),
        token_hash: ActiveValue::Set(token_hash),
        status: ActiveValue::Set(InvitationStatus::Pending.as_str().to_string()),
        invited_by: ActiveValue::Set(invited_by),
        expires_at: ActiveValue::Set(expires_at),
        created_at: ActiveValue::Set(created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_transitions() {
        use InvitationStatus::*;
        assert_eq!(Pending.transition(Accepted), Ok(Accepted));
        assert_eq!(Pending.transition(Expired), Ok(Expired));
        assert_eq!(Pending.transition(Revoked), Ok(Revoked));
        assert!(Pending.transition(Pending).is_err());
        for terminal in [Accepted, Expired, Revoked] {
            assert!(terminal.is_terminal());
            assert!(terminal.transition(Revoked).is_err());
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Expired,
            InvitationStatus::Revoked,
        ] {
            assert_eq!(InvitationStatus::try_from(status.as_str()), Ok(status));
        }
        assert!(InvitationStatus::try_from("bogus").is_err());
    }
}
