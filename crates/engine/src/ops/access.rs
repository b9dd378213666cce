use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, MemberRole, ResultEngine, group_members, groups, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    pub(super) async fn member_role(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        user_id: i64,
    ) -> ResultEngine<Option<MemberRole>> {
        let row = group_members::Entity::find_by_id((group_id, user_id))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| MemberRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Group must exist and `user_id` must belong to it.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        user_id: i64,
    ) -> ResultEngine<(groups::Model, MemberRole)> {
        let group = self.require_group(db, group_id).await?;
        let role = self
            .member_role(db, group_id, user_id)
            .await?
            .ok_or_else(|| EngineError::Forbidden("not a group member".to_string()))?;
        Ok((group, role))
    }

    pub(super) async fn require_admin(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        user_id: i64,
    ) -> ResultEngine<groups::Model> {
        let (group, role) = self.require_member(db, group_id, user_id).await?;
        if !role.can_invite() {
            return Err(EngineError::Forbidden(
                "only group admins can manage invitations".to_string(),
            ));
        }
        Ok(group)
    }

    /// Member ids of a group, in join order.
    pub(super) async fn group_member_ids(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
    ) -> ResultEngine<Vec<i64>> {
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .order_by_asc(group_members::Column::JoinedAt)
            .order_by_asc(group_members::Column::UserId)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }
}
