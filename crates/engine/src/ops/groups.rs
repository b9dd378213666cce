use sea_orm::{ActiveValue, prelude::*};

use crate::{EngineError, Group, MemberRole, ResultEngine, group_members, groups};

use super::{Engine, normalize_optional_text, normalize_required_text};

impl Engine {
    /// Create a group; the creator joins it as admin.
    pub async fn new_group(
        &self,
        name: &str,
        description: Option<&str>,
        creator: i64,
    ) -> ResultEngine<Group> {
        let name = normalize_required_text(name, "group name")?;
        let description = normalize_optional_text(description);
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, creator).await?;
                let now = engine.clock.now();
                let group = groups::new_active(name, description, creator, now)
                    .insert(db_tx)
                    .await?;
                engine
                    .insert_member(db_tx, group.id, creator, MemberRole::Admin)
                    .await?;
                tracing::info!(group_id = group.id, creator, "group created");
                Ok(Group::from(group))
            })
        })
        .await
    }

    /// Add `user_id` to the group as a plain member. Only admins can do it.
    pub async fn add_group_member(
        &self,
        group_id: i64,
        admin: i64,
        user_id: i64,
    ) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_admin(db_tx, group_id, admin).await?;
                engine.require_user(db_tx, user_id).await?;
                if engine.member_role(db_tx, group_id, user_id).await?.is_some() {
                    return Err(EngineError::ExistingKey(format!(
                        "user {user_id} in group {group_id}"
                    )));
                }
                engine
                    .insert_member(db_tx, group_id, user_id, MemberRole::Member)
                    .await
            })
        })
        .await
    }

    pub(super) async fn insert_member(
        &self,
        db: &sea_orm::DatabaseTransaction,
        group_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> ResultEngine<()> {
        group_members::ActiveModel {
            group_id: ActiveValue::Set(group_id),
            user_id: ActiveValue::Set(user_id),
            role: ActiveValue::Set(role.as_str().to_string()),
            joined_at: ActiveValue::Set(self.clock.now()),
        }
        .insert(db)
        .await?;
        Ok(())
    }
}
