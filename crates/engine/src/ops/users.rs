use sea_orm::{ActiveValue, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, users};

use super::{Engine, normalize_email, normalize_required_text};

/// Account bootstrap data. The password is hashed before it is stored.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub password: String,
}

impl Engine {
    /// Create a user account and return its id.
    pub async fn create_user(&self, new_user: NewUser) -> ResultEngine<i64> {
        let username = normalize_required_text(&new_user.username, "username")?;
        let email = normalize_email(&new_user.email)?;
        let first_name = normalize_required_text(&new_user.first_name, "first name")?;
        if new_user.password.is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        let password_hash = users::password_hash(&new_user.password);

        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let taken = users::Entity::find()
                    .filter(users::Column::Username.eq(username.as_str()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(username));
                }
                let model = users::ActiveModel {
                    id: ActiveValue::NotSet,
                    username: ActiveValue::Set(username),
                    email: ActiveValue::Set(email),
                    first_name: ActiveValue::Set(first_name),
                    password_hash: ActiveValue::Set(password_hash),
                }
                .insert(db_tx)
                .await?;
                tracing::info!(user_id = model.id, "user created");
                Ok(model.id)
            })
        })
        .await
    }

    /// Look up a user id by username.
    pub async fn user_id_by_username(&self, username: &str) -> ResultEngine<i64> {
        let username = username.trim().to_string();
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                users::Entity::find()
                    .filter(users::Column::Username.eq(username.as_str()))
                    .one(db_tx)
                    .await?
                    .map(|m| m.id)
                    .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
            })
        })
        .await
    }
}
