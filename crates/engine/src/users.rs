//! Users table (minimal entity).
//!
//! The HTTP layer checks credentials against `password_hash`; the engine
//! itself only needs a user's id to scope money movements and the contact
//! fields to address notifications.

use sea_orm::entity::prelude::*;
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub password_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::wallets::Entity")]
    Wallet,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Hex SHA-256 of a raw password, the form stored in `password_hash`.
pub fn password_hash(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
