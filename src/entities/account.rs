//! Account entity: the subset of a user record the sync engine needs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    /// Long-lived provider credential, exchanged for access tokens
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    /// Space-separated OAuth scopes granted by the user
    pub granted_scopes: String,
    pub is_connected: bool,
    /// Lower bound for the next incremental import pull
    pub import_watermark: Option<DateTimeUtc>,
    pub last_synced_at: Option<DateTimeUtc>,
    pub last_sync_error: Option<String>,
}

impl Model {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.granted_scopes.split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|granted| granted == scope)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
