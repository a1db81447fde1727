//! Task entity with its embedded external mirror record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Local task status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in-progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    pub title: String,
    pub due_date: DateTimeUtc,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub status_changed_at: Option<DateTimeUtc>,
    pub completion_approved: bool,
    pub assignee_email: String,
    pub assigner_email: String,
    pub brand: Option<String>,
    pub company: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    #[sea_orm(indexed)]
    pub mirror_external_id: Option<String>,
    pub mirror_list_id: Option<String>,
    pub mirror_owner_account: Option<Uuid>,
    pub mirror_last_synced_at: Option<DateTimeUtc>,
    pub mirror_last_external_modified_at: Option<DateTimeUtc>,
    pub mirror_last_error: Option<String>,
}

/// The `mirror_*` columns of a task viewed as one record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mirror {
    pub external_id: Option<String>,
    pub list_id: Option<String>,
    pub owner_account: Option<Uuid>,
    pub last_synced_at: Option<DateTimeUtc>,
    pub last_external_modified_at: Option<DateTimeUtc>,
    pub last_error: Option<String>,
}

impl Model {
    pub fn mirror(&self) -> Mirror {
        Mirror {
            external_id: self.mirror_external_id.clone(),
            list_id: self.mirror_list_id.clone(),
            owner_account: self.mirror_owner_account,
            last_synced_at: self.mirror_last_synced_at,
            last_external_modified_at: self.mirror_last_external_modified_at,
            last_error: self.mirror_last_error.clone(),
        }
    }

    /// When the status last changed locally, falling back to the row timestamps.
    pub fn local_changed_at(&self) -> DateTimeUtc {
        self.status_changed_at.unwrap_or(self.updated_at.max(self.created_at))
    }

    /// Timestamp used to pick a survivor among duplicates of one external task.
    pub fn effective_timestamp(&self) -> DateTimeUtc {
        self.mirror_last_external_modified_at
            .unwrap_or(self.updated_at.max(self.created_at))
    }

    /// Whether the record changed locally after its last sync, or was never synced.
    pub fn changed_since_sync(&self) -> bool {
        self.mirror_last_synced_at
            .map_or(true, |synced| self.local_changed_at().max(self.updated_at) > synced)
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror_external_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::MirrorOwnerAccount",
        to = "super::account::Column::Uuid",
        on_delete = "SetNull"
    )]
    OwnerAccount,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnerAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
