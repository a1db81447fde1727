//! Task repository for database operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entities::task;

/// Repository for task-related database operations.
pub struct TaskRepository;

impl TaskRepository {
    /// Get a single task by UUID.
    pub async fn get_by_id<C>(conn: &C, uuid: &Uuid) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find_by_id(*uuid).one(conn).await?)
    }

    /// Find the task mirroring `external_id`, preferring one owned by `account_uuid`.
    pub async fn find_by_external_id<C>(
        conn: &C,
        external_id: &str,
        account_uuid: Option<&Uuid>,
    ) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        if let Some(account_uuid) = account_uuid {
            let scoped = task::Entity::find()
                .filter(task::Column::MirrorExternalId.eq(external_id))
                .filter(task::Column::MirrorOwnerAccount.eq(*account_uuid))
                .order_by_asc(task::Column::CreatedAt)
                .one(conn)
                .await?;
            if scoped.is_some() {
                return Ok(scoped);
            }
        }

        Ok(task::Entity::find()
            .filter(task::Column::MirrorExternalId.eq(external_id))
            .order_by_asc(task::Column::CreatedAt)
            .one(conn)
            .await?)
    }

    /// Every local record mirroring `external_id`, soft-deleted ones included.
    pub async fn get_all_by_external_id<C>(conn: &C, external_id: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::MirrorExternalId.eq(external_id))
            .order_by_asc(task::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Live tasks owned by an account that already have an external counterpart.
    pub async fn get_mirrored_for_account<C>(conn: &C, account_uuid: &Uuid) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::MirrorOwnerAccount.eq(*account_uuid))
            .filter(task::Column::MirrorExternalId.is_not_null())
            .filter(task::Column::IsDeleted.eq(false))
            .order_by_asc(task::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Live tasks owned by an account that were never pushed to the provider.
    pub async fn get_unmirrored_for_account<C>(conn: &C, account_uuid: &Uuid) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::MirrorOwnerAccount.eq(*account_uuid))
            .filter(task::Column::MirrorExternalId.is_null())
            .filter(task::Column::IsDeleted.eq(false))
            .order_by_asc(task::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Insert a new task.
    pub async fn create<C>(conn: &C, task: task::ActiveModel) -> Result<task::Model>
    where
        C: ConnectionTrait,
    {
        Ok(task.insert(conn).await?)
    }

    /// Apply a partial update; only `Set` columns are written.
    pub async fn update<C>(conn: &C, task: task::ActiveModel) -> Result<task::Model>
    where
        C: ConnectionTrait,
    {
        Ok(task.update(conn).await?)
    }

    /// Hard-delete a task row.
    pub async fn delete<C>(conn: &C, task: task::Model) -> Result<()>
    where
        C: ConnectionTrait,
    {
        task.delete(conn).await?;
        Ok(())
    }

    pub async fn count<C>(conn: &C) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find().count(conn).await?)
    }

    /// Store a sync failure on the task's mirror.
    pub async fn record_error<C>(conn: &C, uuid: &Uuid, message: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        Self::update(
            conn,
            task::ActiveModel {
                uuid: ActiveValue::Unchanged(*uuid),
                mirror_last_error: ActiveValue::Set(Some(message.to_string())),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Forget the external counterpart after the provider lost it.
    pub async fn reset_mirror<C>(conn: &C, uuid: &Uuid, message: &str) -> Result<task::Model>
    where
        C: ConnectionTrait,
    {
        Self::update(
            conn,
            task::ActiveModel {
                uuid: ActiveValue::Unchanged(*uuid),
                mirror_external_id: ActiveValue::Set(None),
                mirror_last_synced_at: ActiveValue::Set(Some(Utc::now())),
                mirror_last_external_modified_at: ActiveValue::Set(None),
                mirror_last_error: ActiveValue::Set(Some(message.to_string())),
                ..Default::default()
            },
        )
        .await
    }

    /// Record a successful sync and advance the external modified-at watermark.
    ///
    /// The stored external timestamp never moves backwards.
    pub async fn mark_synced<C>(
        conn: &C,
        task: &task::Model,
        external_modified_at: Option<DateTime<Utc>>,
        synced_at: DateTime<Utc>,
    ) -> Result<task::Model>
    where
        C: ConnectionTrait,
    {
        let modified_at = max_timestamp(task.mirror_last_external_modified_at, external_modified_at);
        Self::update(
            conn,
            task::ActiveModel {
                uuid: ActiveValue::Unchanged(task.uuid),
                mirror_last_synced_at: ActiveValue::Set(Some(synced_at)),
                mirror_last_external_modified_at: ActiveValue::Set(modified_at),
                mirror_last_error: ActiveValue::Set(None),
                ..Default::default()
            },
        )
        .await
    }
}

/// Later of two optional timestamps.
pub fn max_timestamp(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
