//! Account repository for database operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::account;

/// Repository for account-related database operations.
pub struct AccountRepository;

impl AccountRepository {
    /// Get all accounts.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<account::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(account::Entity::find()
            .order_by_asc(account::Column::Email)
            .all(conn)
            .await?)
    }

    /// Get all accounts flagged as connected to the provider.
    pub async fn get_connected<C>(conn: &C) -> Result<Vec<account::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(account::Entity::find()
            .filter(account::Column::IsConnected.eq(true))
            .order_by_asc(account::Column::Email)
            .all(conn)
            .await?)
    }

    /// Get an account by UUID.
    pub async fn get_by_uuid<C>(conn: &C, uuid: &Uuid) -> Result<Option<account::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(account::Entity::find_by_id(*uuid).one(conn).await?)
    }

    /// Create a new account.
    pub async fn create<C>(conn: &C, account: account::ActiveModel) -> Result<account::Model>
    where
        C: ConnectionTrait,
    {
        Ok(account.insert(conn).await?)
    }

    /// Advance the import watermark after a complete pull.
    pub async fn update_watermark<C>(conn: &C, uuid: &Uuid, watermark: DateTime<Utc>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        account::ActiveModel {
            uuid: ActiveValue::Unchanged(*uuid),
            import_watermark: ActiveValue::Set(Some(watermark)),
            last_synced_at: ActiveValue::Set(Some(Utc::now())),
            last_sync_error: ActiveValue::Set(None),
            ..Default::default()
        }
        .update(conn)
        .await?;
        Ok(())
    }

    /// Store the most recent account-level sync failure.
    pub async fn record_sync_error<C>(conn: &C, uuid: &Uuid, message: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        account::ActiveModel {
            uuid: ActiveValue::Unchanged(*uuid),
            last_sync_error: ActiveValue::Set(Some(message.to_string())),
            ..Default::default()
        }
        .update(conn)
        .await?;
        Ok(())
    }

    pub async fn set_connected<C>(conn: &C, uuid: &Uuid, connected: bool) -> Result<()>
    where
        C: ConnectionTrait,
    {
        account::ActiveModel {
            uuid: ActiveValue::Unchanged(*uuid),
            is_connected: ActiveValue::Set(connected),
            ..Default::default()
        }
        .update(conn)
        .await?;
        Ok(())
    }
}
