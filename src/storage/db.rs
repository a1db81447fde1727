use anyhow::{Context, Result};
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, Schema};
use std::time::Duration;

use crate::entities::{account, task};

/// Local storage manager owning the SeaORM connection.
pub struct LocalStorage {
    pub conn: DatabaseConnection,
}

impl LocalStorage {
    /// Connect to the database at `database_url` and make sure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .min_connections(1)
            .max_connections(if is_in_memory(database_url) { 1 } else { 4 })
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;

        let storage = Self { conn };
        storage.init_schema().await?;
        info!("💾 Local storage ready");
        Ok(storage)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Create tables from the entity definitions
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut accounts = schema.create_table_from_entity(account::Entity);
        accounts.if_not_exists();
        self.conn.execute(backend.build(&accounts)).await?;

        let mut tasks = schema.create_table_from_entity(task::Entity);
        tasks.if_not_exists();
        self.conn.execute(backend.build(&tasks)).await?;

        for mut index in schema.create_index_from_entity(task::Entity) {
            index.if_not_exists();
            self.conn.execute(backend.build(&index)).await?;
        }

        Ok(())
    }

    /// Check if the database has any tasks
    pub async fn has_data(&self) -> Result<bool> {
        Ok(task::Entity::find().count(&self.conn).await? > 0)
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
