//! External task provider abstraction.
//!
//! This module defines the interface the sync engine uses to talk to the
//! external task service, along with provider-agnostic data types and error
//! handling. The provider layer performs I/O only and holds no sync policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod google;

pub use google::GoogleTasksClient;

/// Common error types for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Completion state as the provider models it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExternalStatus {
    NeedsAction,
    Completed,
}

impl ExternalStatus {
    /// Parse the provider's wire value. Anything but `completed` is still open.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("completed") => ExternalStatus::Completed,
            _ => ExternalStatus::NeedsAction,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            ExternalStatus::NeedsAction => "needsAction",
            ExternalStatus::Completed => "completed",
        }
    }
}

/// Short-lived token obtained from the account's long-lived credential.
#[derive(Clone, Debug)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// One page of a paginated listing.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskListRef {
    pub id: String,
    pub title: Option<String>,
}

/// Provider-agnostic external task.
///
/// Timestamps the provider sent in a malformed shape are `None` here; the
/// caller decides the fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalTask {
    pub id: String,
    pub list_id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due: Option<DateTime<Utc>>,
    pub status: ExternalStatus,
    pub completed: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// Body for creating a task on the provider.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExternalTask {
    pub title: String,
    pub notes: Option<String>,
    pub due: Option<DateTime<Utc>>,
    pub status: ExternalStatus,
    pub completed: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<ExternalStatus>,
    pub completed: Option<Option<DateTime<Utc>>>,
    pub due: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.completed.is_none() && self.due.is_none()
    }
}

/// Interface to the external task service.
///
/// Every data call takes an access token obtained through
/// [`TaskProvider::refresh_access_token`].
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Exchange a long-lived credential for an access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken, ProviderError>;

    async fn list_task_lists(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
    ) -> Result<Page<TaskListRef>, ProviderError>;

    /// Tasks changed at or after `updated_since`, including completed and deleted ones.
    async fn list_tasks(
        &self,
        token: &AccessToken,
        list_id: &str,
        updated_since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<Page<ExternalTask>, ProviderError>;

    async fn get_task(&self, token: &AccessToken, list_id: &str, task_id: &str) -> Result<ExternalTask, ProviderError>;

    async fn create_task(
        &self,
        token: &AccessToken,
        list_id: &str,
        task: NewExternalTask,
    ) -> Result<ExternalTask, ProviderError>;

    async fn update_task(
        &self,
        token: &AccessToken,
        list_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<ExternalTask, ProviderError>;

    async fn delete_task(&self, token: &AccessToken, list_id: &str, task_id: &str) -> Result<(), ProviderError>;
}
