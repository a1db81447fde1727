#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, IntoActiveModel};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use taskmirror::constants::GOOGLE_TASKS_SCOPE;
use taskmirror::entities::{account, task, TaskPriority, TaskStatus};
use taskmirror::provider::{
    AccessToken, ExternalStatus, ExternalTask, NewExternalTask, Page, ProviderError, TaskListRef, TaskPatch,
    TaskProvider,
};
use taskmirror::repositories::{AccountRepository, TaskRepository};
use taskmirror::storage::LocalStorage;
use taskmirror::sync::{SyncService, SyncSettings};

pub const LIST: &str = "list-1";

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
}

/// Current time truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().with_nanosecond(0).unwrap()
}

/// Mutable state behind [`FakeProvider`].
#[derive(Default)]
pub struct FakeState {
    pub lists: Vec<String>,
    /// Keyed by external task id
    pub tasks: BTreeMap<String, ExternalTask>,
    pub page_size: Option<usize>,
    pub fail_refresh: bool,
    pub fail_list_tasks: bool,
    pub fail_get: HashSet<String>,
    pub list_tasks_delay: Option<Duration>,
    pub next_id: usize,
    pub created: Vec<NewExternalTask>,
    pub patches: Vec<(String, TaskPatch)>,
    pub deleted: Vec<String>,
    pub refresh_calls: usize,
    pub since_seen: Vec<DateTime<Utc>>,
}

/// In-memory stand-in for the Google Tasks API.
#[derive(Default)]
pub struct FakeProvider {
    pub state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        let provider = Self::default();
        provider.state.lock().unwrap().lists.push(LIST.to_string());
        Arc::new(provider)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn put(&self, task: ExternalTask) {
        self.with_state(|state| {
            state.tasks.insert(task.id.clone(), task);
        });
    }

    pub fn get(&self, id: &str) -> Option<ExternalTask> {
        self.with_state(|state| state.tasks.get(id).cloned())
    }
}

pub fn external(id: &str, status: ExternalStatus, updated: DateTime<Utc>) -> ExternalTask {
    ExternalTask {
        id: id.to_string(),
        list_id: LIST.to_string(),
        title: Some(format!("Task {id}")),
        notes: None,
        due: Some(at(0)),
        status,
        completed: (status == ExternalStatus::Completed).then_some(updated),
        updated: Some(updated),
        deleted: false,
    }
}

fn paginate<T: Clone>(items: Vec<T>, page_size: Option<usize>, page_token: Option<&str>) -> Page<T> {
    let Some(size) = page_size else {
        return Page::last(items);
    };
    let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let end = (offset + size).min(items.len());
    Page {
        items: items[offset..end].to_vec(),
        next_page_token: (end < items.len()).then(|| end.to_string()),
    }
}

#[async_trait]
impl TaskProvider for FakeProvider {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken, ProviderError> {
        self.with_state(|state| {
            state.refresh_calls += 1;
            if state.fail_refresh {
                return Err(ProviderError::Auth("invalid_grant: Token has been revoked".to_string()));
            }
            Ok(AccessToken {
                token: format!("access-{refresh_token}"),
                expires_at: None,
            })
        })
    }

    async fn list_task_lists(
        &self,
        _token: &AccessToken,
        page_token: Option<&str>,
    ) -> Result<Page<TaskListRef>, ProviderError> {
        self.with_state(|state| {
            let lists = state
                .lists
                .iter()
                .map(|id| TaskListRef {
                    id: id.clone(),
                    title: None,
                })
                .collect();
            Ok(paginate(lists, state.page_size, page_token))
        })
    }

    async fn list_tasks(
        &self,
        _token: &AccessToken,
        list_id: &str,
        updated_since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<Page<ExternalTask>, ProviderError> {
        let delay = self.with_state(|state| state.list_tasks_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.with_state(|state| {
            if state.fail_list_tasks {
                return Err(ProviderError::Network("connection reset".to_string()));
            }
            state.since_seen.push(updated_since);
            let tasks: Vec<ExternalTask> = state
                .tasks
                .values()
                .filter(|t| t.list_id == list_id)
                .filter(|t| t.updated.map_or(true, |u| u >= updated_since))
                .cloned()
                .collect();
            Ok(paginate(tasks, state.page_size, page_token))
        })
    }

    async fn get_task(&self, _token: &AccessToken, list_id: &str, task_id: &str) -> Result<ExternalTask, ProviderError> {
        self.with_state(|state| {
            if state.fail_get.contains(task_id) {
                return Err(ProviderError::Network("503 Service Unavailable".to_string()));
            }
            state
                .tasks
                .get(task_id)
                .filter(|t| t.list_id == list_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(format!("task {task_id}")))
        })
    }

    async fn create_task(
        &self,
        _token: &AccessToken,
        list_id: &str,
        task: NewExternalTask,
    ) -> Result<ExternalTask, ProviderError> {
        self.with_state(|state| {
            state.next_id += 1;
            let created = ExternalTask {
                id: format!("created-{}", state.next_id),
                list_id: list_id.to_string(),
                title: Some(task.title.clone()),
                notes: task.notes.clone(),
                due: task.due,
                status: task.status,
                completed: task.completed,
                updated: Some(now()),
                deleted: false,
            };
            state.created.push(task);
            state.tasks.insert(created.id.clone(), created.clone());
            Ok(created)
        })
    }

    async fn update_task(
        &self,
        _token: &AccessToken,
        _list_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<ExternalTask, ProviderError> {
        self.with_state(|state| {
            state.patches.push((task_id.to_string(), patch.clone()));
            let task = state
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| ProviderError::NotFound(format!("task {task_id}")))?;
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
            if let Some(due) = patch.due {
                task.due = due;
            }
            task.updated = Some(now());
            Ok(task.clone())
        })
    }

    async fn delete_task(&self, _token: &AccessToken, _list_id: &str, task_id: &str) -> Result<(), ProviderError> {
        self.with_state(|state| {
            state.deleted.push(task_id.to_string());
            state
                .tasks
                .remove(task_id)
                .map(|_| ())
                .ok_or_else(|| ProviderError::NotFound(format!("task {task_id}")))
        })
    }
}

pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub storage: Arc<LocalStorage>,
    pub service: Arc<SyncService>,
}

pub async fn harness() -> Harness {
    let provider = FakeProvider::new();
    let storage = Arc::new(LocalStorage::in_memory().await.unwrap());
    let service = Arc::new(SyncService::new(provider.clone(), storage.clone(), SyncSettings::default()));
    Harness {
        provider,
        storage,
        service,
    }
}

impl Harness {
    pub async fn account(&self, email: &str) -> account::Model {
        self.account_with(email, true, Some("refresh-token"), GOOGLE_TASKS_SCOPE)
            .await
    }

    pub async fn account_with(
        &self,
        email: &str,
        connected: bool,
        refresh_token: Option<&str>,
        scopes: &str,
    ) -> account::Model {
        AccountRepository::create(
            &self.storage.conn,
            account::ActiveModel {
                uuid: ActiveValue::Set(Uuid::new_v4()),
                email: ActiveValue::Set(email.to_string()),
                refresh_token: ActiveValue::Set(refresh_token.map(str::to_string)),
                granted_scopes: ActiveValue::Set(format!("openid email {scopes}")),
                is_connected: ActiveValue::Set(connected),
                import_watermark: ActiveValue::Set(None),
                last_synced_at: ActiveValue::Set(None),
                last_sync_error: ActiveValue::Set(None),
            },
        )
        .await
        .unwrap()
    }

    pub async fn reload_account(&self, uuid: &Uuid) -> account::Model {
        AccountRepository::get_by_uuid(&self.storage.conn, uuid)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn insert_task(&self, model: task::Model) -> task::Model {
        TaskRepository::create(&self.storage.conn, model.into_active_model().reset_all())
            .await
            .unwrap()
    }

    pub async fn reload_task(&self, uuid: &Uuid) -> Option<task::Model> {
        TaskRepository::get_by_id(&self.storage.conn, uuid).await.unwrap()
    }

    pub async fn task_count(&self) -> u64 {
        TaskRepository::count(&self.storage.conn).await.unwrap()
    }
}

/// A local task owned by `owner`, mirrored to `external_id` when given.
pub fn local_task(
    owner: &account::Model,
    external_id: Option<&str>,
    status: TaskStatus,
    status_changed_at: DateTime<Utc>,
) -> task::Model {
    task::Model {
        uuid: Uuid::new_v4(),
        title: "Quarterly report".to_string(),
        due_date: at(0),
        priority: TaskPriority::Medium,
        status,
        status_changed_at: Some(status_changed_at),
        completion_approved: false,
        assignee_email: owner.email.clone(),
        assigner_email: "boss@example.com".to_string(),
        brand: None,
        company: None,
        is_deleted: false,
        deleted_at: None,
        created_at: at(0),
        updated_at: at(0),
        mirror_external_id: external_id.map(str::to_string),
        mirror_list_id: external_id.map(|_| LIST.to_string()),
        mirror_owner_account: Some(owner.uuid),
        mirror_last_synced_at: None,
        mirror_last_external_modified_at: None,
        mirror_last_error: None,
    }
}
