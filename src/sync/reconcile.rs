//! Status reconciliation between a local task and its external mirror.
//!
//! Conflicts resolve last-write-wins on timestamps: the local side's
//! `status_changed_at` (falling back to the row timestamps) against the
//! external `updated` (falling back to the stored mirror value). Comparison is
//! strictly greater-than, so equal timestamps never push in either direction.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sea_orm::ActiveValue;

use super::{notes, status, SyncError, SyncService};
use crate::entities::{account, task, TaskStatus};
use crate::provider::{AccessToken, ExternalStatus, ExternalTask, NewExternalTask, TaskPatch};
use crate::repositories::task::max_timestamp;
use crate::repositories::TaskRepository;
use crate::sync::report::ReconcileReport;
use crate::utils::datetime;

/// What reconciliation decided for one task.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// External side is newer and disagrees: overwrite the local status.
    Pull {
        status: TaskStatus,
        changed_at: DateTime<Utc>,
    },
    /// Local side is newer and disagrees: send this patch.
    Push(TaskPatch),
    /// Nothing to move; refresh bookkeeping only.
    InSync,
}

/// Per-task result, aggregated into [`ReconcileReport`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Pulled,
    Pushed,
    InSync,
    Created,
    MirrorReset,
}

/// Decide which side is authoritative for `local` against its mirror `external`.
pub fn decide(local: &task::Model, external: &ExternalTask) -> Decision {
    let local_changed_at = local.local_changed_at();
    let Some(external_changed_at) = external.updated.or(local.mirror_last_external_modified_at) else {
        return Decision::InSync;
    };

    if external_changed_at > local_changed_at {
        let pulled = status::to_local(external.status);
        if pulled == local.status {
            Decision::InSync
        } else {
            Decision::Pull {
                status: pulled,
                changed_at: external_changed_at,
            }
        }
    } else if local_changed_at > external_changed_at {
        let patch = push_patch(local, external);
        if patch.is_empty() {
            Decision::InSync
        } else {
            Decision::Push(patch)
        }
    } else {
        Decision::InSync
    }
}

/// Patch that brings `external` in line with `local`.
fn push_patch(local: &task::Model, external: &ExternalTask) -> TaskPatch {
    let mut patch = TaskPatch::default();

    let desired = status::to_external(local.status);
    if desired != external.status {
        patch.status = Some(desired);
        patch.completed = Some(match desired {
            ExternalStatus::Completed => Some(local.local_changed_at()),
            ExternalStatus::NeedsAction => None,
        });
    }

    if !datetime::same_due_day(Some(local.due_date), external.due) {
        patch.due = Some(Some(local.due_date));
    }

    patch
}

impl SyncService {
    /// Reconcile every mirrored task of one account, then push its never-mirrored tasks.
    ///
    /// A failing task records its error and does not stop the loop.
    pub(super) async fn reconcile_account(
        &self,
        account: &account::Model,
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        let token = self.access_token(account).await?;
        let conn = &self.storage.conn;

        // Collected up front so a mirror reset below is never recreated in the same run.
        let unmirrored = TaskRepository::get_unmirrored_for_account(conn, &account.uuid).await?;
        let mirrored = TaskRepository::get_mirrored_for_account(conn, &account.uuid).await?;
        debug!("Reconciling {} mirrored task(s) for {}", mirrored.len(), account.email);
        for task in mirrored {
            match self.reconcile_task(&token, &task).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.record_failure();
                    self.record_task_error(&task, &e).await;
                }
            }
        }

        for task in unmirrored.into_iter().filter(task::Model::changed_since_sync) {
            match self.push_new_task(&token, &task).await {
                Ok(_) => report.record(ReconcileOutcome::Created),
                Err(e) => {
                    report.record_failure();
                    self.record_task_error(&task, &e).await;
                }
            }
        }

        Ok(())
    }

    async fn record_task_error(&self, task: &task::Model, err: &SyncError) {
        warn!("⚠️  Sync failed for task {}: {err}", task.uuid);
        if let Err(db_err) = TaskRepository::record_error(&self.storage.conn, &task.uuid, &err.to_string()).await {
            warn!("Failed to record sync error on task {}: {db_err}", task.uuid);
        }
    }

    /// Reconcile one task that already has an external id.
    pub async fn reconcile_task(&self, token: &AccessToken, task: &task::Model) -> Result<ReconcileOutcome, SyncError> {
        let conn = &self.storage.conn;
        let Some(external_id) = task.mirror_external_id.as_deref() else {
            return Err(SyncError::Storage(anyhow::anyhow!("Task {} has no external mirror", task.uuid)));
        };
        let list_id = task
            .mirror_list_id
            .as_deref()
            .unwrap_or(&self.settings.default_list_id);

        let external = match self.provider.get_task(token, list_id, external_id).await {
            Ok(external) if !external.deleted => external,
            Ok(_) => {
                self.reset_mirror(task, "External task was deleted").await?;
                return Ok(ReconcileOutcome::MirrorReset);
            }
            Err(e) if e.is_not_found() => {
                self.reset_mirror(task, &e.to_string()).await?;
                return Ok(ReconcileOutcome::MirrorReset);
            }
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        match decide(task, &external) {
            Decision::Pull { status, changed_at } => {
                info!("⬇️  Task {} status pulled from provider: {:?}", task.uuid, status);
                TaskRepository::update(
                    conn,
                    task::ActiveModel {
                        uuid: ActiveValue::Unchanged(task.uuid),
                        status: ActiveValue::Set(status),
                        status_changed_at: ActiveValue::Set(Some(changed_at)),
                        mirror_last_synced_at: ActiveValue::Set(Some(now)),
                        mirror_last_external_modified_at: ActiveValue::Set(max_timestamp(
                            task.mirror_last_external_modified_at,
                            external.updated,
                        )),
                        mirror_last_error: ActiveValue::Set(None),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(ReconcileOutcome::Pulled)
            }
            Decision::Push(patch) => {
                info!("⬆️  Pushing task {} to provider", task.uuid);
                let updated = match self.provider.update_task(token, list_id, external_id, patch).await {
                    Ok(updated) => updated,
                    Err(e) if e.is_not_found() => {
                        self.reset_mirror(task, &e.to_string()).await?;
                        return Ok(ReconcileOutcome::MirrorReset);
                    }
                    Err(e) => return Err(e.into()),
                };
                TaskRepository::mark_synced(conn, task, updated.updated, now).await?;
                Ok(ReconcileOutcome::Pushed)
            }
            Decision::InSync => {
                TaskRepository::mark_synced(conn, task, external.updated, now).await?;
                Ok(ReconcileOutcome::InSync)
            }
        }
    }

    async fn reset_mirror(&self, task: &task::Model, reason: &str) -> Result<(), SyncError> {
        warn!("🔗 External mirror of task {} is gone, resetting: {reason}", task.uuid);
        TaskRepository::reset_mirror(&self.storage.conn, &task.uuid, reason).await?;
        Ok(())
    }

    /// Create the external counterpart of a task that has never been mirrored.
    pub async fn push_new_task(&self, token: &AccessToken, task: &task::Model) -> Result<task::Model, SyncError> {
        let list_id = task
            .mirror_list_id
            .clone()
            .unwrap_or_else(|| self.settings.default_list_id.clone());

        let desired = status::to_external(task.status);
        let body = NewExternalTask {
            title: task.title.clone(),
            notes: notes::render(&notes::NotesMetadata {
                company: task.company.clone(),
                brand: task.brand.clone(),
                assignee: Some(task.assignee_email.clone()).filter(|e| !e.is_empty()),
                assigner: Some(task.assigner_email.clone()).filter(|e| !e.is_empty()),
            }),
            due: Some(task.due_date),
            status: desired,
            completed: (desired == ExternalStatus::Completed).then(|| task.local_changed_at()),
        };

        let created = self.provider.create_task(token, &list_id, body).await?;
        info!("🆕 Created external task {} for task {}", created.id, task.uuid);

        let model = TaskRepository::update(
            &self.storage.conn,
            task::ActiveModel {
                uuid: ActiveValue::Unchanged(task.uuid),
                mirror_external_id: ActiveValue::Set(Some(created.id)),
                mirror_list_id: ActiveValue::Set(Some(created.list_id)),
                mirror_last_synced_at: ActiveValue::Set(Some(Utc::now())),
                mirror_last_external_modified_at: ActiveValue::Set(created.updated),
                mirror_last_error: ActiveValue::Set(None),
                ..Default::default()
            },
        )
        .await?;
        Ok(model)
    }
}
