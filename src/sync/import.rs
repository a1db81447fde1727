//! Import of externally changed tasks into the local store.
//!
//! Each run pulls everything changed since the account's watermark, across
//! every task list, and upserts local records keyed by external id. Deletion
//! events are counted and never materialized. After every write the external
//! id is deduplicated, since the creation workflow and this import can race
//! to create the same record.

use chrono::{DateTime, Utc};
use log::{debug, info};
use sea_orm::ActiveValue;
use uuid::Uuid;

use super::{notes, status, ImportReport, SyncError, SyncService};
use crate::constants::UNTITLED_TASK;
use crate::entities::{account, task, TaskPriority};
use crate::provider::{AccessToken, ExternalStatus, ExternalTask};
use crate::repositories::{AccountRepository, TaskRepository};

/// Pick the record to keep among local duplicates of one external task.
///
/// Live records beat soft-deleted ones. Among those, the latest effective
/// timestamp wins and ties keep the earliest created record.
pub fn pick_survivor(records: &[task::Model]) -> Option<&task::Model> {
    records.iter().fold(None, |best: Option<&task::Model>, candidate| match best {
        None => Some(candidate),
        Some(best) => {
            let (c, b) = (candidate.effective_timestamp(), best.effective_timestamp());
            let better = match (candidate.is_deleted, best.is_deleted) {
                (false, true) => true,
                (true, false) => false,
                _ => c > b || (c == b && candidate.created_at < best.created_at),
            };
            if better {
                Some(candidate)
            } else {
                Some(best)
            }
        }
    })
}

/// When the external task last changed status: completion time if completed, else `updated`.
fn external_status_changed_at(external: &ExternalTask) -> Option<DateTime<Utc>> {
    match external.status {
        ExternalStatus::Completed => external.completed.or(external.updated),
        ExternalStatus::NeedsAction => external.updated,
    }
}

/// Build a brand-new local task from an external one.
fn new_task_from_external(
    external: &ExternalTask,
    account: &account::Model,
    external_updated: DateTime<Utc>,
    now: DateTime<Utc>,
) -> task::ActiveModel {
    let meta = external.notes.as_deref().map(notes::parse).unwrap_or_default();

    task::ActiveModel {
        uuid: ActiveValue::Set(Uuid::new_v4()),
        title: ActiveValue::Set(external.title.clone().unwrap_or_else(|| UNTITLED_TASK.to_string())),
        due_date: ActiveValue::Set(external.due.unwrap_or(now)),
        priority: ActiveValue::Set(TaskPriority::Medium),
        status: ActiveValue::Set(status::to_local(external.status)),
        status_changed_at: ActiveValue::Set(Some(external_status_changed_at(external).unwrap_or(now))),
        completion_approved: ActiveValue::Set(false),
        assignee_email: ActiveValue::Set(meta.assignee.unwrap_or_else(|| account.email.clone())),
        assigner_email: ActiveValue::Set(meta.assigner.unwrap_or_else(|| account.email.clone())),
        brand: ActiveValue::Set(meta.brand),
        company: ActiveValue::Set(meta.company),
        is_deleted: ActiveValue::Set(false),
        deleted_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        mirror_external_id: ActiveValue::Set(Some(external.id.clone())),
        mirror_list_id: ActiveValue::Set(Some(external.list_id.clone())),
        mirror_owner_account: ActiveValue::Set(Some(account.uuid)),
        mirror_last_synced_at: ActiveValue::Set(Some(now)),
        mirror_last_external_modified_at: ActiveValue::Set(Some(external_updated)),
        mirror_last_error: ActiveValue::Set(None),
    }
}

/// Changes to apply to an existing local record from a newer external version.
///
/// When the local status changed after the external edit, only mirror
/// bookkeeping is written and reconciliation pushes the local state later.
fn update_from_external(
    existing: &task::Model,
    external: &ExternalTask,
    account: &account::Model,
    external_updated: DateTime<Utc>,
    now: DateTime<Utc>,
) -> task::ActiveModel {
    let mut active = task::ActiveModel {
        uuid: ActiveValue::Unchanged(existing.uuid),
        mirror_external_id: ActiveValue::Set(Some(external.id.clone())),
        mirror_list_id: ActiveValue::Set(Some(external.list_id.clone())),
        mirror_owner_account: ActiveValue::Set(Some(existing.mirror_owner_account.unwrap_or(account.uuid))),
        mirror_last_synced_at: ActiveValue::Set(Some(now)),
        mirror_last_external_modified_at: ActiveValue::Set(Some(external_updated)),
        mirror_last_error: ActiveValue::Set(None),
        ..Default::default()
    };

    if existing.local_changed_at() > external_updated {
        return active;
    }

    if let Some(title) = &external.title {
        active.title = ActiveValue::Set(title.clone());
    }
    if let Some(due) = external.due {
        active.due_date = ActiveValue::Set(due);
    }
    let pulled = status::to_local(external.status);
    if pulled != existing.status {
        active.status = ActiveValue::Set(pulled);
        active.status_changed_at = ActiveValue::Set(Some(external_status_changed_at(external).unwrap_or(now)));
    }

    let meta = external.notes.as_deref().map(notes::parse).unwrap_or_default();
    if let Some(company) = meta.company {
        active.company = ActiveValue::Set(Some(company));
    }
    if let Some(brand) = meta.brand {
        active.brand = ActiveValue::Set(Some(brand));
    }
    if let Some(assignee) = meta.assignee {
        active.assignee_email = ActiveValue::Set(assignee);
    }
    if let Some(assigner) = meta.assigner {
        active.assigner_email = ActiveValue::Set(assigner);
    }

    active
}

impl SyncService {
    /// Pull every task changed since the account's watermark and upsert it locally.
    ///
    /// The watermark only advances once every list has been read to the end.
    pub(super) async fn import_account(
        &self,
        account: &account::Model,
        report: &mut ImportReport,
    ) -> Result<(), SyncError> {
        let started_at = Utc::now();
        let token = self.access_token(account).await?;
        let updated_since = account
            .import_watermark
            .unwrap_or(started_at - self.settings.initial_lookback);

        let list_ids = self.collect_task_lists(&token).await?;
        info!(
            "📥 Importing {} list(s) for {} (changed since {})",
            list_ids.len(),
            account.email,
            updated_since
        );

        for list_id in list_ids {
            let mut page_token: Option<String> = None;
            loop {
                let page = self
                    .provider
                    .list_tasks(&token, &list_id, updated_since, page_token.as_deref())
                    .await?;
                debug!("Fetched {} task(s) from list '{}'", page.items.len(), list_id);

                for external in page.items {
                    self.ingest_task(account, external, report).await?;
                }

                match page.next_page_token {
                    Some(next) => page_token = Some(next),
                    None => break,
                }
            }
        }

        AccountRepository::update_watermark(&self.storage.conn, &account.uuid, started_at).await?;
        Ok(())
    }

    /// Every task list id for the account, or the default list when there are none.
    async fn collect_task_lists(&self, token: &AccessToken) -> Result<Vec<String>, SyncError> {
        let mut list_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.provider.list_task_lists(token, page_token.as_deref()).await?;
            list_ids.extend(page.items.into_iter().map(|list| list.id));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        if list_ids.is_empty() {
            list_ids.push(self.settings.default_list_id.clone());
        }
        Ok(list_ids)
    }

    async fn ingest_task(
        &self,
        account: &account::Model,
        external: ExternalTask,
        report: &mut ImportReport,
    ) -> Result<(), SyncError> {
        if external.deleted {
            report.skipped_deleted += 1;
            return Ok(());
        }

        let conn = &self.storage.conn;
        let now = Utc::now();
        let external_updated = external.updated.unwrap_or(now);

        match TaskRepository::find_by_external_id(conn, &external.id, Some(&account.uuid)).await? {
            None => {
                let created =
                    TaskRepository::create(conn, new_task_from_external(&external, account, external_updated, now))
                        .await?;
                debug!("Created task {} from external task {}", created.uuid, external.id);
                report.created += 1;
            }
            Some(existing) => {
                if existing
                    .mirror_last_external_modified_at
                    .is_some_and(|stored| stored >= external_updated)
                {
                    report.unchanged += 1;
                    return Ok(());
                }

                TaskRepository::update(
                    conn,
                    update_from_external(&existing, &external, account, external_updated, now),
                )
                .await?;
                report.updated += 1;
            }
        }

        report.dedup_removed += self.dedup_external_id(&external.id).await?;
        Ok(())
    }

    /// Delete all but one local record mirroring `external_id`. Returns how many were removed.
    pub async fn dedup_external_id(&self, external_id: &str) -> Result<usize, SyncError> {
        let conn = &self.storage.conn;
        let records = TaskRepository::get_all_by_external_id(conn, external_id).await?;
        if records.len() <= 1 {
            return Ok(0);
        }

        let Some(keep) = pick_survivor(&records).map(|survivor| survivor.uuid) else {
            return Ok(0);
        };

        let mut removed = 0;
        for record in records.into_iter().filter(|record| record.uuid != keep) {
            info!(
                "🧹 Removing duplicate task {} for external task {} (keeping {})",
                record.uuid, external_id, keep
            );
            TaskRepository::delete(conn, record).await?;
            removed += 1;
        }
        Ok(removed)
    }
}
