//! Synchronization engine between the local task store and the external provider.
//!
//! [`SyncService`] owns the provider client and the storage handle and exposes
//! the three entry points the rest of the application uses:
//!
//! - [`SyncService::import_all`] - recurring pull of externally changed tasks
//! - [`SyncService::reconcile_all`] - recurring status/due-date reconciliation
//! - [`SyncService::sync_account_now`] - on-demand import for a single account
//!
//! Errors are contained at task and account granularity. The recurring entry
//! points never fail; they report counts and persist error messages on the
//! affected task mirrors and accounts.

pub mod gate;
pub mod import;
pub mod notes;
pub mod reconcile;
pub mod report;
pub mod status;

use anyhow::Result;
use chrono::{Duration, Utc};
use log::{error, info, warn};
use sea_orm::{ActiveValue, IntoActiveModel};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{account, task};
use crate::provider::{AccessToken, ProviderError, TaskProvider};
use crate::repositories::{AccountRepository, TaskRepository};
use crate::storage::LocalStorage;

pub use report::{ImportReport, ReconcileReport};

/// Errors surfaced by the on-demand sync path.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("A sync is already running for account {0}")]
    AlreadyRunning(Uuid),

    #[error("Credential refresh failed: {0}")]
    Credential(#[source] ProviderError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Tunables the engine reads on every run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub required_scope: String,
    pub default_list_id: String,
    pub initial_lookback: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            required_scope: config.google.required_scope.clone(),
            default_list_id: config.sync.default_list_id.clone(),
            initial_lookback: Duration::days(config.sync.initial_lookback_days),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Service that keeps local tasks and their external mirrors in agreement.
#[derive(Clone)]
pub struct SyncService {
    provider: Arc<dyn TaskProvider>,
    storage: Arc<LocalStorage>,
    settings: SyncSettings,
    accounts_in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

/// Exclusive hold on one account's import; released on drop.
struct AccountLease {
    account_uuid: Uuid,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for AccountLease {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.account_uuid);
        }
    }
}

impl SyncService {
    pub fn new(provider: Arc<dyn TaskProvider>, storage: Arc<LocalStorage>, settings: SyncSettings) -> Self {
        Self {
            provider,
            storage,
            settings,
            accounts_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether an import for `account_uuid` is currently running.
    pub fn is_account_syncing(&self, account_uuid: &Uuid) -> bool {
        self.accounts_in_flight
            .lock()
            .map(|in_flight| in_flight.contains(account_uuid))
            .unwrap_or(false)
    }

    fn try_lease(&self, account_uuid: Uuid) -> Option<AccountLease> {
        let mut in_flight = self.accounts_in_flight.lock().ok()?;
        if !in_flight.insert(account_uuid) {
            return None;
        }
        Some(AccountLease {
            account_uuid,
            in_flight: self.accounts_in_flight.clone(),
        })
    }

    /// Connected accounts that pass the credential gate.
    pub async fn eligible_accounts(&self) -> Result<Vec<account::Model>> {
        let accounts = AccountRepository::get_connected(&self.storage.conn).await?;
        Ok(gate::eligible_accounts(accounts, &self.settings.required_scope))
    }

    /// Exchange the account's long-lived credential for an access token.
    ///
    /// Failures are persisted on the account before being returned.
    async fn access_token(&self, account: &account::Model) -> Result<AccessToken, SyncError> {
        let refresh_token = account.refresh_token.as_deref().unwrap_or_default();
        match self.provider.refresh_access_token(refresh_token).await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("🔑 Credential refresh failed for account {}: {e}", account.email);
                if let Err(db_err) =
                    AccountRepository::record_sync_error(&self.storage.conn, &account.uuid, &e.to_string()).await
                {
                    warn!("Failed to record credential error for {}: {db_err}", account.email);
                }
                Err(SyncError::Credential(e))
            }
        }
    }

    /// Import externally changed tasks for every eligible account.
    ///
    /// Accounts currently held by an on-demand run are skipped.
    pub async fn import_all(&self) -> ImportReport {
        let mut report = ImportReport::default();

        let accounts = match self.eligible_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("❌ Failed to load accounts for import: {e}");
                return report;
            }
        };

        for account in accounts {
            let Some(_lease) = self.try_lease(account.uuid) else {
                info!("⏭️  Import for {} already in progress, skipping", account.email);
                continue;
            };

            report.accounts_scanned += 1;
            if let Err(e) = self.import_account(&account, &mut report).await {
                self.record_account_failure(&account, &e, &mut report.auth_failures, &mut report.failed_accounts)
                    .await;
            }
        }

        report
    }

    /// Run the import for exactly one account, on behalf of a user action.
    ///
    /// An account that fails the credential gate yields an empty report.
    pub async fn sync_account_now(&self, account_uuid: Uuid) -> Result<ImportReport, SyncError> {
        let account = AccountRepository::get_by_uuid(&self.storage.conn, &account_uuid)
            .await?
            .ok_or(SyncError::AccountNotFound(account_uuid))?;

        let mut report = ImportReport::default();
        if !gate::is_eligible(&account, &self.settings.required_scope) {
            info!("Account {} is not eligible for sync", account.email);
            return Ok(report);
        }

        let _lease = self
            .try_lease(account_uuid)
            .ok_or(SyncError::AlreadyRunning(account_uuid))?;

        info!("🔄 On-demand sync for {}", account.email);
        report.accounts_scanned = 1;
        if let Err(e) = self.import_account(&account, &mut report).await {
            if !matches!(e, SyncError::Credential(_)) {
                if let Err(db_err) =
                    AccountRepository::record_sync_error(&self.storage.conn, &account.uuid, &e.to_string()).await
                {
                    warn!("Failed to record sync error for {}: {db_err}", account.email);
                }
            }
            return Err(e);
        }

        info!("✅ On-demand sync for {} finished: {}", account.email, report.summary());
        Ok(report)
    }

    /// Reconcile status and due dates for every eligible account's mirrored tasks.
    pub async fn reconcile_all(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let accounts = match self.eligible_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("❌ Failed to load accounts for reconciliation: {e}");
                return report;
            }
        };

        for account in accounts {
            report.accounts_scanned += 1;
            if let Err(e) = self.reconcile_account(&account, &mut report).await {
                self.record_account_failure(&account, &e, &mut report.auth_failures, &mut report.failed_accounts)
                    .await;
            }
        }

        report
    }

    async fn record_account_failure(
        &self,
        account: &account::Model,
        err: &SyncError,
        auth_failures: &mut usize,
        failed_accounts: &mut usize,
    ) {
        if matches!(err, SyncError::Credential(_)) {
            *auth_failures += 1;
            return;
        }

        *failed_accounts += 1;
        error!("❌ Sync failed for account {}: {err}", account.email);
        if let Err(db_err) = AccountRepository::record_sync_error(&self.storage.conn, &account.uuid, &err.to_string()).await
        {
            warn!("Failed to record sync error for {}: {db_err}", account.email);
        }
    }

    /// Soft-delete a task and make a best-effort attempt to delete its external mirror.
    pub async fn delete_task(&self, task_uuid: &Uuid) -> Result<task::Model> {
        let task = TaskRepository::get_by_id(&self.storage.conn, task_uuid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", task_uuid))?;

        let now = Utc::now();
        let mut active = task.clone().into_active_model();
        active.is_deleted = ActiveValue::Set(true);
        active.deleted_at = ActiveValue::Set(Some(now));
        active.updated_at = ActiveValue::Set(now);
        let deleted = TaskRepository::update(&self.storage.conn, active).await?;

        if let Err(e) = self.delete_external_mirror(&task).await {
            warn!("⚠️  Could not delete external mirror of task {}: {e}", task.uuid);
        }

        Ok(deleted)
    }

    async fn delete_external_mirror(&self, task: &task::Model) -> Result<(), SyncError> {
        let (Some(external_id), Some(owner)) = (&task.mirror_external_id, &task.mirror_owner_account) else {
            return Ok(());
        };
        let Some(account) = AccountRepository::get_by_uuid(&self.storage.conn, owner).await? else {
            return Ok(());
        };
        if !gate::is_eligible(&account, &self.settings.required_scope) {
            return Ok(());
        }

        let token = self.access_token(&account).await?;
        let list_id = task
            .mirror_list_id
            .as_deref()
            .unwrap_or(&self.settings.default_list_id);
        match self.provider.delete_task(&token, list_id, external_id).await {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }
}
