//! Aggregate counters returned by sync runs.

use serde::Serialize;

use super::reconcile::ReconcileOutcome;

/// Result of an import run over one or more accounts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accounts_scanned: usize,
    pub created: usize,
    pub updated: usize,
    /// Matched a local record whose stored external timestamp was already current
    pub unchanged: usize,
    pub skipped_deleted: usize,
    pub dedup_removed: usize,
    pub auth_failures: usize,
    pub failed_accounts: usize,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "accounts {} | +{} ~{} ={} | deleted skipped {} | dupes removed {} | auth failures {} | failed {}",
            self.accounts_scanned,
            self.created,
            self.updated,
            self.unchanged,
            self.skipped_deleted,
            self.dedup_removed,
            self.auth_failures,
            self.failed_accounts
        )
    }

    pub fn is_success(&self) -> bool {
        self.auth_failures == 0 && self.failed_accounts == 0
    }
}

/// Result of a status reconciliation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub accounts_scanned: usize,
    pub tasks_checked: usize,
    pub pulled: usize,
    pub pushed: usize,
    pub in_sync: usize,
    pub created: usize,
    pub mirrors_reset: usize,
    pub failed_tasks: usize,
    pub auth_failures: usize,
    pub failed_accounts: usize,
}

impl ReconcileReport {
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        self.tasks_checked += 1;
        match outcome {
            ReconcileOutcome::Pulled => self.pulled += 1,
            ReconcileOutcome::Pushed => self.pushed += 1,
            ReconcileOutcome::InSync => self.in_sync += 1,
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::MirrorReset => self.mirrors_reset += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.tasks_checked += 1;
        self.failed_tasks += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "accounts {} | tasks {} | pulled {} pushed {} created {} in sync {} | reset {} | failed {} | auth failures {}",
            self.accounts_scanned,
            self.tasks_checked,
            self.pulled,
            self.pushed,
            self.created,
            self.in_sync,
            self.mirrors_reset,
            self.failed_tasks,
            self.auth_failures
        )
    }
}
