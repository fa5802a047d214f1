//! Execution of reconciliation plans against the two stores.
//!
//! Actions for the same unique id run in order. Distinct unique ids fan out
//! with bounded concurrency. A remote failure only affects its own record;
//! a local store failure aborts the pass once in-flight work has finished.
//! A push marks its record synced only if the record still holds the pushed
//! fields.

use crate::error::{Error, RecordFailure, Result};
use crate::remote::{with_timeout, RemoteError, RemoteMirror};
use crate::store::{StoreError, TransactionStore};
use futures::stream::{self, StreamExt};
use lumen_engine::{PassKind, ReconcilePlan, SyncAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one executed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub kind: PassKind,
    /// Whether the plan found both sides already in agreement
    pub converged: bool,
    /// Actions the plan contained
    pub attempted: usize,
    pub pushed: usize,
    pub deleted_remote: usize,
    pub dropped_duplicates: usize,
    pub hydrated: usize,
    pub refreshed: usize,
    pub failures: Vec<RecordFailure>,
}

impl PassReport {
    fn new(kind: PassKind, converged: bool, attempted: usize) -> Self {
        Self {
            kind,
            converged,
            attempted,
            pushed: 0,
            deleted_remote: 0,
            dropped_duplicates: 0,
            hydrated: 0,
            refreshed: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into the aggregate error.
    pub fn into_result(self) -> Result<PassReport> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::PartialSync {
                attempted: self.attempted,
                failures: self.failures,
            })
        }
    }

    fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Pushed => self.pushed += 1,
            Applied::DeletedRemote => self.deleted_remote += 1,
            Applied::DroppedDuplicate => self.dropped_duplicates += 1,
            Applied::Hydrated => self.hydrated += 1,
            Applied::Refreshed => self.refreshed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Applied {
    Pushed,
    DeletedRemote,
    DroppedDuplicate,
    Hydrated,
    Refreshed,
}

#[derive(Debug)]
enum ActionError {
    Remote(RemoteError),
    Store(StoreError),
}

impl From<RemoteError> for ActionError {
    fn from(e: RemoteError) -> Self {
        ActionError::Remote(e)
    }
}

impl From<StoreError> for ActionError {
    fn from(e: StoreError) -> Self {
        ActionError::Store(e)
    }
}

/// Runs plans for one user against a local store and a remote mirror.
#[derive(Clone)]
pub struct SyncExecutor {
    store: Arc<dyn TransactionStore>,
    remote: Arc<dyn RemoteMirror>,
    timeout: Duration,
    max_in_flight: usize,
}

impl SyncExecutor {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        remote: Arc<dyn RemoteMirror>,
        timeout: Duration,
        max_in_flight: usize,
    ) -> Self {
        Self {
            store,
            remote,
            timeout,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Execute every action of `plan`.
    ///
    /// Returns the report even when some remote writes failed; callers turn
    /// it into [`Error::PartialSync`] with [`PassReport::into_result`]. A
    /// local store failure is returned as [`Error::Store`].
    pub async fn execute(&self, user_id: &str, plan: ReconcilePlan) -> Result<PassReport> {
        let mut report = PassReport::new(plan.kind, plan.is_converged(), plan.actions.len());
        if plan.is_noop() {
            debug!(user_id = %user_id, kind = ?report.kind, "Nothing to reconcile");
            return Ok(report);
        }

        info!(
            user_id = %user_id,
            kind = ?report.kind,
            actions = report.attempted,
            pushes = plan.push_count(),
            remote_deletes = plan.remote_delete_count(),
            "Executing reconciliation plan"
        );

        let outcomes: Vec<Vec<(String, std::result::Result<Applied, ActionError>)>> =
            stream::iter(plan.into_groups())
                .map(|group| self.run_group(user_id, group))
                .buffer_unordered(self.max_in_flight)
                .collect()
                .await;

        let mut store_error = None;
        for (unique_id, outcome) in outcomes.into_iter().flatten() {
            match outcome {
                Ok(applied) => report.record(applied),
                Err(ActionError::Remote(e)) => report.failures.push(RecordFailure {
                    unique_id,
                    message: e.message(),
                }),
                Err(ActionError::Store(e)) => {
                    if store_error.is_none() {
                        store_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = store_error {
            error!(user_id = %user_id, error = %e, "Local store failed during reconciliation");
            return Err(Error::Store(e));
        }

        report.failures.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        info!(
            user_id = %user_id,
            pushed = report.pushed,
            deleted_remote = report.deleted_remote,
            hydrated = report.hydrated,
            refreshed = report.refreshed,
            failed = report.failures.len(),
            "Reconciliation pass finished"
        );
        Ok(report)
    }

    /// Run the actions of one unique id in order. A store failure stops the
    /// group; a remote failure does not.
    async fn run_group(
        &self,
        user_id: &str,
        group: Vec<SyncAction>,
    ) -> Vec<(String, std::result::Result<Applied, ActionError>)> {
        let mut outcomes = Vec::with_capacity(group.len());
        for action in group {
            let unique_id = action.unique_id().to_string();
            let outcome = self.apply(user_id, action).await;
            let stop = matches!(outcome, Err(ActionError::Store(_)));
            if let Err(ActionError::Remote(e)) = &outcome {
                warn!(unique_id = %unique_id, error = %e, "Remote write failed; record stays unsynced");
            }
            outcomes.push((unique_id, outcome));
            if stop {
                break;
            }
        }
        outcomes
    }

    async fn apply(
        &self,
        user_id: &str,
        action: SyncAction,
    ) -> std::result::Result<Applied, ActionError> {
        match action {
            SyncAction::PushAdd { transaction } => {
                let remote_ref = with_timeout(
                    self.timeout,
                    self.remote.add(user_id, &transaction.to_body()),
                )
                .await?;
                let marked = self.store.set_synced(&transaction, Some(&remote_ref)).await?;
                debug!(unique_id = %transaction.unique_id, remote_ref = %remote_ref, marked, "Pushed new record");
                Ok(Applied::Pushed)
            }
            SyncAction::PushUpdate {
                transaction,
                remote_ref,
            } => {
                with_timeout(
                    self.timeout,
                    self.remote
                        .update(user_id, &remote_ref, &transaction.to_body()),
                )
                .await?;
                let marked = self.store.set_synced(&transaction, Some(&remote_ref)).await?;
                debug!(unique_id = %transaction.unique_id, marked, "Pushed local edit");
                Ok(Applied::Pushed)
            }
            SyncAction::DeleteRemote {
                unique_id,
                remote_ref,
            } => {
                with_timeout(self.timeout, self.remote.delete(user_id, &remote_ref)).await?;
                self.store.delete_by_unique_id(&unique_id).await?;
                debug!(unique_id = %unique_id, "Deleted remote copy of removed record");
                Ok(Applied::DeletedRemote)
            }
            SyncAction::DropDuplicate {
                unique_id,
                remote_ref,
            } => {
                with_timeout(self.timeout, self.remote.delete(user_id, &remote_ref)).await?;
                debug!(unique_id = %unique_id, remote_ref = %remote_ref, "Dropped duplicate remote copy");
                Ok(Applied::DroppedDuplicate)
            }
            SyncAction::Hydrate { doc } => {
                self.store.insert(&doc.into_local()).await?;
                Ok(Applied::Hydrated)
            }
            SyncAction::Refresh { doc } => {
                debug!(unique_id = %doc.unique_id, "Refreshing drifted local copy");
                self.store.update(&doc.into_local()).await?;
                Ok(Applied::Refreshed)
            }
        }
    }
}
