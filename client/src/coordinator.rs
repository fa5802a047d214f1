//! Transaction lifecycle coordinator.
//!
//! Single entry point for every mutation of the transaction set. Each call
//! picks its write path from two signals:
//!
//! - signed in **and** connected: write through the remote mirror first,
//!   then mirror the result locally with `synced = true`
//! - otherwise: write the local store only with `synced = false` and leave
//!   the rest to the next reconciliation pass
//!
//! Every operation publishes `Loading` and then a terminal state on a watch
//! channel so a UI can render it without holding a reference to the call.
//!
//! Mutations and reconciliation passes never interleave: a mutation started
//! during a pass waits for it, and a pass waits for in-flight mutations.
//! Lock order is `pass_guard` before `write_guard`.

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::remote::{with_timeout, RemoteError, RemoteMirror};
use crate::state::RequestState;
use crate::store::TransactionStore;
use crate::sync::{PassReport, SyncExecutor};
use lumen_engine::{validate_transaction, Reconciler, RemoteRef, Transaction, UniqueId, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Tuning knobs for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub remote_timeout: Duration,
    pub max_in_flight: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        ClientConfig::default().into()
    }
}

impl From<ClientConfig> for CoordinatorOptions {
    fn from(config: ClientConfig) -> Self {
        Self {
            remote_timeout: config.remote_timeout,
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Added(Transaction),
    Edited(Transaction),
    Deleted(UniqueId),
    Erased,
}

/// Coordinates local and remote writes for one installation.
pub struct Coordinator {
    store: Arc<dyn TransactionStore>,
    remote: Option<Arc<dyn RemoteMirror>>,
    auth: Arc<dyn AuthState>,
    connectivity: Connectivity,
    options: CoordinatorOptions,
    /// Held for the whole duration of a reconciliation pass
    pass_guard: Mutex<()>,
    /// Held by every mutation and by a running pass
    write_guard: Mutex<()>,
    mutation_state: watch::Sender<RequestState<MutationOutcome>>,
    list_state: watch::Sender<RequestState<Vec<Transaction>>>,
    sync_state: watch::Sender<RequestState<PassReport>>,
}

impl Coordinator {
    /// `remote` is `None` for a local-only installation.
    pub fn new(
        store: Arc<dyn TransactionStore>,
        remote: Option<Arc<dyn RemoteMirror>>,
        auth: Arc<dyn AuthState>,
        connectivity: Connectivity,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            store,
            remote,
            auth,
            connectivity,
            options,
            pass_guard: Mutex::new(()),
            write_guard: Mutex::new(()),
            mutation_state: watch::Sender::new(RequestState::Idle),
            list_state: watch::Sender::new(RequestState::Idle),
            sync_state: watch::Sender::new(RequestState::Idle),
        }
    }

    pub fn mutation_state(&self) -> watch::Receiver<RequestState<MutationOutcome>> {
        self.mutation_state.subscribe()
    }

    pub fn list_state(&self) -> watch::Receiver<RequestState<Vec<Transaction>>> {
        self.list_state.subscribe()
    }

    pub fn sync_state(&self) -> watch::Receiver<RequestState<PassReport>> {
        self.sync_state.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    /// User and mirror to write through, or `None` for the local-only path.
    fn write_through(&self) -> Option<(UserId, &Arc<dyn RemoteMirror>)> {
        let remote = self.remote.as_ref()?;
        if !self.connectivity.is_connected() || !self.auth.is_logged_in() {
            return None;
        }
        let user_id = self.auth.current_user_id()?;
        Some((user_id, remote))
    }

    async fn remote_call<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, RemoteError>>,
    {
        Ok(with_timeout(self.options.remote_timeout, call).await?)
    }

    /// Create a transaction.
    pub async fn add(&self, transaction: Transaction) -> Result<Transaction> {
        self.mutation_state.send_replace(RequestState::Loading);
        let result = self.add_inner(transaction).await;
        publish(&self.mutation_state, result.as_ref().map(|t| MutationOutcome::Added(t.clone())));
        result
    }

    async fn add_inner(&self, mut transaction: Transaction) -> Result<Transaction> {
        validate_transaction(&transaction)?;
        transaction.fields = transaction.fields.at_stored_precision();
        transaction.synced = false;

        let _writing = self.write_guard.lock().await;

        if let Some((user_id, remote)) = self.write_through() {
            let remote_ref = self
                .remote_call(remote.add(&user_id, &transaction.to_body()))
                .await?;
            transaction.mark_synced(Some(remote_ref));
        }

        let stored = self.store.insert(&transaction).await?;
        debug!(unique_id = %stored.unique_id, synced = stored.synced, "Added transaction");
        Ok(stored)
    }

    /// Replace the fields of an existing transaction.
    pub async fn edit(&self, transaction: Transaction) -> Result<Transaction> {
        self.mutation_state.send_replace(RequestState::Loading);
        let result = self.edit_inner(transaction).await;
        publish(&self.mutation_state, result.as_ref().map(|t| MutationOutcome::Edited(t.clone())));
        result
    }

    async fn edit_inner(&self, transaction: Transaction) -> Result<Transaction> {
        validate_transaction(&transaction)?;

        let _writing = self.write_guard.lock().await;
        let mut updated = self
            .store
            .find(&transaction.unique_id)
            .await?
            .ok_or_else(|| Error::NotFound(transaction.unique_id.clone()))?;
        updated.apply_edit(transaction.fields);

        if let Some((user_id, remote)) = self.write_through() {
            let body = updated.to_body();
            let located = match self.locate_remote(&user_id, remote, &updated).await? {
                Some(remote_ref) => {
                    match self.remote_call(remote.update(&user_id, &remote_ref, &body)).await {
                        Ok(()) => Some(remote_ref),
                        Err(e) if is_not_found(&e) && updated.remote_ref.is_some() => {
                            debug!(unique_id = %updated.unique_id, stale_ref = %remote_ref, "Stored remote ref is gone; looking the record up");
                            let found = self
                                .remote_call(remote.find_by_unique_id(&user_id, &updated.unique_id))
                                .await?
                                .filter(|found| *found != remote_ref);
                            if let Some(found) = &found {
                                self.remote_call(remote.update(&user_id, found, &body)).await?;
                            }
                            found
                        }
                        Err(e) => return Err(e),
                    }
                }
                None => None,
            };

            let remote_ref = match located {
                Some(remote_ref) => remote_ref,
                None => {
                    debug!(unique_id = %updated.unique_id, "No remote copy; writing edit through as an add");
                    self.remote_call(remote.add(&user_id, &body)).await?
                }
            };
            updated.mark_synced(Some(remote_ref));
        }

        self.store.update(&updated).await?;
        debug!(unique_id = %updated.unique_id, synced = updated.synced, "Edited transaction");
        Ok(updated)
    }

    /// Delete a transaction. Deleting a missing transaction succeeds.
    pub async fn delete(&self, unique_id: &str) -> Result<()> {
        self.mutation_state.send_replace(RequestState::Loading);
        let result = self.delete_inner(unique_id).await;
        publish(
            &self.mutation_state,
            result.as_ref().map(|_| MutationOutcome::Deleted(unique_id.to_string())),
        );
        result
    }

    async fn delete_inner(&self, unique_id: &str) -> Result<()> {
        let _writing = self.write_guard.lock().await;
        let existing = self.store.find(unique_id).await?;

        if let Some((user_id, remote)) = self.write_through() {
            let remote_ref = match &existing {
                Some(tx) => self.locate_remote(&user_id, remote, tx).await?,
                None => {
                    self.remote_call(remote.find_by_unique_id(&user_id, unique_id))
                        .await?
                }
            };
            if let Some(remote_ref) = remote_ref {
                self.remote_call(remote.delete(&user_id, &remote_ref))
                    .await?;
            }
        }

        self.store.delete_by_unique_id(unique_id).await?;
        debug!(unique_id = %unique_id, "Deleted transaction");
        Ok(())
    }

    /// Remote handle of a local record: the stored one, else a lookup.
    async fn locate_remote(
        &self,
        user_id: &str,
        remote: &Arc<dyn RemoteMirror>,
        tx: &Transaction,
    ) -> Result<Option<RemoteRef>> {
        if let Some(remote_ref) = &tx.remote_ref {
            return Ok(Some(remote_ref.clone()));
        }
        self.remote_call(remote.find_by_unique_id(user_id, &tx.unique_id))
            .await
    }

    /// The transaction list, newest first.
    ///
    /// Runs a reconciliation pass first when signed in and connected. A
    /// failed pass is published on the sync state; the local list is served
    /// regardless.
    pub async fn list(&self) -> Result<Vec<Transaction>> {
        self.list_state.send_replace(RequestState::Loading);

        if self.write_through().is_some() {
            if let Err(e) = self.reconcile().await {
                warn!(error = %e, "Reconciliation failed; serving local transactions");
            }
        }

        let result = self.store.select_all().await.map_err(Error::from);
        publish(&self.list_state, result.as_ref().map(Clone::clone));
        result
    }

    /// Run one reconciliation pass.
    ///
    /// Returns `Ok(None)` if another pass was already running; the call
    /// waits for that pass to finish instead of starting a second one.
    pub async fn reconcile(&self) -> Result<Option<PassReport>> {
        let Some((user_id, remote)) = self.write_through() else {
            return Err(self.offline_reason());
        };

        let _guard = match self.pass_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(user_id = %user_id, "Reconciliation already in flight; joining it");
                let _joined = self.pass_guard.lock().await;
                return Ok(None);
            }
        };

        let _writing = self.write_guard.lock().await;
        self.sync_state.send_replace(RequestState::Loading);
        let result = self.run_pass(&user_id, remote).await;
        publish(&self.sync_state, result.as_ref().map(Clone::clone));
        result.map(Some)
    }

    async fn run_pass(&self, user_id: &str, remote: &Arc<dyn RemoteMirror>) -> Result<PassReport> {
        let docs = self.remote_call(remote.query_by_user(user_id)).await?;
        let local = self.store.select_all().await?;
        let erasure_pending = match self.store.erasure_pending().await? {
            Some(owner) if owner == user_id => true,
            Some(owner) => {
                debug!(user_id = %user_id, erasure_owner = %owner, "Pending erasure belongs to another user; ignoring it");
                false
            }
            None => false,
        };

        let plan = Reconciler::new(&local, &docs)
            .with_erasure_pending(erasure_pending)
            .plan()?;

        let report = self.executor(remote).execute(user_id, plan).await?;
        if erasure_pending && report.is_clean() {
            self.store.set_erasure_pending(None).await?;
            info!(user_id = %user_id, "Pending erasure reached the remote mirror");
        }
        report.into_result()
    }

    /// Delete every transaction on purpose.
    ///
    /// Signed in and connected: the remote copies go first, then the local
    /// ones. Otherwise only the local store is cleared; a signed-in user's
    /// remote copies follow on the next pass.
    pub async fn erase_all(&self) -> Result<()> {
        self.mutation_state.send_replace(RequestState::Loading);
        let result = self.erase_inner().await;
        publish(&self.mutation_state, result.as_ref().map(|_| MutationOutcome::Erased));
        result
    }

    async fn erase_inner(&self) -> Result<()> {
        let _guard = self.pass_guard.lock().await;
        let _writing = self.write_guard.lock().await;

        let Some((user_id, remote)) = self.write_through() else {
            self.store.delete_all().await?;
            let owner = self
                .auth
                .current_user_id()
                .filter(|_| self.auth.is_logged_in());
            if let Some(owner) = owner {
                self.store.set_erasure_pending(Some(&owner)).await?;
                info!(user_id = %owner, "Erased local transactions; remote erasure pending");
            }
            return Ok(());
        };

        let docs = self.remote_call(remote.query_by_user(&user_id)).await?;
        self.store.set_erasure_pending(Some(&user_id)).await?;
        self.store.delete_all().await?;

        let plan = Reconciler::new(&[], &docs).with_erasure_pending(true).plan()?;
        let report = self.executor(remote).execute(&user_id, plan).await?;
        if report.is_clean() {
            self.store.set_erasure_pending(None).await?;
        }
        info!(user_id = %user_id, deleted_remote = report.deleted_remote, "Erased all transactions");
        report.into_result().map(|_| ())
    }

    fn executor(&self, remote: &Arc<dyn RemoteMirror>) -> SyncExecutor {
        SyncExecutor::new(
            Arc::clone(&self.store),
            Arc::clone(remote),
            self.options.remote_timeout,
            self.options.max_in_flight,
        )
    }

    fn offline_reason(&self) -> Error {
        if self.remote.is_none() || !self.connectivity.is_connected() {
            Error::Remote(RemoteError::Offline)
        } else {
            Error::NotAuthenticated
        }
    }
}

fn is_not_found(e: &Error) -> bool {
    matches!(e, Error::Remote(remote) if remote.is_not_found())
}

fn publish<T: Clone>(state: &watch::Sender<RequestState<T>>, result: std::result::Result<T, &Error>) {
    let next = match result {
        Ok(value) => RequestState::Success(value),
        Err(e) => RequestState::Error(e.user_message()),
    };
    state.send_replace(next);
}
