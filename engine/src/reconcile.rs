//! Reconciliation planning between the local store and the remote mirror.
//!
//! The planner is pure: given the local set and a freshly fetched remote set
//! it produces the list of actions that bring both sides to the same state.
//! Executing those actions is the caller's job.
//!
//! # Algorithm
//!
//! 1. Index both sides by unique id
//! 2. Empty local set: hydrate from the remote (or wipe it if an erasure is
//!    pending) and stop
//! 3. Push every local record that is missing remotely or not synced
//! 4. Delete every remote document whose unique id is not held locally
//! 5. Report convergence iff steps 3 and 4 found nothing to do

use crate::{error::Result, Error, RemoteDoc, RemoteRef, Transaction, UniqueId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One step that moves the two sides towards each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncAction {
    /// Local record with no remote copy: add it remotely, then mark synced
    PushAdd { transaction: Transaction },
    /// Local edit not yet mirrored: replace the remote document
    PushUpdate {
        transaction: Transaction,
        remote_ref: RemoteRef,
    },
    /// Remote document whose unique id is gone locally
    DeleteRemote {
        unique_id: UniqueId,
        remote_ref: RemoteRef,
    },
    /// Remote document copied into an empty local store
    Hydrate { doc: RemoteDoc },
    /// Synced local copy that drifted from its remote document
    Refresh { doc: RemoteDoc },
    /// Extra remote copy of a unique id that already has one
    DropDuplicate {
        unique_id: UniqueId,
        remote_ref: RemoteRef,
    },
}

impl SyncAction {
    pub fn unique_id(&self) -> &str {
        match self {
            SyncAction::PushAdd { transaction } | SyncAction::PushUpdate { transaction, .. } => {
                &transaction.unique_id
            }
            SyncAction::DeleteRemote { unique_id, .. }
            | SyncAction::DropDuplicate { unique_id, .. } => unique_id,
            SyncAction::Hydrate { doc } | SyncAction::Refresh { doc } => &doc.unique_id,
        }
    }

    /// Whether executing this action writes to the remote mirror.
    pub fn touches_remote(&self) -> bool {
        matches!(
            self,
            SyncAction::PushAdd { .. }
                | SyncAction::PushUpdate { .. }
                | SyncAction::DeleteRemote { .. }
                | SyncAction::DropDuplicate { .. }
        )
    }

    pub fn is_push(&self) -> bool {
        matches!(self, SyncAction::PushAdd { .. } | SyncAction::PushUpdate { .. })
    }

    fn remote_ref(&self) -> Option<&str> {
        match self {
            SyncAction::PushAdd { .. } => None,
            SyncAction::PushUpdate { remote_ref, .. }
            | SyncAction::DeleteRemote { remote_ref, .. }
            | SyncAction::DropDuplicate { remote_ref, .. } => Some(remote_ref),
            SyncAction::Hydrate { doc } | SyncAction::Refresh { doc } => Some(&doc.remote_ref),
        }
    }
}

/// What kind of pass the planner decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassKind {
    /// Both sides empty
    Empty,
    /// Empty local store filled from the remote
    FirstHydration,
    /// Regular diff of two populated sides
    Incremental,
    /// Empty local store after an intentional wipe; the remote follows
    Erasure,
}

/// Result of planning one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    pub kind: PassKind,
    /// Actions sorted by unique id
    pub actions: Vec<SyncAction>,
}

impl ReconcilePlan {
    /// True iff nothing needed pushing, deleting or refreshing. A first
    /// hydration alone still counts as converged.
    pub fn is_converged(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, SyncAction::Hydrate { .. }))
    }

    /// True iff the plan has no actions at all.
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn push_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_push()).count()
    }

    pub fn remote_delete_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| {
                matches!(
                    a,
                    SyncAction::DeleteRemote { .. } | SyncAction::DropDuplicate { .. }
                )
            })
            .count()
    }

    /// Split into per-unique-id groups. Actions within a group must run in
    /// order; distinct groups are independent.
    pub fn into_groups(self) -> Vec<Vec<SyncAction>> {
        let mut groups: Vec<Vec<SyncAction>> = Vec::new();
        for action in self.actions {
            match groups.last_mut() {
                Some(group) if group[0].unique_id() == action.unique_id() => group.push(action),
                _ => groups.push(vec![action]),
            }
        }
        groups
    }
}

/// Plans a reconciliation pass for one user.
pub struct Reconciler<'a> {
    local: &'a [Transaction],
    remote: &'a [RemoteDoc],
    erasure_pending: bool,
}

impl<'a> Reconciler<'a> {
    /// Create a planner over the current local set and a fresh remote set.
    pub fn new(local: &'a [Transaction], remote: &'a [RemoteDoc]) -> Self {
        Self {
            local,
            remote,
            erasure_pending: false,
        }
    }

    /// Treat an empty local set as an intentional erasure rather than an
    /// unhydrated store.
    pub fn with_erasure_pending(mut self, pending: bool) -> Self {
        self.erasure_pending = pending;
        self
    }

    /// Compute the plan.
    ///
    /// Fails only if the local set holds the same unique id twice.
    pub fn plan(self) -> Result<ReconcilePlan> {
        let mut seen = HashSet::with_capacity(self.local.len());
        for tx in self.local {
            if !seen.insert(tx.unique_id.as_str()) {
                return Err(Error::DuplicateLocalId(tx.unique_id.clone()));
            }
        }

        let remote_by_id = self.index_remote();

        let (kind, mut actions) = if self.local.is_empty() {
            self.plan_empty_local(&remote_by_id)
        } else {
            (PassKind::Incremental, self.plan_incremental(&remote_by_id))
        };

        actions.sort_by(|a, b| {
            a.unique_id()
                .cmp(b.unique_id())
                .then_with(|| a.remote_ref().cmp(&b.remote_ref()))
        });

        Ok(ReconcilePlan { kind, actions })
    }

    /// Remote documents grouped by unique id, each group ordered by ref.
    fn index_remote(&self) -> BTreeMap<&'a str, Vec<&'a RemoteDoc>> {
        let mut index: BTreeMap<&str, Vec<&RemoteDoc>> = BTreeMap::new();
        for doc in self.remote {
            index.entry(doc.unique_id.as_str()).or_default().push(doc);
        }
        for docs in index.values_mut() {
            docs.sort_by(|a, b| a.remote_ref.cmp(&b.remote_ref));
        }
        index
    }

    fn plan_empty_local(
        &self,
        remote_by_id: &BTreeMap<&'a str, Vec<&'a RemoteDoc>>,
    ) -> (PassKind, Vec<SyncAction>) {
        if remote_by_id.is_empty() {
            return (PassKind::Empty, Vec::new());
        }

        if self.erasure_pending {
            let actions = remote_by_id
                .values()
                .flatten()
                .map(|doc| SyncAction::DeleteRemote {
                    unique_id: doc.unique_id.clone(),
                    remote_ref: doc.remote_ref.clone(),
                })
                .collect();
            return (PassKind::Erasure, actions);
        }

        // One local copy per unique id; duplicates are left for a later
        // incremental pass since hydration never deletes remotely.
        let actions = remote_by_id
            .values()
            .filter_map(|docs| docs.first())
            .map(|doc| SyncAction::Hydrate { doc: (*doc).clone() })
            .collect();
        (PassKind::FirstHydration, actions)
    }

    fn plan_incremental(
        &self,
        remote_by_id: &BTreeMap<&'a str, Vec<&'a RemoteDoc>>,
    ) -> Vec<SyncAction> {
        let mut actions = Vec::new();

        for tx in self.local {
            let copies = remote_by_id
                .get(tx.unique_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();

            let keep = copies
                .iter()
                .find(|doc| Some(&doc.remote_ref) == tx.remote_ref.as_ref())
                .or_else(|| copies.first())
                .copied();

            for extra in copies
                .iter()
                .filter(|doc| !keep.is_some_and(|k| std::ptr::eq(k, **doc)))
            {
                actions.push(SyncAction::DropDuplicate {
                    unique_id: extra.unique_id.clone(),
                    remote_ref: extra.remote_ref.clone(),
                });
            }

            match keep {
                None => actions.push(SyncAction::PushAdd {
                    transaction: tx.clone(),
                }),
                Some(doc) if !tx.synced => actions.push(SyncAction::PushUpdate {
                    transaction: tx.clone(),
                    remote_ref: doc.remote_ref.clone(),
                }),
                Some(doc) if !tx.matches_remote(doc) => {
                    actions.push(SyncAction::Refresh { doc: doc.clone() })
                }
                Some(_) => {}
            }
        }

        let local_ids: HashSet<&str> = self.local.iter().map(|t| t.unique_id.as_str()).collect();
        for (unique_id, docs) in remote_by_id {
            if local_ids.contains(unique_id) {
                continue;
            }
            for doc in docs {
                actions.push(SyncAction::DeleteRemote {
                    unique_id: doc.unique_id.clone(),
                    remote_ref: doc.remote_ref.clone(),
                });
            }
        }

        actions
    }
}

/// Plan a pass without an erasure signal.
pub fn plan(local: &[Transaction], remote: &[RemoteDoc]) -> Result<ReconcilePlan> {
    Reconciler::new(local, remote).plan()
}
