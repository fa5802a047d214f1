//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use lumen_client::{
    connectivity, AuthState, ConnectivityHandle, Coordinator, CoordinatorOptions, NetworkEvent,
    ProfileMirror, RemoteError, RemoteMirror, SqliteStore,
};
use lumen_engine::{
    Category, DocumentBody, RemoteDoc, RemoteRef, Transaction, TransactionFields,
    TransactionKind, UniqueId, UserId, UserProfile,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const USER: &str = "user-1";

/// Build a transaction dated `day` of May 2024.
pub fn tx(unique_id: &str, title: &str, amount: &str, day: u32) -> Transaction {
    Transaction::with_unique_id(unique_id, fields(title, amount, day))
}

pub fn fields(title: &str, amount: &str, day: u32) -> TransactionFields {
    TransactionFields::new(
        title,
        amount.parse().unwrap(),
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
        TransactionKind::Expense,
        Category::Food,
    )
}

pub fn synced(mut tx: Transaction, remote_ref: &str) -> Transaction {
    tx.mark_synced(Some(remote_ref.to_string()));
    tx
}

// ============================================================================
// In-process remote mirror
// ============================================================================

/// Remote mirror double with failure injection and artificial latency.
#[derive(Default)]
pub struct MemoryMirror {
    docs: Mutex<BTreeMap<RemoteRef, RemoteDoc>>,
    profiles: Mutex<BTreeMap<UserId, UserProfile>>,
    profile_writes: AtomicUsize,
    next_ref: AtomicUsize,
    failing: Mutex<HashSet<UniqueId>>,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    writes: AtomicUsize,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryMirror {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Put a document straight into the collection.
    pub fn seed(&self, user_id: &str, tx: &Transaction) -> RemoteRef {
        let remote_ref = self.allocate_ref();
        self.docs.lock().unwrap().insert(
            remote_ref.clone(),
            RemoteDoc {
                remote_ref: remote_ref.clone(),
                user_id: user_id.to_string(),
                unique_id: tx.unique_id.clone(),
                fields: tx.fields.clone(),
            },
        );
        remote_ref
    }

    /// Documents owned by `user_id`, ordered by unique id.
    pub fn docs_for(&self, user_id: &str) -> Vec<RemoteDoc> {
        let mut docs: Vec<RemoteDoc> = self
            .docs
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| {
            a.unique_id
                .cmp(&b.unique_id)
                .then_with(|| a.remote_ref.cmp(&b.remote_ref))
        });
        docs
    }

    pub fn seed_profile(&self, user_id: &str, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(user_id.to_string(), profile);
    }

    pub fn profile_of(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    /// Profile creations, overwrites and deletions so far.
    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn unique_ids(&self, user_id: &str) -> Vec<UniqueId> {
        self.docs_for(user_id)
            .into_iter()
            .map(|d| d.unique_id)
            .collect()
    }

    /// Reject every write touching `unique_id`.
    pub fn fail_for(&self, unique_id: &str) {
        self.failing.lock().unwrap().insert(unique_id.to_string());
    }

    /// Fail every call as if the network dropped.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.set_offline(false);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Remote writes accepted or attempted so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn allocate_ref(&self) -> RemoteRef {
        let n = self.next_ref.fetch_add(1, Ordering::SeqCst) + 1;
        format!("doc-{n:06}")
    }

    async fn enter(&self) -> Result<(), RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn check_write(&self, unique_id: &str) -> Result<(), RemoteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(unique_id) {
            return Err(RemoteError::Rejected {
                status: 500,
                message: format!("write rejected for {unique_id}"),
            });
        }
        Ok(())
    }

    fn not_found() -> RemoteError {
        RemoteError::Rejected {
            status: 404,
            message: "document not found".into(),
        }
    }
}

#[async_trait]
impl RemoteMirror for MemoryMirror {
    async fn query_by_user(&self, user_id: &str) -> Result<Vec<RemoteDoc>, RemoteError> {
        self.enter().await?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs_for(user_id))
    }

    async fn add(&self, user_id: &str, body: &DocumentBody) -> Result<RemoteRef, RemoteError> {
        self.enter().await?;
        self.check_write(&body.unique_id)?;
        let remote_ref = self.allocate_ref();
        self.docs.lock().unwrap().insert(
            remote_ref.clone(),
            RemoteDoc {
                remote_ref: remote_ref.clone(),
                user_id: user_id.to_string(),
                unique_id: body.unique_id.clone(),
                fields: body.fields.clone(),
            },
        );
        Ok(remote_ref)
    }

    async fn update(
        &self,
        user_id: &str,
        remote_ref: &str,
        body: &DocumentBody,
    ) -> Result<(), RemoteError> {
        self.enter().await?;
        self.check_write(&body.unique_id)?;
        let mut docs = self.docs.lock().unwrap();
        match docs.get_mut(remote_ref) {
            Some(doc) if doc.user_id == user_id => {
                doc.fields = body.fields.clone();
                Ok(())
            }
            _ => Err(Self::not_found()),
        }
    }

    async fn delete(&self, user_id: &str, remote_ref: &str) -> Result<(), RemoteError> {
        self.enter().await?;
        let unique_id = match self.docs.lock().unwrap().get(remote_ref) {
            Some(doc) if doc.user_id == user_id => doc.unique_id.clone(),
            _ => return Ok(()),
        };
        self.check_write(&unique_id)?;
        self.docs.lock().unwrap().remove(remote_ref);
        Ok(())
    }

    async fn find_by_unique_id(
        &self,
        user_id: &str,
        unique_id: &str,
    ) -> Result<Option<RemoteRef>, RemoteError> {
        self.enter().await?;
        Ok(self
            .docs_for(user_id)
            .into_iter()
            .find(|d| d.unique_id == unique_id)
            .map(|d| d.remote_ref))
    }
}

#[async_trait]
impl ProfileMirror for MemoryMirror {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        self.enter().await?;
        Ok(self.profile_of(user_id))
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<UserProfile, RemoteError> {
        self.enter().await?;
        let mut profiles = self.profiles.lock().unwrap();
        let stored = profiles.entry(user_id.to_string()).or_insert_with(|| {
            self.profile_writes.fetch_add(1, Ordering::SeqCst);
            profile.clone()
        });
        Ok(stored.clone())
    }

    async fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), RemoteError> {
        self.enter().await?;
        match self.profiles.lock().unwrap().get_mut(user_id) {
            Some(stored) => {
                self.profile_writes.fetch_add(1, Ordering::SeqCst);
                *stored = profile.clone();
                Ok(())
            }
            None => Err(Self::not_found()),
        }
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), RemoteError> {
        self.enter().await?;
        if self.profiles.lock().unwrap().remove(user_id).is_some() {
            self.profile_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ============================================================================
// Auth double
// ============================================================================

#[derive(Default)]
pub struct TestAuth {
    user: Mutex<Option<UserId>>,
}

impl TestAuth {
    pub fn signed_in(user_id: &str) -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(Some(user_id.to_string())),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign_in(&self, user_id: &str) {
        *self.user.lock().unwrap() = Some(user_id.to_string());
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
    }
}

impl AuthState for TestAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user.lock().unwrap().clone()
    }
}

// ============================================================================
// Coordinator harness
// ============================================================================

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub mirror: Arc<MemoryMirror>,
    pub auth: Arc<TestAuth>,
    pub network: ConnectivityHandle,
    pub coordinator: Coordinator,
}

impl Harness {
    /// Signed in as [`USER`] and online.
    pub async fn online() -> Self {
        Self::build(TestAuth::signed_in(USER), true, CoordinatorOptions::default()).await
    }

    /// Signed in as [`USER`] but without a network.
    pub async fn offline() -> Self {
        Self::build(TestAuth::signed_in(USER), false, CoordinatorOptions::default()).await
    }

    pub async fn build(auth: Arc<TestAuth>, online: bool, options: CoordinatorOptions) -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let mirror = MemoryMirror::new();
        let (network, signal) = connectivity::channel();
        if online {
            network.notify(NetworkEvent::Available);
        }

        let coordinator = Coordinator::new(
            store.clone(),
            Some(mirror.clone()),
            auth.clone(),
            signal,
            options,
        );

        Self {
            store,
            mirror,
            auth,
            network,
            coordinator,
        }
    }

    pub fn go_offline(&self) {
        self.network.notify(NetworkEvent::Lost);
    }

    pub fn go_online(&self) {
        self.network.notify(NetworkEvent::Available);
    }
}
