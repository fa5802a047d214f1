//! # Lumen Client
//!
//! The on-device runtime of Lumen. It keeps the authoritative transaction
//! set in a local SQLite store, mirrors it to the user's remote collection
//! when signed in and online, and reconciles the two sides using the
//! planner from [`lumen_engine`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumen_client::{connectivity, ClientConfig, NetworkEvent};
//! use lumen_engine::{Category, Transaction, TransactionFields, TransactionKind};
//!
//! # async fn run() -> lumen_client::Result<()> {
//! let (network, connectivity) = connectivity::channel();
//! let app = lumen_client::open(ClientConfig::from_env()?, connectivity, None).await?;
//!
//! network.notify(NetworkEvent::Available);
//! app.session.sign_in("user-1", None).await?;
//!
//! let fields = TransactionFields::new(
//!     "Groceries",
//!     "42.50".parse().unwrap(),
//!     chrono::Utc::now(),
//!     TransactionKind::Expense,
//!     Category::Food,
//! );
//! app.coordinator.add(Transaction::new(fields)).await?;
//!
//! let transactions = app.coordinator.list().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod remote;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;

pub use auth::AuthState;
pub use config::{ClientConfig, ConfigError};
pub use connectivity::{Connectivity, ConnectivityHandle, NetworkEvent};
pub use coordinator::{Coordinator, CoordinatorOptions, MutationOutcome};
pub use error::{Error, RecordFailure, Result, DEFAULT_ERROR_MESSAGE};
pub use remote::{HttpMirror, ProfileMirror, RemoteError, RemoteMirror};
pub use session::{AccountCommand, AccountSession, ProfileSync, SessionSnapshot};
pub use state::RequestState;
pub use store::{AccountStore, MemoryStore, SqliteStore, StoreError, TransactionStore};
pub use sync::{PassReport, SyncExecutor};

use lumen_engine::UserId;
use std::sync::Arc;
use tracing::info;

/// A wired-up client: account session plus transaction coordinator.
pub struct App {
    pub session: Arc<AccountSession>,
    pub coordinator: Arc<Coordinator>,
}

impl App {
    /// Erase all of the user's transactions, then reset the profile.
    pub async fn erase_account(&self) -> Result<lumen_engine::AccountConfig> {
        self.session.erase_account(&self.coordinator).await
    }
}

/// Open the local store described by `config`, connect the remote mirror if
/// one is configured, and start the account session with profile sync
/// against that mirror.
pub async fn open(
    config: ClientConfig,
    connectivity: Connectivity,
    current_user: Option<UserId>,
) -> Result<App> {
    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let (remote, profile_sync) = match &config.mirror_url {
        Some(url) => {
            let mut mirror = HttpMirror::new(url)?;
            if let Some(key) = &config.mirror_key {
                mirror = mirror.with_mirror_key(key.clone());
            }
            info!(mirror_url = %url, "Remote mirror configured");
            let mirror = Arc::new(mirror);
            let profiles = ProfileSync::new(mirror.clone(), connectivity.clone(), config.remote_timeout);
            (Some(mirror as Arc<dyn RemoteMirror>), Some(profiles))
        }
        None => {
            info!("No remote mirror configured; running local-only");
            (None, None)
        }
    };

    let session = Arc::new(
        AccountSession::start_with(store.clone(), &config.locale, current_user, profile_sync).await?,
    );
    let coordinator = Arc::new(Coordinator::new(
        store,
        remote,
        session.clone(),
        connectivity,
        config.into(),
    ));

    Ok(App {
        session,
        coordinator,
    })
}
