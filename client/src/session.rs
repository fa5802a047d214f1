//! Account session service.
//!
//! Owns the singleton [`AccountConfig`] for the lifetime of the app. Readers
//! get immutable [`SessionSnapshot`]s from a watch channel; every change goes
//! through an [`AccountCommand`] handled by a single background task, which
//! persists the new profile before publishing it.
//!
//! With a [`ProfileSync`] the shared part of the profile ([`UserProfile`])
//! also follows the user to the remote mirror: signing in adopts the stored
//! remote profile (creating it on first sign-in), edits of shared fields are
//! pushed, and erasing the account deletes it. Only the erasure treats a
//! remote failure as an error.

use crate::auth::AuthState;
use crate::connectivity::Connectivity;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::remote::{with_timeout, ProfileMirror, RemoteError};
use crate::store::AccountStore;
use lumen_engine::{AccountConfig, AccountPatch, UserId, UserProfile};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 16;

/// Change requested of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCommand {
    /// Edit one profile field
    Patch(AccountPatch),
    SignIn {
        user_id: UserId,
        display_name: Option<String>,
    },
    SignOut,
    /// Reset the profile after all of the user's data was erased. Language
    /// and currency survive.
    Erase,
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub config: AccountConfig,
    pub user_id: Option<UserId>,
}

/// Remote side of the shared profile.
#[derive(Clone)]
pub struct ProfileSync {
    mirror: Arc<dyn ProfileMirror>,
    connectivity: Connectivity,
    timeout: Duration,
}

impl ProfileSync {
    pub fn new(mirror: Arc<dyn ProfileMirror>, connectivity: Connectivity, timeout: Duration) -> Self {
        Self {
            mirror,
            connectivity,
            timeout,
        }
    }

    async fn call<T, F>(&self, call: F) -> std::result::Result<T, RemoteError>
    where
        F: Future<Output = std::result::Result<T, RemoteError>>,
    {
        if !self.connectivity.is_connected() {
            return Err(RemoteError::Offline);
        }
        with_timeout(self.timeout, call).await
    }
}

impl std::fmt::Debug for ProfileSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSync")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct Envelope {
    command: AccountCommand,
    reply: oneshot::Sender<Result<AccountConfig>>,
}

/// Handle to the running session.
#[derive(Debug, Clone)]
pub struct AccountSession {
    commands: mpsc::Sender<Envelope>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl AccountSession {
    /// Load the stored profile, or create one from `locale` on first run,
    /// and start the command loop. `current_user` is the identity the auth
    /// provider reports right now; the cached logged-in flag follows it.
    pub async fn start(
        store: Arc<dyn AccountStore>,
        locale: &str,
        current_user: Option<UserId>,
    ) -> Result<Self> {
        Self::start_with(store, locale, current_user, None).await
    }

    /// Like [`AccountSession::start`], keeping the shared profile in step
    /// with `profile_sync` when one is given.
    pub async fn start_with(
        store: Arc<dyn AccountStore>,
        locale: &str,
        current_user: Option<UserId>,
        profile_sync: Option<ProfileSync>,
    ) -> Result<Self> {
        let stored = store.load_account().await?;
        let first_run = stored.is_none();
        let mut config = stored.unwrap_or_else(|| AccountConfig::from_locale(locale, None));

        let logged_in = current_user.is_some();
        if first_run || config.is_logged_in != logged_in {
            config.is_logged_in = logged_in;
            store.save_account(&config).await?;
        }
        if first_run {
            info!(
                language = config.language.as_str(),
                currency = config.currency.as_str(),
                "Created account profile from locale defaults"
            );
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            config,
            user_id: current_user,
        });
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        tokio::spawn(
            SessionActor {
                store,
                snapshot: snapshot_tx,
                profile_sync,
            }
            .run(command_rx),
        );

        Ok(Self {
            commands: command_tx,
            snapshot: snapshot_rx,
        })
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Live snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Apply a command and return the resulting profile.
    pub async fn send(&self, command: AccountCommand) -> Result<AccountConfig> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| Error::SessionClosed)?;
        response.await.map_err(|_| Error::SessionClosed)?
    }

    pub async fn update(&self, patch: AccountPatch) -> Result<AccountConfig> {
        self.send(AccountCommand::Patch(patch)).await
    }

    pub async fn sign_in(
        &self,
        user_id: impl Into<UserId>,
        display_name: Option<String>,
    ) -> Result<AccountConfig> {
        self.send(AccountCommand::SignIn {
            user_id: user_id.into(),
            display_name,
        })
        .await
    }

    pub async fn sign_out(&self) -> Result<AccountConfig> {
        self.send(AccountCommand::SignOut).await
    }

    /// Erase every transaction of the signed-in user, then reset the
    /// profile. The profile is left untouched if the erasure fails.
    pub async fn erase_account(&self, coordinator: &Coordinator) -> Result<AccountConfig> {
        coordinator.erase_all().await?;
        self.send(AccountCommand::Erase).await
    }
}

impl AuthState for AccountSession {
    fn current_user_id(&self) -> Option<UserId> {
        self.snapshot.borrow().user_id.clone()
    }
}

struct SessionActor {
    store: Arc<dyn AccountStore>,
    snapshot: watch::Sender<SessionSnapshot>,
    profile_sync: Option<ProfileSync>,
}

impl SessionActor {
    async fn run(self, mut commands: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { command, reply }) = commands.recv().await {
            let result = self.handle(command).await;
            // The caller may have stopped waiting; the change stands either way.
            let _ = reply.send(result);
        }
        debug!("Account session closed");
    }

    async fn handle(&self, command: AccountCommand) -> Result<AccountConfig> {
        let current = self.snapshot.borrow().clone();
        let mut next = current.clone();
        let mut push_profile = false;

        match command {
            AccountCommand::Patch(patch) => {
                push_profile = patch.touches_profile();
                next.config.apply(patch);
            }
            AccountCommand::SignIn {
                user_id,
                display_name,
            } => {
                info!(user_id = %user_id, "Signed in");
                next.config.is_logged_in = true;
                if display_name.is_some() {
                    next.config.display_name = display_name;
                }
                if let Some(stored) = self.ensure_remote(&user_id, next.config.profile()).await {
                    next.config.adopt_profile(stored);
                }
                next.user_id = Some(user_id);
            }
            AccountCommand::SignOut => {
                info!("Signed out");
                next.config.is_logged_in = false;
                next.user_id = None;
            }
            AccountCommand::Erase => {
                if let Some(user_id) = &current.user_id {
                    self.delete_remote(user_id).await?;
                }
                next.config = current.config.erased(None);
                next.user_id = None;
                if let Err(e) = self.store.delete_account().await {
                    error!(error = %e, "Failed to delete account profile");
                    return Err(e.into());
                }
                info!("Account profile reset");
            }
        }

        if let Err(e) = self.store.save_account(&next.config).await {
            error!(error = %e, "Failed to persist account profile");
            return Err(e.into());
        }

        let config = next.config.clone();
        let user_id = next.user_id.clone();
        self.snapshot.send_replace(next);

        if let (true, Some(user_id)) = (push_profile, user_id) {
            self.push_remote(&user_id, &config.profile()).await;
        }
        Ok(config)
    }

    /// The remote profile after making sure one exists, or `None` when it
    /// could not be reached.
    async fn ensure_remote(&self, user_id: &str, local: UserProfile) -> Option<UserProfile> {
        let sync = self.profile_sync.as_ref()?;
        match sync.call(sync.mirror.ensure_profile(user_id, &local)).await {
            Ok(stored) => {
                debug!(user_id = %user_id, "Adopted remote profile");
                Some(stored)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Could not reach remote profile; keeping local one");
                None
            }
        }
    }

    async fn push_remote(&self, user_id: &str, profile: &UserProfile) {
        let Some(sync) = &self.profile_sync else {
            return;
        };

        let pushed = match sync.call(sync.mirror.save_profile(user_id, profile)).await {
            Err(e) if e.is_not_found() => sync
                .call(sync.mirror.ensure_profile(user_id, profile))
                .await
                .map(|_| ()),
            other => other,
        };
        if let Err(e) = pushed {
            warn!(user_id = %user_id, error = %e, "Profile change stays local");
        }
    }

    async fn delete_remote(&self, user_id: &str) -> Result<()> {
        let Some(sync) = &self.profile_sync else {
            return Ok(());
        };

        match sync.call(sync.mirror.delete_profile(user_id)).await {
            Ok(()) => {
                info!(user_id = %user_id, "Deleted remote profile");
                Ok(())
            }
            Err(RemoteError::Offline) => {
                warn!(user_id = %user_id, "Offline; remote profile left in place");
                Ok(())
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to delete remote profile");
                Err(Error::Remote(e))
            }
        }
    }
}
