//! Live network reachability signal.
//!
//! The platform layer owns the [`ConnectivityHandle`] and forwards its
//! reachability callbacks as [`NetworkEvent`]s. Consumers hold a
//! [`Connectivity`] and only ever see the latest value.

use tokio::sync::watch;
use tracing::debug;

/// Reachability notification from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    Available,
    Lost,
    Unavailable,
}

impl NetworkEvent {
    pub fn is_connected(self) -> bool {
        matches!(self, NetworkEvent::Available)
    }
}

/// Create a connected handle/observer pair. The signal starts out `false`
/// until the first event arrives.
pub fn channel() -> (ConnectivityHandle, Connectivity) {
    let (tx, rx) = watch::channel(false);
    (ConnectivityHandle { tx }, Connectivity { rx })
}

/// Producer side, fed by the platform.
#[derive(Debug)]
pub struct ConnectivityHandle {
    tx: watch::Sender<bool>,
}

impl ConnectivityHandle {
    pub fn notify(&self, event: NetworkEvent) {
        let connected = event.is_connected();
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
        if changed {
            debug!(?event, connected, "Connectivity changed");
        }
    }

    /// Another observer of the same signal.
    pub fn subscribe(&self) -> Connectivity {
        Connectivity {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the reachability signal.
#[derive(Debug, Clone)]
pub struct Connectivity {
    rx: watch::Receiver<bool>,
}

impl Connectivity {
    /// Signal pinned to `connected`, with no producer.
    pub fn fixed(connected: bool) -> Self {
        let (_tx, rx) = watch::channel(connected);
        Self { rx }
    }

    pub fn is_connected(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next change and return the new value. Returns `None`
    /// once the producer is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
