//! Connection phase, published through a watch channel.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

/// The engine's phase in its handshake-then-streaming lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Stopped,
    Loading,
    AwaitingConnection,
    AwaitingConfiguration,
    Operational,
    Stopping,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::AwaitingConnection => "awaiting-connection",
            Self::AwaitingConfiguration => "awaiting-configuration",
            Self::Operational => "operational",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single writer of the connection state.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Stopped);
        Self { tx }
    }

    /// Move to `next`. Publishing works whether or not anyone is watching.
    pub fn set(&self, next: ConnectionState) {
        let previous = self.tx.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state changed");
        }
    }

    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn watch(&self) -> StateWatcher {
        StateWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the connection state.
#[derive(Debug, Clone)]
pub struct StateWatcher {
    rx: watch::Receiver<ConnectionState>,
}

impl StateWatcher {
    /// The latest published state.
    pub fn current(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    /// Wait until the state equals `target`.
    ///
    /// Only the latest value is observed, so a state that is entered and left
    /// between two polls can be missed. Returns `false` if the engine went
    /// away first.
    pub async fn wait_for(&mut self, target: ConnectionState) -> bool {
        self.wait_until(|state| state == target).await.is_some()
    }

    /// Wait until `predicate` holds and return the matching state.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Option<ConnectionState>
    where
        F: FnMut(ConnectionState) -> bool,
    {
        self.rx
            .wait_for(|state| predicate(*state))
            .await
            .ok()
            .map(|state| *state)
    }
}
