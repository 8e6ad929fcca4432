//! Host-side pipe server with one or two legs.
//!
//! The inbound leg carries frames from the peer to the host; the outbound leg
//! carries heartbeat lines from the host to the peer. A single socket may back
//! both legs, or each leg gets its own socket.

use std::path::PathBuf;

use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::uds::{AsyncUnixListener, UnixDomainSocket};

/// Read side handed to the dispatch loop.
pub type InboundLeg = OwnedReadHalf;
/// Write side handed to the heartbeat writer.
pub type OutboundLeg = OwnedWriteHalf;

/// Pipe name peers connect to by default.
pub const DEFAULT_PIPE_NAME: &str = "west-pros-pipe";

/// Where the host listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    /// Socket the peer writes frames to.
    pub inbound_path: PathBuf,
    /// Separate socket for heartbeats. `None` serves both legs from `inbound_path`.
    pub outbound_path: Option<PathBuf>,
    /// Permission mode for created socket files.
    pub socket_mode: u32,
}

impl PipeConfig {
    /// Single-pipe configuration on `path`.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            inbound_path: path.into(),
            outbound_path: None,
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
        }
    }

    /// Two-pipe configuration.
    pub fn dual(inbound: impl Into<PathBuf>, outbound: impl Into<PathBuf>) -> Self {
        Self {
            inbound_path: inbound.into(),
            outbound_path: Some(outbound.into()),
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
        }
    }

    /// Whether the legs are backed by separate sockets.
    pub fn is_dual(&self) -> bool {
        self.outbound_path.is_some()
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self::single(std::env::temp_dir().join(format!("{DEFAULT_PIPE_NAME}.sock")))
    }
}

/// Bound sockets waiting for the peer.
pub struct PipeServer {
    inbound: AsyncUnixListener,
    outbound: Option<AsyncUnixListener>,
}

impl PipeServer {
    /// Bind every socket named by `config`. Must be called inside a tokio runtime.
    pub fn bind(config: &PipeConfig) -> Result<Self> {
        if config.outbound_path.as_ref() == Some(&config.inbound_path) {
            return Err(TransportError::SameLegPath(config.inbound_path.clone()));
        }

        let inbound = UnixDomainSocket::bind_with_mode(&config.inbound_path, config.socket_mode)?
            .into_async()?;
        let outbound = match &config.outbound_path {
            Some(path) => {
                Some(UnixDomainSocket::bind_with_mode(path, config.socket_mode)?.into_async()?)
            }
            None => None,
        };

        Ok(Self { inbound, outbound })
    }

    /// Wait until the peer has connected every leg.
    ///
    /// With two sockets the inbound leg is accepted first, then the outbound leg.
    pub async fn accept(&self) -> Result<PipeConnection> {
        match &self.outbound {
            None => {
                let stream = self.inbound.accept("shared").await?;
                let (inbound, outbound) = stream.into_split();
                info!(path = ?self.inbound.path(), "peer connected (single pipe)");
                Ok(PipeConnection {
                    inbound,
                    outbound,
                    dual: false,
                })
            }
            Some(outbound_listener) => {
                let inbound_stream = self.inbound.accept("inbound").await?;
                let outbound_stream = outbound_listener.accept("outbound").await?;
                // Each stream only needs one direction; the unused halves are dropped.
                let (inbound, _) = inbound_stream.into_split();
                let (_, outbound) = outbound_stream.into_split();
                info!(
                    inbound = ?self.inbound.path(),
                    outbound = ?outbound_listener.path(),
                    "peer connected (dual pipe)"
                );
                Ok(PipeConnection {
                    inbound,
                    outbound,
                    dual: true,
                })
            }
        }
    }
}

/// Both legs of an established connection.
#[derive(Debug)]
pub struct PipeConnection {
    inbound: InboundLeg,
    outbound: OutboundLeg,
    dual: bool,
}

impl PipeConnection {
    /// Whether the legs come from separate sockets.
    pub fn is_dual(&self) -> bool {
        self.dual
    }

    /// Split into independently owned (and independently closable) legs.
    pub fn into_legs(self) -> (InboundLeg, OutboundLeg) {
        (self.inbound, self.outbound)
    }
}
