//! Local stream transport for westpipe.
//!
//! The host side ([`PipeServer`], `async` feature) binds one or two Unix
//! domain sockets and hands out an inbound leg (frames from the peer) and an
//! outbound leg (heartbeat lines to the peer). The peer side uses the
//! blocking [`IpcStream`] returned by [`UnixDomainSocket::connect`].
//!
//! Windows named pipes are not implemented; the socket and stream types are
//! Unix only.

pub mod error;

#[cfg(all(unix, feature = "async"))]
pub mod pipe;
#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
#[cfg(unix)]
pub use stream::IpcStream;

#[cfg(all(unix, feature = "async"))]
pub use pipe::{
    InboundLeg, OutboundLeg, PipeConfig, PipeConnection, PipeServer, DEFAULT_PIPE_NAME,
};
#[cfg(all(unix, feature = "async"))]
pub use uds::AsyncUnixListener;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
