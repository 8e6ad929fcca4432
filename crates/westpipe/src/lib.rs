//! Host side of the westpipe telemetry protocol.
//!
//! A peer process writes UTF-16 length-prefixed `HEADER|payload` frames to a
//! local pipe. The host reassembles the peer's module configuration, creates
//! the modules it names, and feeds them every data tick, while writing a
//! heartbeat line back to the peer.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain sockets, one or two legs
//! - [`frame`]: frame codec, protocol strings and message parsing
//! - [`engine`]: config reassembly, module registry, dispatch and lifecycle
//!   (behind the default `engine` feature)

/// Re-export transport types.
pub mod transport {
    pub use westpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use westpipe_frame::*;
}

/// Re-export engine types (requires `engine` feature).
#[cfg(feature = "engine")]
pub mod engine {
    pub use westpipe_engine::*;
}
