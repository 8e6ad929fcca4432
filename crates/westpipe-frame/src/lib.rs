//! Text framing and message classification for westpipe.
//!
//! Every frame on the inbound leg is:
//! - a 4-byte little-endian length, counted in UTF-16 code units
//! - that many UTF-16LE code units of text
//!
//! Frame text is then classified by [`parse`] into a `header|payload`
//! [`Message`], a [`LogRecord`], or nothing. The outbound leg carries plain
//! newline-terminated lines written by [`LineWriter`].

pub mod codec;
pub mod error;
pub mod message;
pub mod protocol;
pub mod writer;

#[cfg(feature = "async")]
pub mod line;
#[cfg(feature = "async")]
pub mod reader;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_FRAME_UNITS, PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use message::{parse, LogLevel, LogRecord, Message, Parsed};
pub use protocol::{
    config_fragments, format_log, format_message, CONFIG_HEADER, CONFIG_TERMINATOR, DATA_HEADER,
    DEFAULT_FRAGMENT_UNITS, DELIMITER, HEARTBEAT_LINE, LOG_HEADER,
};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use line::LineWriter;
#[cfg(feature = "async")]
pub use reader::FrameReader;
