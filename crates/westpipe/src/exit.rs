use std::fmt;
use std::io;

use westpipe_engine::EngineError;
use westpipe_frame::FrameError;
use westpipe_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } | TransportError::SameLegPath(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::DelimiterInPayload { .. }
        | FrameError::EmbeddedNewline => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::EndOfStream => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn engine_error(context: &str, err: EngineError) -> CliError {
    match err {
        EngineError::Transport(err) => transport_error(context, err),
        EngineError::Frame(err) => frame_error(context, err),
        EngineError::Cancelled => CliError::new(SUCCESS, format!("{context}: {err}")),
        EngineError::TaskFailed(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
