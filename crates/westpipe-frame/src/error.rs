/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared frame length exceeds the configured maximum.
    #[error("frame too large ({size} code units, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel closed before a complete frame was received, including
    /// a clean close right before a length prefix.
    #[error("end of stream")]
    EndOfStream,

    /// A header or payload contains the reserved delimiter.
    #[error("{what} must not contain the '|' delimiter")]
    DelimiterInPayload { what: &'static str },

    /// A line handed to the line writer already contains a line terminator.
    #[error("line must not contain a line terminator")]
    EmbeddedNewline,
}

pub type Result<T> = std::result::Result<T, FrameError>;
