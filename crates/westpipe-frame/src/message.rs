//! Classification of frame text into messages and log records.

use std::fmt;

use crate::protocol::{DELIMITER, LOG_HEADER};

/// A frame split into header and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: String,
    pub payload: String,
}

/// Severity of a log record sent by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Stdout,
    Debug,
    Info,
    Warning,
    Error,
    Severe,
}

impl LogLevel {
    /// Map a level name from a log frame. Unknown names map to `Info`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "STDOUT" => Self::Stdout,
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARNING" | "WARN" => Self::Warning,
            "ERROR" => Self::Error,
            "SEVERE" => Self::Severe,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "STDOUT",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log line forwarded by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub text: String,
}

impl LogRecord {
    /// Wrap unstructured peer output.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Stdout,
            text: text.into(),
        }
    }
}

/// What a frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Message(Message),
    Log(LogRecord),
}

/// Classify frame text. Never panics; `None` means the frame is dropped.
///
/// The two-segment check runs first. Log frames carry the delimiter at least
/// twice, so they fall through it and are matched by their header; the log
/// text keeps any further delimiters.
pub fn parse(raw: &str) -> Option<Parsed> {
    let mut segments = raw.split(DELIMITER);
    let first = segments.next().unwrap_or_default();
    let second = segments.next();
    let third = segments.next();

    if let (Some(payload), None) = (second, third) {
        if first.is_empty() || payload.is_empty() {
            return None;
        }
        return Some(Parsed::Message(Message {
            header: first.to_string(),
            payload: payload.to_string(),
        }));
    }

    if first == LOG_HEADER {
        let mut parts = raw.splitn(3, DELIMITER).skip(1);
        if let (Some(level), Some(text)) = (parts.next(), parts.next()) {
            return Some(Parsed::Log(LogRecord {
                level: LogLevel::from_name(level),
                text: text.to_string(),
            }));
        }
    }

    None
}
