/// Errors that end or prevent an engine run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] westpipe_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] westpipe_frame::FrameError),

    /// Cancellation was requested before the peer connected.
    #[error("engine cancelled before the peer connected")]
    Cancelled,

    /// One of the engine tasks panicked or was aborted.
    #[error("engine task failed: {0}")]
    TaskFailed(String),
}

/// A configuration or data document that is not `{ id: { key: value } }`.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The text is not valid JSON.
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level value is not an object.
    #[error("document must be an object of module entries, found {found}")]
    NotAnObject { found: &'static str },
}

/// A required module configuration key is missing or has the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigKeyError {
    #[error("missing config key `{key}`")]
    Missing { key: String },

    #[error("config key `{key}` must be {expected}")]
    Invalid { key: String, expected: &'static str },
}

impl ConfigKeyError {
    /// Name of the offending key.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::Invalid { key, .. } => key,
        }
    }
}

/// Per-module failures. Never fatal to the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    ConfigKey(#[from] ConfigKeyError),

    #[error("module entry is not an object")]
    NotAnObject,

    #[error("module entry has no `module-type`")]
    MissingType,

    #[error("unknown module type `{0}`")]
    UnknownType(String),

    #[error("unknown series `{0}`")]
    UnknownSeries(String),

    #[error("variable `{0}` is not a number")]
    NotANumber(String),

    #[error("missing variable `{0}`")]
    MissingVariable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
