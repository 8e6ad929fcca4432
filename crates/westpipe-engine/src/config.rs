use std::time::Duration;

use westpipe_frame::{FrameConfig, HEARTBEAT_LINE};

/// Default delay between heartbeat lines.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1000);

/// Engine behavior knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between heartbeat lines. Default: 1 s.
    pub heartbeat_interval: Duration,
    /// Line written on every heartbeat, without the trailing newline.
    pub heartbeat_line: String,
    /// Frame size limits for the inbound leg.
    pub frame: FrameConfig,
    /// Forward frames that are neither messages nor log records to the log
    /// sink as STDOUT records instead of dropping them silently.
    pub forward_stray_output: bool,
    /// When false, a configuration payload without the terminator tag is
    /// parsed as soon as it forms a complete document.
    pub require_config_terminator: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_line: HEARTBEAT_LINE.to_string(),
            frame: FrameConfig::default(),
            forward_stray_output: false,
            require_config_terminator: true,
        }
    }
}
