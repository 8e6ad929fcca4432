use westpipe_frame::{LogLevel, LogRecord};

/// Receives log records forwarded by the peer.
pub trait LogSink: Send + Sync {
    fn log(&self, record: &LogRecord);
}

impl<F> LogSink for F
where
    F: Fn(&LogRecord) + Send + Sync,
{
    fn log(&self, record: &LogRecord) {
        self(record)
    }
}

/// Re-emits peer log records as tracing events under `westpipe::remote`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, record: &LogRecord) {
        let peer_level = record.level.as_str();
        let text = record.text.as_str();
        match record.level {
            LogLevel::Debug => tracing::debug!(target: "westpipe::remote", peer_level, "{text}"),
            LogLevel::Stdout | LogLevel::Info => {
                tracing::info!(target: "westpipe::remote", peer_level, "{text}")
            }
            LogLevel::Warning => tracing::warn!(target: "westpipe::remote", peer_level, "{text}"),
            LogLevel::Error | LogLevel::Severe => {
                tracing::error!(target: "westpipe::remote", peer_level, "{text}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |record: &LogRecord| captured.lock().unwrap().push(record.clone());

        sink.log(&LogRecord::stdout("hello"));
        TracingLogSink.log(&LogRecord {
            level: LogLevel::Severe,
            text: "boom".to_string(),
        });

        assert_eq!(seen.lock().unwrap().as_slice(), &[LogRecord::stdout("hello")]);
    }
}
