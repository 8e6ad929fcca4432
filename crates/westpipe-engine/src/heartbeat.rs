use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use westpipe_frame::LineWriter;

/// Write `line` every `interval` until cancelled.
///
/// Returns the number of lines written. Cancellation, during a write or
/// during the delay, is the normal way out. A failed write ends the loop
/// with a warning; it does not stop the dispatch loop.
pub async fn run_heartbeat<W>(
    writer: &mut LineWriter<W>,
    line: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> u64
where
    W: AsyncWrite + Unpin,
{
    let mut beats = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            written = writer.write_line(line) => {
                if let Err(err) = written {
                    warn!(error = %err, beats, "heartbeat write failed; heartbeat stopped");
                    break;
                }
                beats += 1;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(beats, "heartbeat finished");
    beats
}
