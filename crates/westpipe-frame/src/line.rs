//! Newline-terminated UTF-8 lines on the outbound leg.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{FrameError, Result};

/// Writes one line per call and flushes it immediately.
pub struct LineWriter<T> {
    inner: T,
    written: u64,
}

impl<T: AsyncWrite + Unpin> LineWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, written: 0 }
    }

    /// Write `line` followed by `\n`.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if line.contains(['\n', '\r']) {
            return Err(FrameError::EmbeddedNewline);
        }

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Lines successfully written so far.
    pub fn lines_written(&self) -> u64 {
        self.written
    }

    /// Shut the write side down so the peer sees end of stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(FrameError::Io)
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}
