use std::io::ErrorKind;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete frames from an async byte stream.
///
/// Handles partial reads internally. A frame split across any number of
/// reads, or several frames arriving in one read, both come out whole.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: AsyncRead + Unpin> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns `Err(FrameError::EndOfStream)` when the stream closes, whether
    /// cleanly between frames or in the middle of one. The future is
    /// cancel-safe: bytes already buffered stay buffered.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_frame_units)? {
                return Ok(frame);
            }

            let read = match self.inner.read_buf(&mut self.buf).await {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    tracing::debug!(
                        buffered = self.buf.len(),
                        "stream closed inside a frame"
                    );
                }
                return Err(FrameError::EndOfStream);
            }
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::codec::encode_frame;

    fn wire(texts: &[&str]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for text in texts {
            encode_frame(text, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[tokio::test]
    async fn read_multiple_frames() {
        let bytes = wire(&["one", "two", "three"]);
        let mut reader = FrameReader::new(bytes.as_slice());

        assert_eq!(reader.read_frame().await.unwrap().text(), "one");
        assert_eq!(reader.read_frame().await.unwrap().text(), "two");
        assert_eq!(reader.read_frame().await.unwrap().text(), "three");
        assert!(matches!(
            reader.read_frame().await.unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    #[tokio::test]
    async fn frame_split_across_writes() {
        let bytes = wire(&["GUI_DATA_8378|{\"c\":{\"v\":1}}"]);
        let (client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        let writer = tokio::spawn(async move {
            let mut client = client;
            for byte in bytes {
                client.write_all(&[byte]).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.text(), "GUI_DATA_8378|{\"c\":{\"v\":1}}");
        drop(writer.await.unwrap());
        assert!(matches!(
            reader.read_frame().await.unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    #[tokio::test]
    async fn close_mid_frame_is_end_of_stream() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_slice(&[b'a', 0, b'b']);

        let bytes = partial.to_vec();
        let mut reader = FrameReader::new(bytes.as_slice());
        assert!(matches!(
            reader.read_frame().await.unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    #[tokio::test]
    async fn oversized_prefix_is_fatal() {
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(1024);
        let bytes = bytes.to_vec();

        let cfg = FrameConfig {
            max_frame_units: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(bytes.as_slice(), cfg);
        assert!(matches!(
            reader.read_frame().await.unwrap_err(),
            FrameError::PayloadTooLarge { size: 1024, max: 16 }
        ));
    }

    #[tokio::test]
    async fn empty_frame_is_delivered() {
        let bytes = wire(&["", "after"]);
        let mut reader = FrameReader::new(bytes.as_slice());
        assert_eq!(reader.read_frame().await.unwrap().text(), "");
        assert_eq!(reader.read_frame().await.unwrap().text(), "after");
    }

    #[tokio::test]
    async fn pending_read_can_be_cancelled() {
        let (_client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(20), reader.read_frame()).await;
        assert!(result.is_err(), "read should still be pending");
        assert_eq!(reader.buffered(), 0);
    }
}
