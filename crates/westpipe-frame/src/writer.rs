use std::io::{ErrorKind, Write};

use bytes::BytesMut;
#[cfg(unix)]
use westpipe_transport::{IpcStream, TransportError};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::protocol::format_message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// This is the peer side of the protocol: the process producing telemetry
/// writes frames, the host reads them.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.text())
    }

    /// Send `header|payload` as one frame.
    pub fn send_message(&mut self, header: &str, payload: &str) -> Result<()> {
        let text = format_message(header, payload)?;
        self.send(&text)
    }

    /// Encode `text` and write it out, blocking until every byte is written.
    pub fn send(&mut self, text: &str) -> Result<()> {
        let max = self.config.max_frame_units;
        let units = text.encode_utf16().count();
        if units > max {
            return Err(FrameError::PayloadTooLarge { size: units, max });
        }

        self.buf.clear();
        encode_frame(text, &mut self.buf)?;
        write_fully(&mut self.inner, &self.buf)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        retry(|| self.inner.flush())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(unix)]
impl FrameWriter<IpcStream> {
    /// Writer on a connected peer stream, with the configured write timeout applied.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(|err| match err {
                TransportError::Io(io) => FrameError::Io(io),
                other => FrameError::Io(std::io::Error::other(other.to_string())),
            })?;
        Ok(Self::with_config(inner, config))
    }
}

/// Write all of `bytes`. A zero-length write means the host hung up.
fn write_fully<W: Write>(out: &mut W, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        let written = retry(|| out.write(bytes))?;
        if written == 0 {
            return Err(FrameError::EndOfStream);
        }
        bytes = &bytes[written..];
    }
    Ok(())
}

/// Repeat `op` while it is interrupted. A write timeout surfaces as
/// `WouldBlock` and is returned, not retried.
fn retry<T>(mut op: impl FnMut() -> std::io::Result<T>) -> Result<T> {
    loop {
        match op() {
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            other => return other.map_err(FrameError::Io),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_FRAME_UNITS};

    fn decode_all(bytes: Vec<u8>) -> Vec<String> {
        let mut wire = BytesMut::from(bytes.as_slice());
        let mut out = Vec::new();
        while let Some(frame) = decode_frame(&mut wire, DEFAULT_MAX_FRAME_UNITS).unwrap() {
            out.push(frame.into_text());
        }
        assert!(wire.is_empty());
        out
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send("hello").unwrap();

        let frames = decode_all(writer.into_inner().into_inner());
        assert_eq!(frames, vec!["hello"]);
    }

    #[test]
    fn write_message_and_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_message("GUI_DATA_8378", "{}").unwrap();
        writer
            .write_frame(&Frame::new("raw output").unwrap())
            .unwrap();

        let frames = decode_all(writer.into_inner().into_inner());
        assert_eq!(frames, vec!["GUI_DATA_8378|{}", "raw output"]);
    }

    #[test]
    fn rejects_oversized_frame_before_writing() {
        let cfg = FrameConfig {
            max_frame_units: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.send("too long").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 8, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn rejects_delimiter_in_message_payload() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send_message("GUI_DATA_8378", "a|b").unwrap_err();
        assert!(matches!(err, FrameError::DelimiterInPayload { .. }));
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn zero_length_write_reports_end_of_stream() {
        let mut writer = FrameWriter::new(ZeroWriter);
        assert!(matches!(
            writer.send("x").unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    struct InterruptedOnce {
        interrupted: bool,
        bytes: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn interrupted_write_retries() {
        let mut writer = FrameWriter::new(InterruptedOnce {
            interrupted: false,
            bytes: Vec::new(),
        });
        writer.send("ok").unwrap();
        assert_eq!(decode_all(writer.into_inner().bytes), vec!["ok"]);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        use std::io::Read;

        let (left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        writer.send("ping").unwrap();
        drop(writer);

        let mut bytes = Vec::new();
        right.read_to_end(&mut bytes).unwrap();
        assert_eq!(decode_all(bytes), vec!["ping"]);
    }
}
