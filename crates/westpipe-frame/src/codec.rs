use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: one little-endian u32 counting UTF-16 code units.
pub const PREFIX_SIZE: usize = 4;

/// Bytes per UTF-16 code unit on the wire.
pub const UNIT_SIZE: usize = 2;

/// Default maximum frame length: 8 Mi code units (16 MiB on the wire).
pub const DEFAULT_MAX_FRAME_UNITS: usize = 8 * 1024 * 1024;

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    length: u32,
    text: String,
}

impl Frame {
    /// Build a frame from text; the length is its UTF-16 code unit count.
    ///
    /// Fails with `PayloadTooLarge` when the count does not fit the prefix.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let length = prefix_length(text.encode_utf16().count())?;
        Ok(Self { length, text })
    }

    /// Declared length in UTF-16 code units.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The frame text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the frame and return its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// The total wire size of this frame (prefix + code units).
    pub fn wire_size(&self) -> usize {
        PREFIX_SIZE + self.length as usize * UNIT_SIZE
    }
}

/// Encode text into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────────────┐
/// │ Length (4B)  │ Text                             │
/// │ u32 LE       │ Length UTF-16LE code units       │
/// └──────────────┴──────────────────────────────────┘
/// ```
pub fn encode_frame(text: &str, dst: &mut BytesMut) -> Result<()> {
    let units = text.encode_utf16().count();
    let length = prefix_length(units)?;
    dst.reserve(PREFIX_SIZE + units * UNIT_SIZE);
    dst.put_u32_le(length);
    for unit in text.encode_utf16() {
        dst.put_u16_le(unit);
    }
    Ok(())
}

fn prefix_length(units: usize) -> Result<u32> {
    u32::try_from(units).map_err(|_| FrameError::PayloadTooLarge {
        size: units,
        max: u32::MAX as usize,
    })
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Unpaired surrogates
/// decode to U+FFFD.
pub fn decode_frame(src: &mut BytesMut, max_units: usize) -> Result<Option<Frame>> {
    if src.len() < PREFIX_SIZE {
        return Ok(None); // Need more data
    }

    let mut prefix = [0u8; PREFIX_SIZE];
    prefix.copy_from_slice(&src[..PREFIX_SIZE]);
    let length = u32::from_le_bytes(prefix);
    let units = length as usize;

    if units > max_units {
        return Err(FrameError::PayloadTooLarge {
            size: units,
            max: max_units,
        });
    }

    let body = units * UNIT_SIZE;
    if src.len() < PREFIX_SIZE + body {
        return Ok(None); // Need more data
    }

    src.advance(PREFIX_SIZE);
    let raw = src.split_to(body);
    let code_units: Vec<u16> = raw
        .chunks_exact(UNIT_SIZE)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(Some(Frame {
        length,
        text: String::from_utf16_lossy(&code_units),
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame length in UTF-16 code units. Default: 8 Mi.
    pub max_frame_units: usize,
    /// Write timeout for blocking peer-side writers.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_units: DEFAULT_MAX_FRAME_UNITS,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let text = "GUI_DATA_8378|{\"chart1\":{\"x\":5}}";

        encode_frame(text, &mut buf).unwrap();
        assert_eq!(buf.len(), PREFIX_SIZE + text.len() * UNIT_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();

        assert_eq!(frame.text(), text);
        assert_eq!(frame.length() as usize, text.len());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_length_counts_code_units_not_bytes() {
        // 'é' is one unit, '𝄞' is a surrogate pair.
        let text = "é𝄞";
        let mut buf = BytesMut::new();
        encode_frame(text, &mut buf).unwrap();

        assert_eq!(&buf[..PREFIX_SIZE], &3u32.to_le_bytes());
        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();
        assert_eq!(frame.text(), text);
        assert_eq!(frame.wire_size(), PREFIX_SIZE + 3 * UNIT_SIZE);
    }

    #[test]
    fn test_wire_bytes_are_little_endian_utf16() {
        let mut buf = BytesMut::new();
        encode_frame("Hi", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[2, 0, 0, 0, b'H', 0, b'i', 0]);
    }

    #[test]
    fn test_frame_new_counts_units() {
        let frame = Frame::new("é𝄞").unwrap();
        assert_eq!(frame.length(), 3);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_beyond_prefix_is_rejected() {
        assert_eq!(prefix_length(u32::MAX as usize).unwrap(), u32::MAX);
        let too_long = u32::MAX as usize + 1;
        assert!(matches!(
            prefix_length(too_long),
            Err(FrameError::PayloadTooLarge { size, max })
                if size == too_long && max == u32::MAX as usize
        ));
    }

    #[test]
    fn test_decode_incomplete_prefix() {
        let mut buf = BytesMut::from(&[0x02, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3, "partial prefix must stay buffered");
    }

    #[test]
    fn test_decode_incomplete_body() {
        let mut buf = BytesMut::new();
        encode_frame("hello", &mut buf).unwrap();
        buf.truncate(PREFIX_SIZE + 3); // odd byte count mid code unit

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(64);

        let result = decode_frame(&mut buf, 16);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn test_unpaired_surrogate_decodes_lossily() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_u16_le(0xD800);
        buf.put_u16_le(u16::from(b'a'));

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();
        assert_eq!(frame.text(), "\u{FFFD}a");
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame("first", &mut buf).unwrap();
        encode_frame("second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();
        assert_eq!(f1.text(), "first");

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();
        assert_eq!(f2.text(), "second");

        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let mut buf = BytesMut::new();
        encode_frame("", &mut buf).unwrap();

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_UNITS)
            .unwrap()
            .unwrap();
        assert_eq!(frame.length(), 0);
        assert!(frame.text().is_empty());
    }
}
