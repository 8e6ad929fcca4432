//! Reassembly of configuration documents split across frames.

use tracing::debug;
use westpipe_frame::CONFIG_TERMINATOR;

use crate::document::Document;
use crate::error::DocumentError;

/// Accumulates configuration payloads until the terminator tag arrives.
///
/// Line breaks are stripped from every fragment, so the result is the same no
/// matter where the peer split the document. The buffer is cleared whenever a
/// document is finalized, whether or not it parses.
#[derive(Debug)]
pub struct ConfigAssembler {
    buffer: String,
    fragments: usize,
    require_terminator: bool,
}

impl ConfigAssembler {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            fragments: 0,
            require_terminator: true,
        }
    }

    /// Accept unterminated single-frame documents from older peers.
    ///
    /// An unterminated payload is parsed as soon as the buffered text forms a
    /// complete document; a truncated one keeps accumulating.
    pub fn legacy() -> Self {
        Self {
            require_terminator: false,
            ..Self::new()
        }
    }

    pub fn requires_terminator(&self) -> bool {
        self.require_terminator
    }

    /// Feed one configuration payload.
    ///
    /// Returns `Ok(None)` while more fragments are expected.
    pub fn feed(&mut self, payload: &str) -> Result<Option<Document>, DocumentError> {
        self.fragments += 1;

        if let Some(body) = payload.trim_end().strip_suffix(CONFIG_TERMINATOR) {
            // Whatever character precedes the tag is its separator.
            let body = body
                .char_indices()
                .last()
                .map_or(body, |(at, _)| &body[..at]);
            push_stripped(&mut self.buffer, body);
            let text = self.take();
            return Document::parse(text.trim_end()).map(Some);
        }

        push_stripped(&mut self.buffer, payload);

        if self.require_terminator {
            debug!(
                fragments = self.fragments,
                buffered = self.buffer.len(),
                "configuration fragment buffered"
            );
            return Ok(None);
        }

        match Document::parse(self.buffer.trim_end()) {
            Ok(doc) => {
                self.take();
                Ok(Some(doc))
            }
            Err(DocumentError::Json(err)) if err.is_eof() => Ok(None),
            Err(err) => {
                self.take();
                Err(err)
            }
        }
    }

    /// Fragments fed since the last finalized document.
    pub fn pending_fragments(&self) -> usize {
        self.fragments
    }

    /// Buffered text length in bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial document.
    pub fn reset(&mut self) {
        self.take();
    }

    fn take(&mut self) -> String {
        self.fragments = 0;
        std::mem::take(&mut self.buffer)
    }
}

impl Default for ConfigAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn push_stripped(buffer: &mut String, fragment: &str) {
    buffer.extend(fragment.chars().filter(|c| !matches!(c, '\n' | '\r')));
}
