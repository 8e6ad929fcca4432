//! Reserved protocol strings.
//!
//! Every frame the peer sends is `HEADER|payload`. Only frames whose header
//! is one of the constants below carry meaning for the host; anything else is
//! stray peer output.

use crate::error::{FrameError, Result};

/// Separates the header from the payload.
pub const DELIMITER: char = '|';

/// Header of per-tick data documents.
pub const DATA_HEADER: &str = "GUI_DATA_8378";

/// Header of configuration fragments.
pub const CONFIG_HEADER: &str = "GUI_DATA_CONF_8378";

/// Appended to the final configuration fragment, after one separator character.
pub const CONFIG_TERMINATOR: &str = "GUI_DATA_CONF_3434_END";

/// Header of log frames: `GUI_LOG_8378|LEVEL|text`.
pub const LOG_HEADER: &str = "GUI_LOG_8378";

/// Keep-alive line written on the outbound leg.
pub const HEARTBEAT_LINE: &str = "GUI_HEARTBEAT_8378";

/// Default fragment size used by peers when splitting configuration.
pub const DEFAULT_FRAGMENT_UNITS: usize = 512;

/// Join a header and payload into frame text.
///
/// Fails if either side contains the delimiter, since the host would then
/// see more than two segments and drop the frame.
pub fn format_message(header: &str, payload: &str) -> Result<String> {
    if header.contains(DELIMITER) {
        return Err(FrameError::DelimiterInPayload { what: "header" });
    }
    if payload.contains(DELIMITER) {
        return Err(FrameError::DelimiterInPayload { what: "payload" });
    }
    Ok(format!("{header}{DELIMITER}{payload}"))
}

/// Build a log frame text.
pub fn format_log(level: &str, text: &str) -> String {
    format!("{LOG_HEADER}{DELIMITER}{level}{DELIMITER}{text}")
}

/// Split a configuration document into configuration frame texts.
///
/// Each fragment carries at most `max_units` UTF-16 code units of the
/// document; the final one is followed by a space and [`CONFIG_TERMINATOR`].
/// An empty document still yields one (terminated) fragment.
pub fn config_fragments(document: &str, max_units: usize) -> Result<Vec<String>> {
    if document.contains(DELIMITER) {
        return Err(FrameError::DelimiterInPayload {
            what: "configuration document",
        });
    }
    let max_units = max_units.max(2);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_units = 0usize;
    for ch in document.chars() {
        let units = ch.len_utf16();
        if current_units + units > max_units {
            chunks.push(std::mem::take(&mut current));
            current_units = 0;
        }
        current.push(ch);
        current_units += units;
    }
    chunks.push(current);

    let last = chunks.len() - 1;
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            if index == last {
                format!("{CONFIG_HEADER}{DELIMITER}{chunk} {CONFIG_TERMINATOR}")
            } else {
                format!("{CONFIG_HEADER}{DELIMITER}{chunk}")
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_message_rejects_delimiter() {
        assert_eq!(
            format_message(DATA_HEADER, "{}").unwrap(),
            "GUI_DATA_8378|{}"
        );
        assert!(matches!(
            format_message(DATA_HEADER, "a|b"),
            Err(FrameError::DelimiterInPayload { what: "payload" })
        ));
    }

    #[test]
    fn fragments_respect_unit_budget_and_terminate_last() {
        let doc = r#"{"chart1":{"module-type":"linechart"}}"#;
        let fragments = config_fragments(doc, 10).unwrap();

        assert!(fragments.len() > 1);
        for fragment in &fragments[..fragments.len() - 1] {
            let body = fragment.strip_prefix("GUI_DATA_CONF_8378|").unwrap();
            assert!(body.encode_utf16().count() <= 10);
            assert!(!body.contains(CONFIG_TERMINATOR));
        }
        assert!(fragments
            .last()
            .unwrap()
            .ends_with(" GUI_DATA_CONF_3434_END"));

        let rebuilt: String = fragments
            .iter()
            .map(|f| {
                let body = f.strip_prefix("GUI_DATA_CONF_8378|").unwrap();
                body.strip_suffix(" GUI_DATA_CONF_3434_END").unwrap_or(body)
            })
            .collect();
        assert_eq!(rebuilt, doc);
    }

    #[test]
    fn single_fragment_when_document_fits() {
        let fragments = config_fragments("{}", 512).unwrap();
        assert_eq!(fragments, vec!["GUI_DATA_CONF_8378|{} GUI_DATA_CONF_3434_END"]);
    }

    #[test]
    fn fragments_never_split_surrogate_pairs() {
        let doc = "𝄞𝄞𝄞";
        let fragments = config_fragments(doc, 3).unwrap();
        for fragment in &fragments {
            assert!(!fragment.contains('\u{FFFD}'));
        }
        assert_eq!(fragments.len(), 3);
    }

    #[test]
    fn fragments_reject_delimiter_in_document() {
        assert!(config_fragments(r#"{"a":"x|y"}"#, 64).is_err());
    }
}
