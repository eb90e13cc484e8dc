//! Marker scanner — splits one raw stderr stream into plain text and
//! payload segments.
//!
//! The user program brackets each protocol payload in literal marker tokens
//! chosen to be vanishingly unlikely in ordinary output. Everything outside
//! the markers passes through unchanged; everything between a begin marker
//! and the next end marker is handed to the decoder as-is.

/// Opens a payload region. Matched literally, never as a pattern.
pub const BEGIN_MARKER: &str = "|DEVIZ:BEGIN|";

/// Closes a payload region.
pub const END_MARKER: &str = "|DEVIZ:END|";

/// Result of scanning one complete stderr stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanOutput {
    /// The stream with every marker-delimited region removed.
    pub stripped: String,
    /// Raw payload bodies, in stream order.
    pub payloads: Vec<String>,
}

/// Split `stderr` into plain text and marker-delimited payload bodies.
///
/// A begin marker with no following end marker discards the trailing
/// incomplete region: it is neither plain text nor a payload. Nesting is not
/// supported — a begin marker inside a payload region is payload bytes.
#[must_use]
pub fn scan(stderr: &str) -> ScanOutput {
    let mut stripped = String::new();
    let mut payloads = Vec::new();

    let mut remaining = stderr;
    loop {
        let Some(begin) = remaining.find(BEGIN_MARKER) else {
            stripped.push_str(remaining);
            break;
        };
        stripped.push_str(&remaining[..begin]);
        remaining = &remaining[begin + BEGIN_MARKER.len()..];

        let Some(end) = remaining.find(END_MARKER) else {
            tracing::debug!(
                len = remaining.len(),
                "dropping unterminated payload region"
            );
            break;
        };
        payloads.push(remaining[..end].to_string());
        remaining = &remaining[end + END_MARKER.len()..];
    }

    ScanOutput { stripped, payloads }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers_is_identity() {
        let input = "ordinary log output\nwith lines\n";
        let output = scan(input);
        assert_eq!(output.stripped, input);
        assert!(output.payloads.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let output = scan("");
        assert_eq!(output.stripped, "");
        assert!(output.payloads.is_empty());
    }

    #[test]
    fn test_single_payload_is_extracted() {
        let output = scan("before|DEVIZ:BEGIN|{payload}|DEVIZ:END|after");
        assert_eq!(output.stripped, "beforeafter");
        assert_eq!(output.payloads, vec!["{payload}".to_string()]);
    }

    #[test]
    fn test_multiple_payloads_keep_stream_order() {
        let output = scan("A|DEVIZ:BEGIN|one|DEVIZ:END|B|DEVIZ:BEGIN|two|DEVIZ:END|C");
        assert_eq!(output.stripped, "ABC");
        assert_eq!(output.payloads, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_unterminated_region_is_dropped_silently() {
        let output = scan("keep|DEVIZ:BEGIN|lost forever");
        assert_eq!(output.stripped, "keep");
        assert!(output.payloads.is_empty());
    }

    #[test]
    fn test_unterminated_region_after_complete_one() {
        let output = scan("a|DEVIZ:BEGIN|ok|DEVIZ:END|b|DEVIZ:BEGIN|truncated");
        assert_eq!(output.stripped, "ab");
        assert_eq!(output.payloads, vec!["ok".to_string()]);
    }

    #[test]
    fn test_begin_marker_inside_payload_is_not_nested() {
        // The inner begin marker is payload bytes; the first end marker closes
        // the region opened by the first begin marker.
        let output = scan("|DEVIZ:BEGIN|x|DEVIZ:BEGIN|y|DEVIZ:END|z");
        assert_eq!(output.payloads, vec!["x|DEVIZ:BEGIN|y".to_string()]);
        assert_eq!(output.stripped, "z");
    }

    #[test]
    fn test_empty_payload_body() {
        let output = scan("|DEVIZ:BEGIN||DEVIZ:END|");
        assert_eq!(output.stripped, "");
        assert_eq!(output.payloads, vec![String::new()]);
    }

    #[test]
    fn test_end_marker_without_begin_is_plain_text() {
        let output = scan("no begin |DEVIZ:END| here");
        assert_eq!(output.stripped, "no begin |DEVIZ:END| here");
        assert!(output.payloads.is_empty());
    }

    #[test]
    fn test_adjacent_payloads() {
        let output = scan("|DEVIZ:BEGIN|a|DEVIZ:END||DEVIZ:BEGIN|b|DEVIZ:END|");
        assert_eq!(output.stripped, "");
        assert_eq!(output.payloads, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let output = scan("héllo|DEVIZ:BEGIN|päyload|DEVIZ:END|wörld");
        assert_eq!(output.stripped, "héllowörld");
        assert_eq!(output.payloads, vec!["päyload".to_string()]);
    }
}
