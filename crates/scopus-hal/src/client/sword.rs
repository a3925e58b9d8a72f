//! SWORD receipt handling.

use quick_xml::Reader;
use quick_xml::events::Event;

/// Longest raw body kept when an error document has no summary.
const MAX_RAW_ERROR: usize = 500;

/// Extract the HAL identifier from an Atom deposit receipt.
#[must_use]
pub fn parse_receipt(body: &str) -> Option<String> {
    element_text(body, b"id")
}

/// Short human-readable reason from a SWORD error document.
pub(super) fn error_summary(body: &str) -> String {
    element_text(body, b"verboseDescription")
        .or_else(|| element_text(body, b"summary"))
        .unwrap_or_else(|| body.trim().chars().take(MAX_RAW_ERROR).collect())
}

/// Text of the first non-empty element with this local name, any namespace prefix.
///
/// Malformed documents yield `None`.
fn element_text(body: &str, local: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth > 0 {
                    depth += 1;
                } else if e.local_name().as_ref() == local {
                    depth = 1;
                    text.clear();
                }
            }
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let found = text.trim();
                    if !found.is_empty() {
                        return Some(found.to_string());
                    }
                }
            }
            Ok(Event::Text(t)) if depth > 0 => text.push_str(&t.unescape().ok()?),
            Ok(Event::CData(c)) if depth > 0 => text.push_str(&String::from_utf8_lossy(&c)),
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_receipt_id() {
        let body = r#"<?xml version="1.0"?><entry xmlns="http://www.w3.org/2005/Atom">
            <title>Accepted</title><id>hal-04321987</id></entry>"#;
        assert_eq!(parse_receipt(body).as_deref(), Some("hal-04321987"));
        assert_eq!(parse_receipt("<entry/>"), None);
    }

    #[test]
    fn test_parse_receipt_prefixed_id() {
        let body = r#"<atom:entry xmlns:atom="http://www.w3.org/2005/Atom">
            <atom:id>
                hal-04321987
            </atom:id>
            <atom:link rel="alternate" href="https://hal.science/hal-04321987"/>
        </atom:entry>"#;
        assert_eq!(parse_receipt(body).as_deref(), Some("hal-04321987"));
    }

    #[test]
    fn test_parse_receipt_ignores_text_outside_id() {
        assert_eq!(parse_receipt("<entry><title>id</title></entry>"), None);
        assert_eq!(parse_receipt("not xml <id>"), None);
    }

    #[test]
    fn test_error_summary_prefers_description() {
        let body = "<sword:error><summary>Duplicate entry</summary></sword:error>";
        assert_eq!(error_summary(body), "Duplicate entry");
        assert_eq!(error_summary("  plain text  "), "plain text");

        let body = r#"<sword:error xmlns:sword="http://purl.org/net/sword/">
            <atom:summary>Rejected</atom:summary>
            <sword:verboseDescription>Missing &lt;title&gt; in notice</sword:verboseDescription>
        </sword:error>"#;
        assert_eq!(error_summary(body), "Missing <title> in notice");
    }

    #[test]
    fn test_error_summary_truncates_raw_body() {
        let body = "x".repeat(800);
        assert_eq!(error_summary(&body).len(), MAX_RAW_ERROR);
    }
}
