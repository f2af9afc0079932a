//! Line framing, response correlation, and unsolicited-frame parsing.
//!
//! The transport delivers raw byte chunks with no message boundaries. This
//! module turns the accumulated text into complete lines (terminated
//! frames), decides whether a set of reply lines satisfies a command's
//! expected pattern, and picks apart unsolicited notification lines such as
//! `+CMTI: "SM",3`.

use regex::Regex;

use atmodem_core::error::{Error, Result};
use atmodem_core::types::{CommandResponse, Transform};

use crate::errors;

/// Drain all complete (newline-terminated) lines out of `buf`, leaving any
/// trailing partial line in place for the next read to extend.
pub fn take_complete_lines(buf: &mut String) -> Vec<String> {
    match buf.rfind('\n') {
        Some(end) => {
            let complete: String = buf.drain(..=end).collect();
            split_lines(&complete)
        }
        None => Vec::new(),
    }
}

/// Split raw reply text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_matches(|c: char| c == '\r' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decide the outcome of one command/response exchange.
///
/// The reply is accepted when no line carries `ERROR` and the joined text
/// matches `expected`. On acceptance the optional `transform` runs over the
/// lines; a transform rejection fails the exchange even though the modem
/// answered successfully. On rejection, a recognized `+CME`/`+CMS` frame
/// takes precedence over the generic pattern-mismatch error so callers see
/// the vendor code.
pub fn correlate(
    command: &str,
    expected: Option<&Regex>,
    transform: Option<&Transform>,
    lines: Vec<String>,
) -> Result<CommandResponse> {
    let text = lines.join("\n");
    let has_error = lines.iter().any(|line| line.contains("ERROR"));
    let matched = expected.map_or(true, |re| re.is_match(&text));

    if has_error || !matched {
        if let Some((class, code)) = lines.iter().find_map(|line| errors::classify(line)) {
            let message = errors::describe(class, &code).to_string();
            return Err(Error::VendorError {
                class,
                code,
                message,
                data: lines,
            });
        }
        let pattern = expected.map(Regex::as_str).unwrap_or_default();
        return Err(Error::PatternMismatch {
            message: format!(
                "expected data /{pattern}/ does not match data received {text}, for command {command}"
            ),
            data: lines,
        });
    }

    let transformed = match transform {
        Some(transform) => match transform(&lines) {
            Ok(fields) => Some(fields),
            Err(message) => {
                return Err(Error::TransformRejected {
                    message,
                    data: lines,
                })
            }
        },
        None => None,
    };

    Ok(CommandResponse {
        data: lines,
        transformed,
    })
}

/// The comma-separated fields of a notification line, taken after the first
/// `:`. Commas inside double-quoted sections do not split; quotes are kept
/// on the fields (strip them with [`unquote`]).
pub fn notification_fields(line: &str) -> Vec<String> {
    let payload = match line.split_once(':') {
        Some((_, rest)) => rest,
        None => line,
    };

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in payload.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmodem_core::error::ErrorClass;
    use atmodem_core::types::FieldMap;

    #[test]
    fn take_complete_lines_leaves_partial_tail() {
        let mut buf = String::from("+CSQ: 13,99\r\n\r\nOK\r\npartial");
        let lines = take_complete_lines(&mut buf);
        assert_eq!(lines, vec!["+CSQ: 13,99".to_string(), "OK".to_string()]);
        assert_eq!(buf, "partial");
    }

    #[test]
    fn take_complete_lines_without_terminator() {
        let mut buf = String::from("+CMTI: \"SM\"");
        assert!(take_complete_lines(&mut buf).is_empty());
        assert_eq!(buf, "+CMTI: \"SM\"");
    }

    #[test]
    fn split_lines_trims_and_drops_blanks() {
        let lines = split_lines("\r\nAT+CSQ\r\n+CSQ: 13,99\r\n\r\nOK\r\n");
        assert_eq!(lines, vec!["AT+CSQ", "+CSQ: 13,99", "OK"]);
    }

    #[test]
    fn correlate_accepts_matching_reply() {
        let re = Regex::new(r"\+CSQ").unwrap();
        let lines = vec!["+CSQ: 13,99".to_string(), "OK".to_string()];
        let response = correlate("AT+CSQ", Some(&re), None, lines).unwrap();
        assert_eq!(response.data.len(), 2);
        assert!(response.transformed.is_none());
    }

    #[test]
    fn correlate_runs_transform_on_acceptance() {
        let re = Regex::new(r"\+CSQ").unwrap();
        let transform: Transform = Box::new(|lines| {
            let mut fields = FieldMap::new();
            fields.insert("first".into(), lines[0].clone());
            Ok(fields)
        });
        let lines = vec!["+CSQ: 13,99".to_string(), "OK".to_string()];
        let response = correlate("AT+CSQ", Some(&re), Some(&transform), lines).unwrap();
        assert_eq!(
            response.field("first"),
            Some("+CSQ: 13,99")
        );
    }

    #[test]
    fn correlate_transform_rejection_fails_the_exchange() {
        let re = Regex::new(r"\+CREG").unwrap();
        let transform: Transform = Box::new(|_| Err("Not registered on network".into()));
        let lines = vec!["+CREG: 0,0".to_string(), "OK".to_string()];
        let err = correlate("AT+CREG?", Some(&re), Some(&transform), lines).unwrap_err();
        match err {
            Error::TransformRejected { message, data } => {
                assert_eq!(message, "Not registered on network");
                assert_eq!(data.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn correlate_vendor_error_wins_over_mismatch() {
        let re = Regex::new("OK").unwrap();
        let lines = vec!["+CME ERROR: 100".to_string()];
        let err = correlate("AT+COPS?", Some(&re), None, lines).unwrap_err();
        match err {
            Error::VendorError {
                class,
                code,
                message,
                ..
            } => {
                assert_eq!(class, ErrorClass::Cme);
                assert_eq!(code, "100");
                assert_eq!(message, "Unknown error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn correlate_plain_error_is_a_mismatch() {
        let re = Regex::new("OK").unwrap();
        let lines = vec!["ERROR".to_string()];
        let err = correlate("AT+CPIN=0000", Some(&re), None, lines).unwrap_err();
        match err {
            Error::PatternMismatch { message, data } => {
                assert!(message.contains("for command AT+CPIN=0000"));
                assert_eq!(data, vec!["ERROR".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn correlate_mismatch_names_pattern_and_data() {
        let re = Regex::new(r"\+CSQ").unwrap();
        let lines = vec!["unexpected".to_string()];
        let err = correlate("AT+CSQ", Some(&re), None, lines).unwrap_err();
        match err {
            Error::PatternMismatch { message, .. } => {
                assert_eq!(
                    message,
                    "expected data /\\+CSQ/ does not match data received unexpected, for command AT+CSQ"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn correlate_without_pattern_accepts_anything() {
        let lines = vec!["whatever".to_string()];
        let response = correlate("ATZ", None, None, lines).unwrap();
        assert_eq!(response.data, vec!["whatever".to_string()]);
    }

    #[test]
    fn notification_fields_basic() {
        let fields = notification_fields("+CMTI: \"SM\",3");
        assert_eq!(fields, vec!["\"SM\"".to_string(), "3".to_string()]);
    }

    #[test]
    fn notification_fields_keeps_quoted_commas() {
        let fields =
            notification_fields("+CMGR: \"REC UNREAD\",\"+15551234\",,\"24/08/25,10:01:02+08\"");
        assert_eq!(
            fields,
            vec![
                "\"REC UNREAD\"".to_string(),
                "\"+15551234\"".to_string(),
                String::new(),
                "\"24/08/25,10:01:02+08\"".to_string(),
            ]
        );
    }

    #[test]
    fn unquote_strips_only_paired_quotes() {
        assert_eq!(unquote("\"SM\""), "SM");
        assert_eq!(unquote("3"), "3");
        assert_eq!(unquote("\"unterminated"), "\"unterminated");
    }
}
