//! Shared data types for command exchanges.

use std::collections::BTreeMap;

/// String-keyed fields extracted from a reply by a post-processing
/// transform (e.g. `{"rssi": "13", "ber": "99"}` for `+CSQ: 13,99`).
pub type FieldMap = BTreeMap<String, String>;

/// A deferred post-processor that inspects the line-oriented structure of a
/// reply and either extracts structured fields or rejects the reply with a
/// reason.
///
/// Transforms run inside the dispatch engine after the expected-pattern
/// check has passed. An `Err` becomes
/// [`Error::TransformRejected`](crate::error::Error::TransformRejected),
/// with the raw lines attached by the engine.
pub type Transform =
    Box<dyn Fn(&[String]) -> std::result::Result<FieldMap, String> + Send + Sync>;

/// The settled outcome of one successful command/response exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    /// The raw reply split into lines, in arrival order.
    pub data: Vec<String>,
    /// Structured fields produced by the task's transform, when one was
    /// supplied.
    pub transformed: Option<FieldMap>,
}

impl CommandResponse {
    /// A transformed field by name, if the transform produced it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.transformed
            .as_ref()
            .and_then(|map| map.get(name))
            .map(String::as_str)
    }
}

/// A decoded text-mode SMS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    /// Storage index the message was read from, when known.
    pub index: Option<u32>,
    /// Sender address (e.g. `+33612345678`).
    pub sender: String,
    /// Service-center date stamp (e.g. `18/12/17`).
    pub date: String,
    /// Service-center time stamp (e.g. `16:00:57+04`).
    pub time: String,
    /// Message body.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_field_lookup() {
        let mut map = FieldMap::new();
        map.insert("rssi".into(), "13".into());
        let resp = CommandResponse {
            data: vec!["+CSQ: 13,99".into()],
            transformed: Some(map),
        };
        assert_eq!(resp.field("rssi"), Some("13"));
        assert_eq!(resp.field("ber"), None);
    }

    #[test]
    fn response_field_without_transform() {
        let resp = CommandResponse {
            data: vec!["OK".into()],
            transformed: None,
        };
        assert_eq!(resp.field("anything"), None);
    }
}
