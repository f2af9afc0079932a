//! Asynchronous modem event types.
//!
//! Events are emitted by the dispatch engine and the modem façade through a
//! [`tokio::sync::broadcast`] channel when device-initiated data arrives.
//! Applications subscribe to these for incoming-SMS handling without
//! polling.

use crate::types::SmsMessage;

/// An event emitted outside the command/response channel.
///
/// Events are delivered on a best-effort basis through a bounded broadcast
/// channel; slow consumers may miss events under load.
#[derive(Debug, Clone)]
pub enum ModemEvent {
    /// The serial connection was opened and the engine is running.
    Opened,

    /// The modem announced a newly stored message (`+CMTI`).
    ///
    /// The façade reacts to this by reading the message and emitting
    /// [`ModemEvent::NewMessage`]; most applications only need the latter.
    MessageWaiting {
        /// Storage the message was placed in (e.g. `SM`).
        storage: String,
        /// Index within that storage.
        index: u32,
    },

    /// A newly arrived message, already read and decoded.
    NewMessage(SmsMessage),

    /// Device-initiated data that matched no known notification format.
    Unsolicited {
        /// The raw lines as received.
        lines: Vec<String>,
    },

    /// A background operation failed (e.g. the automatic read triggered by
    /// a `+CMTI` notification).
    Error(String),
}
