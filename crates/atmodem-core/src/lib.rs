//! atmodem-core: Core traits, types, and error definitions for atmodem.
//!
//! This crate defines the abstractions shared by the command engine, the
//! serial transport, and the modem façade. Applications depend on these
//! types without pulling in any specific transport implementation.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level duplex channel to the modem
//! - [`ModemEvent`] -- asynchronous notifications (incoming SMS, unsolicited data)
//! - [`CommandResponse`] -- the settled outcome of one command/response exchange
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use atmodem_core::*`.
pub use error::{Error, ErrorClass, Result};
pub use events::ModemEvent;
pub use transport::Transport;
pub use types::{CommandResponse, FieldMap, SmsMessage, Transform};
