//! # atmodem -- Async GSM/GPRS Modem Control
//!
//! `atmodem` is an asynchronous Rust library for driving GSM/GPRS modems
//! (SIM800/900, u-blox, Quectel, Huawei dongles and similar) over their AT
//! command interface: sending and receiving text-mode SMS, PIN management,
//! and signal/network status queries.
//!
//! ## Quick Start
//!
//! Add `atmodem` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! atmodem = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to a modem and send a message:
//!
//! ```no_run
//! use atmodem::ModemBuilder;
//!
//! #[tokio::main]
//! async fn main() -> atmodem::Result<()> {
//!     let modem = ModemBuilder::new("/dev/ttyUSB0")
//!         .baud_rate(115_200)
//!         .build()
//!         .await?;
//!
//!     modem.check_pin_code().await?;
//!     modem.send_sms("+15551234567", "hello from atmodem").await?;
//!     modem.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                  | Purpose                                         |
//! |------------------------|-------------------------------------------------|
//! | `atmodem-core`         | [`Transport`] trait, types, errors, events      |
//! | `atmodem-transport`    | Serial port transport over tokio-serial         |
//! | `atmodem-engine`       | Command queue, dispatch loop, response correlation |
//! | `atmodem-test-harness` | Scripted mock transport for testing             |
//! | **`atmodem`**          | This facade crate: [`SmsModem`], [`ModemBuilder`] |
//!
//! One tokio task owns the serial port exclusively and processes commands
//! strictly one at a time, so [`SmsModem`] methods can be called from any
//! task without interleaving bytes on the wire. Each command carries an
//! expected-reply pattern; replies that do not match are classified
//! (`+CME`/`+CMS` vendor codes, pattern mismatch, timeout) and returned as
//! typed [`Error`] values.
//!
//! ## Incoming Messages
//!
//! After [`set_sms_received_listener`](SmsModem::set_sms_received_listener)
//! the modem announces stored messages with `+CMTI`; `atmodem` reads them
//! automatically and emits them as events:
//!
//! ```no_run
//! use atmodem::ModemEvent;
//! # async fn example(modem: &atmodem::SmsModem) -> atmodem::Result<()> {
//! let mut events = modem.subscribe();
//! modem.set_sms_received_listener().await?;
//! while let Ok(event) = events.recv().await {
//!     if let ModemEvent::NewMessage(message) = event {
//!         println!("{}: {}", message.sender, message.text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use atmodem_core::*;

pub mod builder;
pub mod commands;
pub mod modem;

pub use builder::ModemBuilder;
pub use modem::SmsModem;

pub use atmodem_engine::{CommandOptions, EngineConfig};

/// Serial transport configuration re-exports.
///
/// Provides [`SerialTransport`](serial::SerialTransport) and its framing
/// options for applications that open the port themselves and use
/// [`ModemBuilder::build_with_transport`].
pub mod serial {
    pub use atmodem_transport::*;
}
