//! Transport trait for modem communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a GSM modem.
//! Implementations exist for serial ports (`atmodem-transport`) and mock
//! transports for testing (`atmodem-test-harness`).
//!
//! The dispatch engine operates on a `Transport` rather than directly on a
//! serial port, enabling both real hardware control and deterministic unit
//! testing.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level duplex channel to a modem.
///
/// Write and drain are separate operations because the engine reports their
/// failures distinctly
/// ([`WriteFailure`](crate::error::Error::WriteFailure) vs
/// [`DrainFailure`](crate::error::Error::DrainFailure)).
/// Framing (line termination, echo) is a protocol-level concern handled by
/// the engine, not by implementations of this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue raw bytes for transmission to the modem.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Block until all queued bytes have left the transport.
    async fn drain(&mut self) -> Result<()>;

    /// Receive bytes from the modem into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if no data is
    /// received within the deadline. Data may arrive split across multiple
    /// reads; reassembly is the caller's responsibility.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `write()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
