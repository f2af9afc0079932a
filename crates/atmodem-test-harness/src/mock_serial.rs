//! Mock transport for deterministic testing of the dispatch engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs plus an injectable unsolicited-data queue. This
//! lets you test command dispatch, response correlation, and
//! incoming-message notifications without real hardware.
//!
//! # Example
//!
//! ```
//! use atmodem_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the engine sends this command, return this reply.
//! mock.expect(b"AT+CSQ\r", b"+CSQ: 13,99\r\n");
//! // Device-initiated data, delivered while no exchange is pending.
//! mock.push_unsolicited(b"+CMTI: \"SM\",1\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use atmodem_core::error::{Error, Result};
use atmodem_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be written.
    request: Vec<u8>,
    /// The bytes to return when the matching request is received.
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing the engine without hardware.
///
/// Expectations are consumed in order. When `write()` is called, the sent
/// data is recorded and matched against the next expectation; an
/// out-of-order or unexpected write is an error, which makes the mock
/// double as a sequencing check for the single-in-flight invariant. The
/// corresponding response is then returned by subsequent `receive()`
/// calls.
///
/// When no exchange is pending, `receive()` serves the unsolicited queue,
/// one entry per call, and times out once it is empty.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// The response data pending for the next `receive()` call.
    pending_response: Option<Vec<u8>>,
    /// Cursor into the pending response.
    response_cursor: usize,
    /// Device-initiated frames served while no exchange is pending.
    unsolicited: VecDeque<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Whether the next `write()` should fail.
    fail_next_write: bool,
    /// Whether the next `drain()` should fail.
    fail_next_drain: bool,
    /// Log of all bytes written through this transport.
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            connected: true,
            ..Default::default()
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `write()` is called with data matching `request`, subsequent
    /// `receive()` calls will return `response`. An empty response means
    /// the modem stays silent (receives time out).
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue device-initiated bytes, served by `receive()` while no
    /// exchange is pending.
    pub fn push_unsolicited(&mut self, data: &[u8]) {
        self.unsolicited.push_back(data.to_vec());
    }

    /// Make the next `write()` call fail with a write error.
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// Make the next `drain()` call fail with a drain error.
    pub fn fail_next_drain(&mut self) {
        self.fail_next_drain = true;
    }

    /// All data written through this transport, one entry per `write()`.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// The number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(Error::WriteFailure("mock write failure".into()));
        }

        self.sent_log.push(data.to_vec());

        // Match against the next expectation.
        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::WriteFailure(format!(
                    "unexpected write: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data),
                )));
            }
            self.pending_response = Some(expectation.response);
            self.response_cursor = 0;
            Ok(())
        } else {
            Err(Error::WriteFailure(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn drain(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.fail_next_drain {
            self.fail_next_drain = false;
            return Err(Error::DrainFailure("mock drain failure".into()));
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if let Some(ref response) = self.pending_response {
            let remaining = &response[self.response_cursor..];
            if remaining.is_empty() {
                self.pending_response = None;
                self.response_cursor = 0;
                return Err(Error::Timeout);
            }
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.response_cursor += n;
            if self.response_cursor >= response.len() {
                // All response bytes consumed; clear for next exchange.
                self.pending_response = None;
                self.response_cursor = 0;
            }
            return Ok(n);
        }

        if let Some(frame) = self.unsolicited.pop_front() {
            let n = frame.len().min(buf.len());
            buf[..n].copy_from_slice(&frame[..n]);
            if n < frame.len() {
                self.unsolicited.push_front(frame[n..].to_vec());
            }
            return Ok(n);
        }

        Err(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending_response = None;
        self.response_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
