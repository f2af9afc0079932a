//! atmodem-test-harness: Mock transport and test utilities for atmodem.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the dispatch engine and the modem façade without real modem hardware.

pub mod mock_serial;

pub use mock_serial::MockTransport;
