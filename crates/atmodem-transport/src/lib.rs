//! atmodem-transport: Serial transport implementation for atmodem.
//!
//! This crate provides [`SerialTransport`], the
//! [`Transport`](atmodem_core::Transport) implementation for USB virtual
//! COM ports and physical RS-232 connections to GSM/GPRS modems.

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
