//! atmodem-engine: Command queue, dispatch loop, and response correlation.
//!
//! This crate implements the protocol state machine that drives a GSM modem
//! over an AT command link. One tokio task owns the transport exclusively
//! and processes all command/response exchanges in FIFO order, guaranteeing
//! that at most one command is ever on the wire at a time.
//!
//! # Key pieces
//!
//! - [`spawn_engine`] / [`EngineHandle`] -- start the dispatch task and
//!   submit commands to it
//! - [`Task`] / [`CommandOptions`] -- one pending command/response exchange
//! - [`TimerRegistry`] -- named, cancelable timers for timeouts and pacing
//! - [`protocol`] -- line framing, response correlation, unsolicited parsing
//! - [`errors`] -- `+CME`/`+CMS` vendor error classification

pub mod errors;
pub mod io;
pub mod protocol;
pub mod task;
pub mod timers;

pub use io::{spawn_engine, EngineConfig, EngineHandle};
pub use task::{CommandOptions, Task};
pub use timers::{TimerHandle, TimerRegistry};
