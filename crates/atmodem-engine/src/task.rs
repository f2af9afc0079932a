//! Pending command/response exchanges.
//!
//! A [`Task`] represents one queued AT command awaiting a single matched
//! response. The task owns its completion channel; accept and reject go
//! through [`Task::accept`]/[`Task::reject`], which enforce the
//! settle-exactly-once invariant: the dispatch loop and the timeout timer
//! may both try to settle a task, whichever comes first wins, and a second
//! attempt is a logic defect that panics rather than being silently
//! absorbed.

use std::time::{Duration, Instant};

use regex::Regex;
use tokio::sync::oneshot;

use atmodem_core::error::{Error, Result};
use atmodem_core::types::{CommandResponse, Transform};

use crate::timers::TimerHandle;

/// Options controlling one command/response exchange.
#[derive(Default)]
pub struct CommandOptions {
    /// Pattern the successful reply must match. `None` means
    /// fire-and-forget: the task is accepted as soon as the command has
    /// been written and drained, without waiting for any reply.
    pub expected: Option<Regex>,
    /// Optional post-processor over the reply's lines.
    pub transform: Option<Transform>,
    /// Per-task timeout override. `None` uses the engine default;
    /// `Some(Duration::ZERO)` disables the timeout for this task.
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    /// Options with an expected-reply pattern and nothing else.
    pub fn expecting(pattern: Regex) -> Self {
        CommandOptions {
            expected: Some(pattern),
            ..Default::default()
        }
    }

    /// Attach a post-processing transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Override the engine's default timeout for this task.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One pending command/response exchange.
///
/// Tasks are created by [`EngineHandle::submit`](crate::io::EngineHandle::submit)
/// and owned by the dispatch loop until settled. The same task object is
/// used for the whole exchange, so the caller's future resolves against
/// the original call.
pub struct Task {
    /// Exact command text to send, without the line terminator.
    pub command: String,
    /// The exchange contract: expected pattern, transform, timeout.
    pub options: CommandOptions,
    /// When the task was created.
    pub created_at: Instant,
    /// Handle to this task's timeout timer, when one was scheduled.
    pub(crate) timer: Option<TimerHandle>,
    reply: Option<oneshot::Sender<Result<CommandResponse>>>,
}

impl Task {
    /// Create a task and the receiver its outcome will be delivered on.
    pub fn new(
        command: impl Into<String>,
        options: CommandOptions,
    ) -> (Task, oneshot::Receiver<Result<CommandResponse>>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let task = Task {
            command: command.into(),
            options,
            created_at: Instant::now(),
            timer: None,
            reply: Some(reply_tx),
        };
        (task, reply_rx)
    }

    /// The registry key for this task's timeout timer.
    pub fn timeout_key(&self) -> String {
        format!("{}_timeout", self.command)
    }

    /// Whether the task has been settled.
    pub fn is_settled(&self) -> bool {
        self.reply.is_none()
    }

    /// Settle the task with a successful response.
    ///
    /// # Panics
    ///
    /// Panics if the task was already settled. A double settle means two
    /// completion paths both believed they owned the outcome, which is a
    /// bug in the dispatch engine, not a recoverable condition.
    pub fn accept(&mut self, response: CommandResponse) {
        self.settle(Ok(response));
    }

    /// Settle the task with a failure.
    ///
    /// # Panics
    ///
    /// Panics if the task was already settled, as for [`Task::accept`].
    pub fn reject(&mut self, error: Error) {
        self.settle(Err(error));
    }

    fn settle(&mut self, outcome: Result<CommandResponse>) {
        match self.reply.take() {
            // A dropped receiver means the caller gave up waiting; the
            // outcome is discarded but the settle still counts.
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => panic!(
                "task '{}' settled twice; accept/reject must be called at most once",
                self.command
            ),
        }
    }
}
