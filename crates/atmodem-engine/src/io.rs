//! The dispatch engine: command queue, single-in-flight exchange loop, and
//! unsolicited-frame routing.
//!
//! [`spawn_engine`] starts one tokio task that owns the [`Transport`]
//! exclusively. Callers interact through a cloneable [`EngineHandle`]:
//! [`EngineHandle::submit`] queues a command and resolves with its
//! correlated outcome. Because the loop takes exactly one task off the
//! queue at a time and runs the whole exchange before looking at the queue
//! again, at most one command is ever on the wire -- the invariant is
//! structural, not guarded by a flag.
//!
//! While the queue is empty the loop polls the transport for
//! device-initiated frames (`+CMTI` and friends) and publishes them on a
//! broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use atmodem_core::error::{Error, Result};
use atmodem_core::events::ModemEvent;
use atmodem_core::transport::Transport;
use atmodem_core::types::CommandResponse;

use crate::protocol;
use crate::task::{CommandOptions, Task};
use crate::timers::{TimerHandle, TimerRegistry};

/// How long a single idle/in-flight transport read waits for bytes.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Pause after a silent read, so a transport that reports timeouts
/// immediately does not spin the loop.
const READ_RETRY_PAUSE: Duration = Duration::from_millis(10);

/// Per-read scratch buffer size.
const READ_CHUNK: usize = 1024;

/// Cap on accumulated idle bytes; beyond this the buffer is discarded.
const MAX_IDLE_BUF: usize = 8192;

/// Depth of the command queue and the event broadcast channel.
const CHANNEL_CAPACITY: usize = 32;

/// Tunables for the dispatch engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default per-command timeout. [`Duration::ZERO`] disables timeouts;
    /// individual commands can override via
    /// [`CommandOptions::with_timeout`].
    pub command_timeout: Duration,
    /// Quiet period inserted after each settled exchange, giving the modem
    /// time to recover before the next command.
    pub pacing_delay: Duration,
    /// Pause after a failed write or drain before the next queued command
    /// is attempted.
    pub write_retry_backoff: Duration,
    /// Drop reply lines that exactly echo the sent command. Off by
    /// default; enable when the modem has command echo (`ATE1`) active.
    pub suppress_echo: bool,
    /// Advisory resend count for callers that retry failed commands. The
    /// engine itself never resends: a command's expected pattern and
    /// transform are consumed by its exchange, so the retry decision and
    /// the rebuilt command belong to the caller.
    pub retry: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            command_timeout: Duration::from_millis(15_000),
            pacing_delay: Duration::from_millis(100),
            write_retry_backoff: Duration::from_millis(50),
            suppress_echo: false,
            retry: 0,
        }
    }
}

/// Handle for submitting commands to a running engine.
///
/// Clones share the same queue, timer registry, and event channel.
#[derive(Clone)]
pub struct EngineHandle {
    task_tx: mpsc::Sender<Task>,
    timers: TimerRegistry,
    cancel: CancellationToken,
    config: Arc<EngineConfig>,
    event_tx: broadcast::Sender<ModemEvent>,
}

impl EngineHandle {
    /// Queue a command and wait for its correlated outcome.
    ///
    /// The timeout timer starts now, not when the command reaches the
    /// wire: time spent queued behind other commands counts against the
    /// deadline.
    pub async fn submit(
        &self,
        command: impl Into<String>,
        options: CommandOptions,
    ) -> Result<CommandResponse> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::WriteFailure("empty command".into()));
        }

        let (mut task, reply_rx) = Task::new(command, options);
        let timeout = task.options.timeout.unwrap_or(self.config.command_timeout);
        if !timeout.is_zero() {
            task.timer = Some(self.timers.schedule(task.timeout_key(), timeout));
        }

        let key = task.timeout_key();
        if self.task_tx.send(task).await.is_err() {
            self.timers.cancel(&key);
            return Err(Error::NotConnected);
        }
        match reply_rx.await {
            Ok(outcome) => outcome,
            // Engine shut down with the task still queued.
            Err(_) => {
                self.timers.cancel(&key);
                Err(Error::NotConnected)
            }
        }
    }

    /// Subscribe to device-initiated events.
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.event_tx.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Used by layers above the engine that derive events from command
    /// results, such as the automatic read triggered by a `+CMTI`
    /// notification. Ignored when no subscriber is listening.
    pub fn publish(&self, event: ModemEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Ask the engine loop to stop. Queued, un-dispatched commands resolve
    /// with [`Error::NotConnected`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The timer registry shared with the engine loop.
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Start the dispatch loop on a dedicated tokio task.
///
/// The engine takes exclusive ownership of the transport; all further
/// interaction goes through the returned [`EngineHandle`]. The join handle
/// resolves once the loop has exited and the transport is closed.
pub fn spawn_engine(
    transport: Box<dyn Transport>,
    config: EngineConfig,
) -> (EngineHandle, JoinHandle<()>) {
    let (task_tx, task_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
    let timers = TimerRegistry::new();
    let cancel = CancellationToken::new();
    let config = Arc::new(config);

    let join = tokio::spawn(engine_loop(
        transport,
        Arc::clone(&config),
        timers.clone(),
        task_rx,
        event_tx.clone(),
        cancel.clone(),
    ));

    let handle = EngineHandle {
        task_tx,
        timers,
        cancel,
        config,
        event_tx,
    };
    (handle, join)
}

enum Wakeup {
    Command(Task),
    Idle(Result<usize>),
    Shutdown,
}

async fn engine_loop(
    mut transport: Box<dyn Transport>,
    config: Arc<EngineConfig>,
    timers: TimerRegistry,
    mut task_rx: mpsc::Receiver<Task>,
    event_tx: broadcast::Sender<ModemEvent>,
    cancel: CancellationToken,
) {
    debug!("engine loop started");
    let _ = event_tx.send(ModemEvent::Opened);

    let mut idle_buf = String::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let wakeup = tokio::select! {
            biased;
            _ = cancel.cancelled() => Wakeup::Shutdown,
            next = task_rx.recv() => match next {
                Some(task) => Wakeup::Command(task),
                None => Wakeup::Shutdown,
            },
            read = transport.receive(&mut chunk, READ_TIMEOUT) => Wakeup::Idle(read),
        };

        match wakeup {
            Wakeup::Shutdown => break,
            Wakeup::Command(mut task) => {
                dispatch_task(transport.as_mut(), &config, &timers, &mut task).await;
            }
            Wakeup::Idle(Ok(n)) => {
                idle_buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
                if idle_buf.len() > MAX_IDLE_BUF {
                    warn!(len = idle_buf.len(), "discarding oversized idle buffer");
                    idle_buf.clear();
                }
                let lines = protocol::take_complete_lines(&mut idle_buf);
                if !lines.is_empty() {
                    route_unsolicited(lines, &event_tx);
                }
            }
            Wakeup::Idle(Err(Error::Timeout)) => {
                tokio::time::sleep(READ_RETRY_PAUSE).await;
            }
            Wakeup::Idle(Err(e)) => {
                trace!(error = %e, "idle read failed");
                tokio::time::sleep(READ_RETRY_PAUSE).await;
            }
        }
    }

    timers.cancel_by_prefix("");
    if let Err(e) = transport.close().await {
        debug!(error = %e, "transport close failed");
    }
    debug!("engine loop stopped");
}

/// Run one full command/response exchange.
///
/// The task is always settled exactly once before this returns, and its
/// timeout timer is always canceled.
async fn dispatch_task(
    transport: &mut dyn Transport,
    config: &EngineConfig,
    timers: &TimerRegistry,
    task: &mut Task,
) {
    let key = task.timeout_key();
    let command = task.command.clone();
    let mut timer = task.timer.take();

    // The deadline may have passed while the task sat in the queue.
    if timer.as_mut().is_some_and(TimerHandle::already_fired) {
        debug!(command = %command, "task timed out while queued");
        task.reject(Error::Timeout);
        return;
    }

    trace!(command = %command, "dispatching");
    let payload = format!("{command}\r");
    if let Err(e) = transport.write(payload.as_bytes()).await {
        timers.cancel(&key);
        task.reject(as_write_failure(e));
        tokio::time::sleep(config.write_retry_backoff).await;
        return;
    }
    if let Err(e) = transport.drain().await {
        timers.cancel(&key);
        let err = match e {
            Error::DrainFailure(_) | Error::NotConnected | Error::ConnectionLost => e,
            other => Error::DrainFailure(other.to_string()),
        };
        task.reject(err);
        tokio::time::sleep(config.write_retry_backoff).await;
        return;
    }

    // Fire-and-forget: no reply contract, done once the bytes are out.
    if task.options.expected.is_none() {
        timers.cancel(&key);
        task.accept(CommandResponse::default());
        tokio::time::sleep(config.pacing_delay).await;
        return;
    }

    let outcome = await_reply(transport, config, &command, task, &mut timer).await;

    timers.cancel(&key);
    match outcome {
        Ok(response) => task.accept(response),
        Err(e) => task.reject(e),
    }
    tokio::time::sleep(config.pacing_delay).await;
}

/// Read reply frames until the exchange can be decided.
///
/// Frames accumulate across reads; the exchange is decided as soon as the
/// collected lines match the expected pattern or carry an error marker. A
/// silent read with a partial (unterminated) tail promotes that tail to a
/// final frame, so modems that omit the trailing newline still correlate.
async fn await_reply(
    transport: &mut dyn Transport,
    config: &EngineConfig,
    command: &str,
    task: &Task,
    timer: &mut Option<TimerHandle>,
) -> Result<CommandResponse> {
    let expected = task.options.expected.as_ref();
    let transform = task.options.transform.as_ref();

    // Timers are keyed by command text, so a queued duplicate of the same
    // command replaces (cancels) this task's registry entry. The deadline
    // itself must survive that: fall back to the locally held instant so a
    // silent modem still times this exchange out.
    let timeout = task.options.timeout.unwrap_or(config.command_timeout);
    let deadline = tokio::time::Instant::from_std(task.created_at + timeout);
    let timed_out = async {
        match timer.as_mut() {
            Some(t) => {
                if !t.wait().await {
                    tokio::time::sleep_until(deadline).await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(timed_out);

    let mut acc = String::new();
    let mut collected: Vec<String> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            biased;
            _ = &mut timed_out => return Err(Error::Timeout),
            read = transport.receive(&mut chunk, READ_TIMEOUT) => read,
        };

        match read {
            Ok(n) => {
                acc.push_str(&String::from_utf8_lossy(&chunk[..n]));
                let mut lines = protocol::take_complete_lines(&mut acc);
                if config.suppress_echo {
                    lines.retain(|line| line != command);
                }
                collected.extend(lines);
            }
            Err(Error::Timeout) => {
                // Silence ends the reply: promote any unterminated tail and
                // correlate what arrived. With nothing received yet, keep
                // waiting for the command timeout to decide.
                if !acc.trim().is_empty() {
                    let mut lines = protocol::split_lines(&acc);
                    acc.clear();
                    if config.suppress_echo {
                        lines.retain(|line| line != command);
                    }
                    collected.extend(lines);
                }
                if collected.is_empty() {
                    tokio::time::sleep(READ_RETRY_PAUSE).await;
                    continue;
                }
                return protocol::correlate(command, expected, transform, collected);
            }
            Err(e) => return Err(e),
        }

        if collected.is_empty() {
            continue;
        }
        let decided = collected.iter().any(|line| line.contains("ERROR"))
            || expected.is_some_and(|re| re.is_match(&collected.join("\n")));
        if decided {
            return protocol::correlate(command, expected, transform, collected);
        }
    }
}

fn as_write_failure(e: Error) -> Error {
    match e {
        Error::WriteFailure(_) | Error::NotConnected | Error::ConnectionLost => e,
        other => Error::WriteFailure(other.to_string()),
    }
}

/// Publish device-initiated lines as events.
///
/// `+CMTI` notifications become [`ModemEvent::MessageWaiting`]; anything
/// else (including a malformed `+CMTI`) is passed through as
/// [`ModemEvent::Unsolicited`]. Send failures mean no subscriber is
/// listening and are ignored.
fn route_unsolicited(lines: Vec<String>, event_tx: &broadcast::Sender<ModemEvent>) {
    let mut passthrough = Vec::new();
    for line in lines {
        match parse_message_waiting(&line) {
            Some(event) => {
                debug!(line = %line, "new message notification");
                let _ = event_tx.send(event);
            }
            None => passthrough.push(line),
        }
    }
    if !passthrough.is_empty() {
        let _ = event_tx.send(ModemEvent::Unsolicited { lines: passthrough });
    }
}

fn parse_message_waiting(line: &str) -> Option<ModemEvent> {
    if !line.starts_with("+CMTI") {
        return None;
    }
    let fields = protocol::notification_fields(line);
    let storage = protocol::unquote(fields.first()?).to_string();
    let index = fields.get(1)?.parse().ok()?;
    Some(ModemEvent::MessageWaiting { storage, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmodem_core::error::ErrorClass;
    use atmodem_core::types::{FieldMap, Transform};
    use atmodem_test_harness::MockTransport;
    use regex::Regex;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            command_timeout: Duration::from_millis(500),
            pacing_delay: Duration::from_millis(1),
            write_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn spawn(mock: MockTransport) -> (EngineHandle, JoinHandle<()>) {
        spawn_engine(Box::new(mock), fast_config())
    }

    #[tokio::test]
    async fn simple_command_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"OK\r\n");
        let (handle, _join) = spawn(mock);

        let response = handle
            .submit("AT", CommandOptions::expecting(Regex::new("OK").unwrap()))
            .await
            .unwrap();
        assert_eq!(response.data, vec!["OK".to_string()]);
        handle.shutdown();
    }

    #[tokio::test]
    async fn echoed_command_is_suppressed() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CSQ\r", b"AT+CSQ\r\n+CSQ: 13,99\r\n\r\nOK\r\n");
        let config = EngineConfig {
            suppress_echo: true,
            ..fast_config()
        };
        let (handle, _join) = spawn_engine(Box::new(mock), config);

        let response = handle
            .submit(
                "AT+CSQ",
                CommandOptions::expecting(Regex::new(r"\+CSQ").unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(
            response.data,
            vec!["+CSQ: 13,99".to_string(), "OK".to_string()]
        );
        handle.shutdown();
    }

    #[tokio::test]
    async fn transform_runs_on_reply() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CSQ\r", b"+CSQ: 13,99\r\nOK\r\n");
        let (handle, _join) = spawn(mock);

        let transform: Transform = Box::new(|lines| {
            let fields_line = lines
                .iter()
                .find(|l| l.starts_with("+CSQ"))
                .ok_or_else(|| "missing +CSQ line".to_string())?;
            let mut fields = FieldMap::new();
            fields.insert("raw".into(), fields_line.clone());
            Ok(fields)
        });
        let options = CommandOptions::expecting(Regex::new(r"\+CSQ").unwrap())
            .with_transform(transform);

        let response = handle.submit("AT+CSQ", options).await.unwrap();
        assert_eq!(response.field("raw"), Some("+CSQ: 13,99"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn vendor_error_is_classified() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+COPS?\r", b"+CME ERROR: 100\r\n");
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit(
                "AT+COPS?",
                CommandOptions::expecting(Regex::new(r"\+COPS").unwrap()),
            )
            .await
            .unwrap_err();
        match err {
            Error::VendorError {
                class,
                code,
                message,
                ..
            } => {
                assert_eq!(class, ErrorClass::Cme);
                assert_eq!(code, "100");
                assert_eq!(message, "Unknown error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn plain_error_reply_is_a_mismatch() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CPIN=0000\r", b"ERROR\r\n");
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit(
                "AT+CPIN=0000",
                CommandOptions::expecting(Regex::new("OK").unwrap()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PatternMismatch { .. }));
        handle.shutdown();
    }

    #[tokio::test]
    async fn non_matching_reply_is_a_mismatch_once_the_line_goes_quiet() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CPIN?\r", b"+CPIN: SIM PIN\r\nOK\r\n");
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit(
                "AT+CPIN?",
                CommandOptions::expecting(Regex::new(r"\+CPIN: READY").unwrap()),
            )
            .await
            .unwrap_err();
        match err {
            Error::PatternMismatch { message, data } => {
                assert!(message.contains("+CPIN: SIM PIN"));
                assert_eq!(data, vec!["+CPIN: SIM PIN".to_string(), "OK".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn silent_modem_times_out_and_clears_timer() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CSQ\r", b"");
        let (handle, _join) = spawn(mock);

        let options = CommandOptions::expecting(Regex::new(r"\+CSQ").unwrap())
            .with_timeout(Duration::from_millis(50));
        let err = handle.submit("AT+CSQ", options).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(handle.timers().active(), 0);
        handle.shutdown();
    }

    #[tokio::test]
    async fn duplicate_command_does_not_disarm_in_flight_timeout() {
        let mut mock = MockTransport::new();
        // First "AT" stays silent; the retry gets a reply.
        mock.expect(b"AT\r", b"");
        mock.expect(b"AT\r", b"OK\r\n");
        let (handle, _join) = spawn(mock);

        // Queuing the second "AT" replaces the first one's registry timer
        // (same key). The first exchange must still time out and the loop
        // must advance to the second. Timeouts count from submission, so
        // the second command needs room for the first one's 100 ms.
        let options = |timeout| {
            CommandOptions::expecting(Regex::new("OK").unwrap()).with_timeout(timeout)
        };
        let first = handle.submit("AT", options(Duration::from_millis(100)));
        let second = handle.submit("AT", options(Duration::from_millis(1_000)));
        let (first, second) = tokio::time::timeout(Duration::from_secs(2), async {
            tokio::join!(first, second)
        })
        .await
        .expect("dispatch loop wedged on duplicate command timers");

        assert!(matches!(first.unwrap_err(), Error::Timeout));
        assert_eq!(second.unwrap().data, vec!["OK".to_string()]);
        handle.shutdown();
    }

    #[tokio::test]
    async fn commands_dispatch_in_submission_order() {
        let mut mock = MockTransport::new();
        // The mock rejects out-of-order writes, so completing both proves
        // the dispatch order.
        mock.expect(b"AT\r", b"OK\r\n");
        mock.expect(b"AT+CSQ\r", b"+CSQ: 13,99\r\nOK\r\n");
        let (handle, _join) = spawn(mock);

        let first = handle.submit("AT", CommandOptions::expecting(Regex::new("OK").unwrap()));
        let second = handle.submit(
            "AT+CSQ",
            CommandOptions::expecting(Regex::new(r"\+CSQ").unwrap()),
        );
        let (first, second) = tokio::join!(first, second);
        assert!(first.is_ok());
        assert!(second.is_ok());
        handle.shutdown();
    }

    #[tokio::test]
    async fn fire_and_forget_accepts_after_drain() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r", b"");
        let (handle, _join) = spawn(mock);

        let response = handle
            .submit("ATZ", CommandOptions::default())
            .await
            .unwrap();
        assert!(response.data.is_empty());
        assert_eq!(handle.timers().active(), 0);
        handle.shutdown();
    }

    #[tokio::test]
    async fn write_failure_rejects_the_task() {
        let mut mock = MockTransport::new();
        mock.fail_next_write();
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit("AT", CommandOptions::expecting(Regex::new("OK").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WriteFailure(_)));
        assert_eq!(handle.timers().active(), 0);
        handle.shutdown();
    }

    #[tokio::test]
    async fn drain_failure_rejects_the_task() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"OK\r\n");
        mock.fail_next_drain();
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit("AT", CommandOptions::expecting(Regex::new("OK").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DrainFailure(_)));
        handle.shutdown();
    }

    #[tokio::test]
    async fn unterminated_tail_correlates_on_read_timeout() {
        let mut mock = MockTransport::new();
        // Final "OK" arrives without a trailing newline.
        mock.expect(b"AT+CPIN?\r", b"+CPIN: READY\r\nOK");
        let (handle, _join) = spawn(mock);

        let response = handle
            .submit(
                "AT+CPIN?",
                CommandOptions::expecting(Regex::new("OK").unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(
            response.data,
            vec!["+CPIN: READY".to_string(), "OK".to_string()]
        );
        handle.shutdown();
    }

    #[tokio::test]
    async fn empty_command_is_rejected_without_dispatch() {
        let mock = MockTransport::new();
        let (handle, _join) = spawn(mock);

        let err = handle
            .submit("   ", CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WriteFailure(_)));
        assert_eq!(handle.timers().active(), 0);
        handle.shutdown();
    }

    #[tokio::test]
    async fn unsolicited_cmti_becomes_message_waiting_event() {
        let mut mock = MockTransport::new();
        mock.push_unsolicited(b"+CMTI: \"SM\",3\r\n");
        let (handle, _join) = spawn(mock);
        let mut events = handle.subscribe();

        let event = loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("no event before deadline")
                .unwrap();
            if !matches!(event, ModemEvent::Opened) {
                break event;
            }
        };
        match event {
            ModemEvent::MessageWaiting { storage, index } => {
                assert_eq!(storage, "SM");
                assert_eq!(index, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn unrecognized_unsolicited_lines_pass_through() {
        let mut mock = MockTransport::new();
        mock.push_unsolicited(b"RING\r\n");
        let (handle, _join) = spawn(mock);
        let mut events = handle.subscribe();

        let event = loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("no event before deadline")
                .unwrap();
            if !matches!(event, ModemEvent::Opened) {
                break event;
            }
        };
        match event {
            ModemEvent::Unsolicited { lines } => assert_eq!(lines, vec!["RING".to_string()]),
            other => panic!("unexpected event: {other:?}"),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop_and_rejects_new_commands() {
        let mock = MockTransport::new();
        let (handle, join) = spawn(mock);

        handle.shutdown();
        join.await.unwrap();

        let err = handle
            .submit("AT", CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.command_timeout, Duration::from_millis(15_000));
        assert_eq!(config.pacing_delay, Duration::from_millis(100));
        assert!(!config.suppress_echo);
        assert_eq!(config.retry, 0);
    }

    #[test]
    fn message_waiting_parse() {
        match parse_message_waiting("+CMTI: \"SM\",12") {
            Some(ModemEvent::MessageWaiting { storage, index }) => {
                assert_eq!(storage, "SM");
                assert_eq!(index, 12);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(parse_message_waiting("+CMTI: \"SM\",notanumber").is_none());
        assert!(parse_message_waiting("+CSQ: 13,99").is_none());
    }
}
