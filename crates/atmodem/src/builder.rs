//! Builder for configuring and opening a modem connection.

use std::time::Duration;

use atmodem_core::error::Result;
use atmodem_core::transport::Transport;
use atmodem_engine::EngineConfig;
use atmodem_transport::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};

use crate::modem::SmsModem;

/// Configures the serial link and engine behavior, then opens the port and
/// starts the dispatch engine.
///
/// ```no_run
/// use atmodem::ModemBuilder;
///
/// # async fn example() -> atmodem::Result<()> {
/// let modem = ModemBuilder::new("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .build()
///     .await?;
/// let signal = modem.signal_strength().await?;
/// println!("rssi: {:?}", signal.field("rssi"));
/// # Ok(())
/// # }
/// ```
pub struct ModemBuilder {
    port: String,
    serial: SerialConfig,
    engine: EngineConfig,
}

impl ModemBuilder {
    /// Target the given serial port (e.g. `/dev/ttyUSB0`, `COM3`) with
    /// default settings: 9600 baud 8N1, RTS/CTS flow control, 15 s command
    /// timeout.
    pub fn new(port: impl Into<String>) -> Self {
        ModemBuilder {
            port: port.into(),
            serial: SerialConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Serial baud rate.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Number of data bits per character.
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.serial.data_bits = data_bits;
        self
    }

    /// Number of stop bits per character.
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.serial.stop_bits = stop_bits;
        self
    }

    /// Parity checking mode.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.serial.parity = parity;
        self
    }

    /// Flow control mode.
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.serial.flow_control = flow_control;
        self
    }

    /// Whether to take an exclusive OS-level lock on the device. Disable
    /// when another process legitimately shares the port.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.serial.exclusive = exclusive;
        self
    }

    /// Default per-command timeout. [`Duration::ZERO`] disables timeouts.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.engine.command_timeout = timeout;
        self
    }

    /// Quiet period between consecutive commands.
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.engine.pacing_delay = delay;
        self
    }

    /// Drop reply lines echoing the sent command (for modems with `ATE1`).
    pub fn suppress_echo(mut self, suppress: bool) -> Self {
        self.engine.suppress_echo = suppress;
        self
    }

    /// Advisory resend count for callers that retry failed commands.
    pub fn retry(mut self, retry: u32) -> Self {
        self.engine.retry = retry;
        self
    }

    /// Open the serial port and start the modem.
    pub async fn build(self) -> Result<SmsModem> {
        let transport = SerialTransport::open_with_config(&self.port, self.serial).await?;
        Ok(SmsModem::start(Box::new(transport), self.engine))
    }

    /// Start the modem on an already-open transport.
    ///
    /// This is how tests drive the full stack against a mock transport; it
    /// also allows custom transport implementations.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> SmsModem {
        SmsModem::start(transport, self.engine)
    }
}
