//! Serial port transport for modem communication.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait for USB virtual COM ports and physical RS-232
//! connections to GSM modems.
//!
//! Most GSM modules (SIM800/900, u-blox, Quectel, Huawei dongles) present a
//! virtual serial port and speak the AT command set at 9600 or 115200 baud,
//! 8N1, usually with RTS/CTS hardware flow control.
//!
//! # Example
//!
//! ```no_run
//! use atmodem_transport::SerialTransport;
//! use atmodem_core::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> atmodem_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! transport.write(b"AT\r").await?;
//! transport.drain().await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use atmodem_core::error::{Error, Result};
use atmodem_core::transport::Transport;

/// Serial port configuration.
///
/// Defaults match the most common GSM module setup:
/// - 9600 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - RTS/CTS hardware flow control
/// - Exclusive lock on the device
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g. 9600, 19200, 115200).
    pub baud_rate: u32,
    /// Number of data bits (typically 8).
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1).
    pub stop_bits: StopBits,
    /// Parity checking (typically None).
    pub parity: Parity,
    /// Flow control (typically RTS/CTS for GSM modules).
    pub flow_control: FlowControl,
    /// Whether to take an exclusive OS-level lock on the device.
    pub exclusive: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::Hardware,
            exclusive: true,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial port transport for modem communication.
///
/// Implements the [`Transport`] trait for USB virtual COM ports and
/// physical RS-232 connections to GSM modems.
pub struct SerialTransport {
    /// The underlying serial port stream.
    port: Option<SerialStream>,
    /// Port name for logging/debugging.
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default settings.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g. "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate (e.g. 9600, 115200)
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            exclusive = config.exclusive,
            "opening serial port"
        );

        let mut serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "failed to open serial port");
                Error::Transport(format!("failed to open serial port {}: {}", port, e))
            })?;

        if let Err(e) = serial_stream.set_exclusive(config.exclusive) {
            tracing::warn!(port = %port, error = %e, "failed to set exclusive lock");
        }

        tracing::info!(port = %port, baud_rate = config.baud_rate, "serial port opened");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?data,
            "writing data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "failed to write data");
            if e.kind() == std::io::ErrorKind::BrokenPipe
                || e.kind() == std::io::ErrorKind::NotConnected
            {
                Error::ConnectionLost
            } else {
                Error::WriteFailure(e.to_string())
            }
        })
    }

    async fn drain(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "failed to drain serial port");
            Error::DrainFailure(e.to_string())
        })
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let result = tokio::time::timeout(timeout, port.read(buf)).await;

        match result {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "failed to receive data");
                if e.kind() == std::io::ErrorKind::BrokenPipe
                    || e.kind() == std::io::ErrorKind::NotConnected
                {
                    Err(Error::ConnectionLost)
                } else {
                    Err(Error::Io(e))
                }
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "closing serial port");

            // Flush any pending data before closing.
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "failed to flush before closing (continuing anyway)"
                );
            }

            tracing::info!(port = %self.port_name, "serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::Hardware);
        assert!(config.exclusive);
    }

    #[test]
    fn data_bits_conversion() {
        let _: tokio_serial::DataBits = DataBits::Five.into();
        let _: tokio_serial::DataBits = DataBits::Six.into();
        let _: tokio_serial::DataBits = DataBits::Seven.into();
        let _: tokio_serial::DataBits = DataBits::Eight.into();
    }

    #[test]
    fn stop_bits_conversion() {
        let _: tokio_serial::StopBits = StopBits::One.into();
        let _: tokio_serial::StopBits = StopBits::Two.into();
    }

    #[test]
    fn parity_conversion() {
        let _: tokio_serial::Parity = Parity::None.into();
        let _: tokio_serial::Parity = Parity::Odd.into();
        let _: tokio_serial::Parity = Parity::Even.into();
    }

    #[test]
    fn flow_control_conversion() {
        let _: tokio_serial::FlowControl = FlowControl::None.into();
        let _: tokio_serial::FlowControl = FlowControl::Software.into();
        let _: tokio_serial::FlowControl = FlowControl::Hardware.into();
    }
}
