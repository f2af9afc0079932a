//! High-level modem control.
//!
//! [`SmsModem`] wraps a running dispatch engine with the full AT command
//! catalog: identity queries, signal/network status, PIN management, and
//! text-mode SMS. Construct one through
//! [`ModemBuilder`](crate::builder::ModemBuilder).
//!
//! A background watcher reacts to `+CMTI` new-message notifications by
//! reading the announced message and republishing it as
//! [`ModemEvent::NewMessage`], so applications receive decoded messages
//! without polling.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use atmodem_core::error::Result;
use atmodem_core::events::ModemEvent;
use atmodem_core::transport::Transport;
use atmodem_core::types::{CommandResponse, SmsMessage};
use atmodem_engine::{spawn_engine, CommandOptions, EngineConfig, EngineHandle};

use crate::commands::{self, AtCommand};

/// An AT-command GSM modem.
///
/// All command methods queue through the engine and run strictly one at a
/// time, so concurrent calls from different tasks are safe and ordered.
pub struct SmsModem {
    engine: EngineHandle,
    engine_task: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

impl SmsModem {
    pub(crate) fn start(transport: Box<dyn Transport>, config: EngineConfig) -> Self {
        let (engine, engine_task) = spawn_engine(transport, config);
        let watcher = spawn_watcher(engine.clone());
        SmsModem {
            engine,
            engine_task,
            watcher,
        }
    }

    async fn run(&self, cmd: AtCommand) -> Result<CommandResponse> {
        self.engine.submit(cmd.text, cmd.options).await
    }

    /// Send an arbitrary AT command with an explicit reply contract.
    pub async fn custom_command(
        &self,
        command: impl Into<String>,
        options: CommandOptions,
    ) -> Result<CommandResponse> {
        self.engine.submit(command, options).await
    }

    /// Reset the modem to its stored profile (`ATZ`).
    pub async fn reset(&self) -> Result<CommandResponse> {
        self.run(commands::reset()).await
    }

    /// Select SMS mode: 0 = PDU, 1 = text (`AT+CMGF`).
    pub async fn set_sms_mode(&self, mode: u8) -> Result<CommandResponse> {
        self.run(commands::set_sms_mode(mode)).await
    }

    /// Save the current configuration to the modem's profile (`AT&W`).
    pub async fn save_configuration(&self) -> Result<CommandResponse> {
        self.run(commands::save_configuration()).await
    }

    /// Dump the active configuration profile (`AT&V`).
    pub async fn current_configuration(&self) -> Result<CommandResponse> {
        self.run(commands::current_configuration()).await
    }

    /// Switch the modem to numeric `+CME ERROR` reporting (`AT+CMEE=1`).
    pub async fn activate_errors_codes(&self) -> Result<CommandResponse> {
        self.run(commands::activate_errors_codes()).await
    }

    /// Request SMS status reports (`AT+CSMP=49,167,0,0`).
    pub async fn activate_status_report(&self) -> Result<CommandResponse> {
        self.run(commands::activate_status_report()).await
    }

    /// Modem identification string (`ATI`).
    pub async fn id(&self) -> Result<CommandResponse> {
        self.run(commands::id()).await
    }

    /// The SIM's IMSI (`AT+CIMI`).
    pub async fn imsi(&self) -> Result<CommandResponse> {
        self.run(commands::imsi()).await
    }

    /// Model identification (`AT+CGMM`).
    pub async fn model(&self) -> Result<CommandResponse> {
        self.run(commands::model()).await
    }

    /// Firmware revision (`AT+CGMR`).
    pub async fn version(&self) -> Result<CommandResponse> {
        self.run(commands::version()).await
    }

    /// Manufacturer identification (`AT+CGMI`).
    pub async fn manufacturer(&self) -> Result<CommandResponse> {
        self.run(commands::manufacturer()).await
    }

    /// The modem's real-time clock as `{date, time}` (`AT+CCLK?`).
    pub async fn clock(&self) -> Result<CommandResponse> {
        self.run(commands::clock()).await
    }

    /// Signal quality as `{rssi, ber}` (`AT+CSQ`).
    pub async fn signal_strength(&self) -> Result<CommandResponse> {
        self.run(commands::signal_strength()).await
    }

    /// The SMS service center address as `{number}` (`AT+CSCA?`).
    pub async fn sms_center(&self) -> Result<CommandResponse> {
        self.run(commands::sms_center()).await
    }

    /// Network registration as `{mode, status}` (`AT+CREG?`).
    ///
    /// Fails with
    /// [`Error::TransformRejected`](atmodem_core::error::Error::TransformRejected)
    /// when the modem is still searching or not registered.
    pub async fn check_gsm_network(&self) -> Result<CommandResponse> {
        self.run(commands::check_gsm_network()).await
    }

    /// Succeeds only when the SIM is unlocked and ready (`AT+CPIN?`).
    pub async fn check_pin_code(&self) -> Result<CommandResponse> {
        self.run(commands::check_pin_code()).await
    }

    /// Present the SIM PIN (`AT+CPIN=<pin>`).
    pub async fn set_pin_code(&self, pin: &str) -> Result<CommandResponse> {
        self.run(commands::set_pin_code(pin)).await
    }

    /// Disable the SIM PIN lock (`AT+CLCK="SC",0`).
    pub async fn unlock_sim_pin(&self, pin: &str) -> Result<CommandResponse> {
        self.run(commands::unlock_sim_pin(pin)).await
    }

    /// Enable the SIM PIN lock (`AT+CLCK="SC",1`).
    pub async fn lock_sim_pin(&self, pin: &str) -> Result<CommandResponse> {
        self.run(commands::lock_sim_pin(pin)).await
    }

    /// Change the SIM PIN (`AT+CPWD="SC"`).
    pub async fn change_pin(&self, current: &str, new: &str) -> Result<CommandResponse> {
        self.run(commands::change_pin(current, new)).await
    }

    /// Read one stored message (`AT+CMGR=<index>`).
    pub async fn read_sms(&self, index: u32) -> Result<SmsMessage> {
        read_indexed(&self.engine, index).await
    }

    /// List all stored messages (`AT+CMGL="ALL"`).
    pub async fn list_sms(&self) -> Result<CommandResponse> {
        self.run(commands::list_sms()).await
    }

    /// Delete one stored message (`AT+CMGD=<index>`).
    pub async fn delete_sms(&self, index: u32) -> Result<CommandResponse> {
        self.run(commands::delete_sms(index)).await
    }

    /// Delete every stored message (`AT+CMGD=1,4`).
    pub async fn delete_all_sms(&self) -> Result<CommandResponse> {
        self.run(commands::delete_all_sms()).await
    }

    /// Route new-message notifications to the serial link (`AT+CNMI`).
    ///
    /// Once active, incoming messages surface as
    /// [`ModemEvent::NewMessage`] on [`SmsModem::subscribe`].
    pub async fn set_sms_received_listener(&self) -> Result<CommandResponse> {
        self.run(commands::set_sms_received_listener()).await
    }

    /// Start a text-mode send and wait for the `>` prompt (`AT+CMGS`).
    pub async fn set_receiver(&self, number: &str) -> Result<CommandResponse> {
        self.run(commands::set_receiver(number)).await
    }

    /// Send the message body terminated with Ctrl-Z.
    pub async fn set_text_message(&self, text: &str) -> Result<CommandResponse> {
        self.run(commands::set_text_message(text)).await
    }

    /// Send a text-mode SMS: reset, select text mode, address, body.
    pub async fn send_sms(&self, number: &str, text: &str) -> Result<CommandResponse> {
        self.reset().await?;
        self.set_sms_mode(1).await?;
        self.set_receiver(number).await?;
        self.set_text_message(text).await
    }

    /// Start a voice call (`ATD`).
    pub async fn dial(&self, number: &str) -> Result<CommandResponse> {
        self.run(commands::dial(number)).await
    }

    /// Hang up the current call (`ATH`).
    pub async fn hangup(&self) -> Result<CommandResponse> {
        self.run(commands::hangup()).await
    }

    /// Subscribe to modem events (incoming messages, unsolicited data).
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.engine.subscribe()
    }

    /// Shut down the engine and close the underlying transport.
    pub async fn close(self) {
        self.engine.shutdown();
        self.watcher.abort();
        let _ = self.engine_task.await;
    }
}

async fn read_indexed(engine: &EngineHandle, index: u32) -> Result<SmsMessage> {
    let cmd = commands::read_sms(index);
    let response = engine.submit(cmd.text, cmd.options).await?;
    Ok(SmsMessage {
        index: Some(index),
        sender: response.field("sender").unwrap_or_default().to_string(),
        date: response.field("date").unwrap_or_default().to_string(),
        time: response.field("time").unwrap_or_default().to_string(),
        text: response.field("text").unwrap_or_default().to_string(),
    })
}

/// React to `+CMTI` notifications by reading the announced message.
fn spawn_watcher(engine: EngineHandle) -> JoinHandle<()> {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ModemEvent::MessageWaiting { storage, index }) => {
                    debug!(storage = %storage, index, "reading announced message");
                    match read_indexed(&engine, index).await {
                        Ok(message) => engine.publish(ModemEvent::NewMessage(message)),
                        Err(e) => engine.publish(ModemEvent::Error(format!(
                            "failed to read announced message {index}: {e}"
                        ))),
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
