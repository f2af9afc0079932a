//! AT command builders and reply transforms.
//!
//! Each function returns the command text plus the [`CommandOptions`]
//! describing its reply contract: the pattern a successful reply must
//! match, and optionally a transform that extracts structured fields from
//! the reply lines. The dispatch engine does the rest.
//!
//! Transforms lean on the engine's notification parsing helpers
//! ([`notification_fields`]/[`unquote`]) so quoted commas inside reply
//! fields (dates, addresses) are handled uniformly.

use regex::Regex;

use atmodem_core::types::{FieldMap, Transform};
use atmodem_engine::protocol::{notification_fields, unquote};
use atmodem_engine::CommandOptions;

/// End-of-message marker for text-mode SMS bodies (Ctrl-Z).
pub const CTRL_Z: char = '\x1A';

/// One buildable AT command: text to send plus its reply contract.
pub struct AtCommand {
    /// The command text, without the trailing `\r` (the engine adds it).
    pub text: String,
    /// Expected pattern, transform, and timeout for the exchange.
    pub options: CommandOptions,
}

fn pattern(re: &str) -> Regex {
    // Patterns in this module are hard-coded literals; every builder is
    // exercised by the tests below.
    Regex::new(re).expect("hard-coded pattern")
}

fn simple(text: impl Into<String>, re: &str) -> AtCommand {
    AtCommand {
        text: text.into(),
        options: CommandOptions::expecting(pattern(re)),
    }
}

/// `ATZ`: reset the modem to its stored profile.
pub fn reset() -> AtCommand {
    simple("ATZ", "OK")
}

/// `AT+CMGF=<mode>`: select SMS mode (0 = PDU, 1 = text).
pub fn set_sms_mode(mode: u8) -> AtCommand {
    simple(format!("AT+CMGF={mode}"), "OK")
}

/// `AT&W`: save the current configuration to the modem's profile.
pub fn save_configuration() -> AtCommand {
    simple("AT&W", "OK")
}

/// `AT&V`: dump the active configuration profile.
pub fn current_configuration() -> AtCommand {
    simple("AT&V", "ACTIVE PROFILE")
}

/// `AT+CMEE=1`: report numeric `+CME ERROR` codes instead of bare `ERROR`.
pub fn activate_errors_codes() -> AtCommand {
    simple("AT+CMEE=1", "OK")
}

/// `AT+CSMP=49,167,0,0`: request SMS status reports in text mode.
pub fn activate_status_report() -> AtCommand {
    simple("AT+CSMP=49,167,0,0", "OK")
}

// Identity replies vary by vendor and may omit the final OK; accept any
// non-error frame (error lines are still rejected by the correlator
// before the pattern is consulted).
fn identity(text: &str) -> AtCommand {
    simple(text, r"[\s\S]+")
}

/// `ATI`: modem identification string.
pub fn id() -> AtCommand {
    identity("ATI")
}

/// `AT+CIMI`: the SIM's IMSI.
pub fn imsi() -> AtCommand {
    identity("AT+CIMI")
}

/// `AT+CGMM`: model identification.
pub fn model() -> AtCommand {
    identity("AT+CGMM")
}

/// `AT+CGMR`: firmware revision.
pub fn version() -> AtCommand {
    identity("AT+CGMR")
}

/// `AT+CGMI`: manufacturer identification.
pub fn manufacturer() -> AtCommand {
    identity("AT+CGMI")
}

/// `AT+CCLK?`: the modem's real-time clock, transformed to
/// `{date, time}`.
pub fn clock() -> AtCommand {
    AtCommand {
        text: "AT+CCLK?".into(),
        options: CommandOptions::expecting(pattern(r"\+CCLK")).with_transform(clock_transform()),
    }
}

/// `AT+CSQ`: signal quality, transformed to `{rssi, ber}`.
pub fn signal_strength() -> AtCommand {
    AtCommand {
        text: "AT+CSQ".into(),
        options: CommandOptions::expecting(pattern(r"\+CSQ")).with_transform(csq_transform()),
    }
}

/// `AT+CSCA?`: the SMS service center address, transformed to `{number}`.
pub fn sms_center() -> AtCommand {
    AtCommand {
        text: "AT+CSCA?".into(),
        options: CommandOptions::expecting(pattern(r"\+CSCA")).with_transform(csca_transform()),
    }
}

/// `AT+CREG?`: network registration, transformed to `{mode, status}`.
///
/// The transform rejects replies where the modem is not usable: status `2`
/// becomes "Searching for network", and any status other than `1`
/// (home) or `5` (roaming) becomes "Not registered on network".
pub fn check_gsm_network() -> AtCommand {
    AtCommand {
        text: "AT+CREG?".into(),
        options: CommandOptions::expecting(pattern(r"\+CREG")).with_transform(creg_transform()),
    }
}

/// `AT+CPIN?`: succeeds only when the SIM is unlocked and ready.
pub fn check_pin_code() -> AtCommand {
    simple("AT+CPIN?", r"\+CPIN: READY")
}

/// `AT+CPIN=<pin>`: present the SIM PIN.
pub fn set_pin_code(pin: &str) -> AtCommand {
    simple(format!("AT+CPIN={pin}"), "OK")
}

/// `AT+CLCK="SC",0,<pin>`: disable the SIM PIN lock.
pub fn unlock_sim_pin(pin: &str) -> AtCommand {
    simple(format!("AT+CLCK=\"SC\",0,\"{pin}\""), "OK")
}

/// `AT+CLCK="SC",1,<pin>`: enable the SIM PIN lock.
pub fn lock_sim_pin(pin: &str) -> AtCommand {
    simple(format!("AT+CLCK=\"SC\",1,\"{pin}\""), "OK")
}

/// `AT+CPWD="SC",<old>,<new>`: change the SIM PIN.
pub fn change_pin(current: &str, new: &str) -> AtCommand {
    simple(format!("AT+CPWD=\"SC\",\"{current}\",\"{new}\""), "OK")
}

/// `AT+CMGR=<index>`: read one stored message, transformed to
/// `{sender, date, time, text}`.
pub fn read_sms(index: u32) -> AtCommand {
    AtCommand {
        text: format!("AT+CMGR={index}"),
        options: CommandOptions::expecting(pattern(r"\+CMGR")).with_transform(cmgr_transform()),
    }
}

/// `AT+CMGL="ALL"`: list all stored messages.
pub fn list_sms() -> AtCommand {
    simple("AT+CMGL=\"ALL\"", "OK")
}

/// `AT+CMGD=<index>`: delete one stored message.
pub fn delete_sms(index: u32) -> AtCommand {
    simple(format!("AT+CMGD={index}"), "OK")
}

/// `AT+CMGD=1,4`: delete every stored message.
pub fn delete_all_sms() -> AtCommand {
    simple("AT+CMGD=1,4", "OK")
}

/// `AT+CNMI=2,1,0,2,0`: route new-message notifications (`+CMTI`) to the
/// serial link.
pub fn set_sms_received_listener() -> AtCommand {
    simple("AT+CNMI=2,1,0,2,0", "OK")
}

/// `AT+CMGS=<number>`: start a text-mode send; the modem answers with the
/// `>` prompt.
pub fn set_receiver(number: &str) -> AtCommand {
    simple(format!("AT+CMGS=\"{number}\""), ">")
}

/// The message body terminated with Ctrl-Z; the modem acknowledges with
/// `+CMGS: <ref>`.
pub fn set_text_message(text: &str) -> AtCommand {
    simple(format!("{text}{CTRL_Z}"), r"\+CMGS")
}

/// `ATD<number>;`: start a voice call.
pub fn dial(number: &str) -> AtCommand {
    simple(format!("ATD{number};"), "OK")
}

/// `ATH`: hang up the current call.
pub fn hangup() -> AtCommand {
    simple("ATH", "OK")
}

/// The line starting with `prefix`, or an error naming the missing prefix.
fn find_line<'a>(lines: &'a [String], prefix: &str) -> Result<&'a String, String> {
    lines
        .iter()
        .find(|line| line.starts_with(prefix))
        .ok_or_else(|| format!("missing {prefix} line in reply"))
}

fn csq_transform() -> Transform {
    Box::new(|lines| {
        let line = find_line(lines, "+CSQ")?;
        let fields = notification_fields(line);
        let rssi = fields
            .first()
            .filter(|f| !f.is_empty())
            .ok_or("missing rssi field")?;
        let ber = fields
            .get(1)
            .filter(|f| !f.is_empty())
            .ok_or("missing ber field")?;
        let mut out = FieldMap::new();
        out.insert("rssi".into(), rssi.clone());
        out.insert("ber".into(), ber.clone());
        Ok(out)
    })
}

fn clock_transform() -> Transform {
    Box::new(|lines| {
        let line = find_line(lines, "+CCLK")?;
        let fields = notification_fields(line);
        let stamp = fields.first().ok_or("missing clock field")?;
        let (date, time) = unquote(stamp)
            .split_once(',')
            .ok_or("malformed clock stamp")?;
        let mut out = FieldMap::new();
        out.insert("date".into(), date.to_string());
        out.insert("time".into(), time.to_string());
        Ok(out)
    })
}

fn csca_transform() -> Transform {
    Box::new(|lines| {
        let line = find_line(lines, "+CSCA")?;
        let fields = notification_fields(line);
        let number = fields.first().ok_or("missing service center number")?;
        let mut out = FieldMap::new();
        out.insert("number".into(), unquote(number).to_string());
        Ok(out)
    })
}

fn creg_transform() -> Transform {
    Box::new(|lines| {
        let line = find_line(lines, "+CREG")?;
        let fields = notification_fields(line);
        let mode = fields.first().ok_or("missing registration mode")?;
        let status = fields.get(1).ok_or("missing registration status")?;
        match status.as_str() {
            "1" | "5" => {
                let mut out = FieldMap::new();
                out.insert("mode".into(), mode.clone());
                out.insert("status".into(), status.clone());
                Ok(out)
            }
            "2" => Err("Searching for network".into()),
            _ => Err("Not registered on network".into()),
        }
    })
}

fn cmgr_transform() -> Transform {
    Box::new(|lines| {
        let header_at = lines
            .iter()
            .position(|line| line.starts_with("+CMGR"))
            .ok_or("missing +CMGR line in reply")?;
        let fields = notification_fields(&lines[header_at]);
        let sender = fields.get(1).ok_or("missing sender field")?;
        let stamp = fields.get(3).ok_or("missing timestamp field")?;
        let (date, time) = unquote(stamp)
            .split_once(',')
            .ok_or("malformed timestamp")?;

        // Everything between the header and the final OK is the body.
        let text = lines[header_at + 1..]
            .iter()
            .filter(|line| line.as_str() != "OK")
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let mut out = FieldMap::new();
        out.insert("sender".into(), unquote(sender).to_string());
        out.insert("date".into(), date.to_string());
        out.insert("time".into(), time.to_string());
        out.insert("text".into(), text);
        Ok(out)
    })
}
