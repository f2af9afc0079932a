//! Vendor error frame classification.
//!
//! GSM modems report failures as `+CME ERROR: <code>` (mobile equipment)
//! or `+CMS ERROR: <code>` (SMS service) frames. This module recognizes
//! those frames and maps the numeric codes to human-readable messages via
//! static lookup tables derived from 3GPP TS 27.007 / TS 27.005.
//!
//! Everything here is a pure function: no side effects, and the only
//! "failure" mode is a lookup miss, which falls back to a generic message.

use atmodem_core::error::ErrorClass;

/// Message returned when a code is not present in the lookup tables.
pub const UNRECOGNIZED: &str = "Unrecognized error code";

/// Recognize a vendor error frame and extract its class and code.
///
/// Returns `None` for anything that is not a `+CME ERROR:` / `+CMS ERROR:`
/// line. The code is kept as the raw string the modem sent; some modems
/// report verbose text instead of a number when `AT+CMEE=2` is active.
pub fn classify(line: &str) -> Option<(ErrorClass, String)> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("+CME ERROR:") {
        return Some((ErrorClass::Cme, rest.trim().to_string()));
    }
    if let Some(rest) = trimmed.strip_prefix("+CMS ERROR:") {
        return Some((ErrorClass::Cms, rest.trim().to_string()));
    }
    None
}

/// Look up the human-readable message for a classified error code.
///
/// Unknown codes fall back to [`UNRECOGNIZED`] rather than failing.
pub fn describe(class: ErrorClass, code: &str) -> &'static str {
    let table = match class {
        ErrorClass::Cme => CME_ERRORS,
        ErrorClass::Cms => CMS_ERRORS,
    };
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or(UNRECOGNIZED)
}

/// Mobile equipment error codes (3GPP TS 27.007 §9.2).
static CME_ERRORS: &[(&str, &str)] = &[
    ("0", "Phone failure"),
    ("1", "No connection to phone"),
    ("2", "Phone adaptor link reserved"),
    ("3", "Operation not allowed"),
    ("4", "Operation not supported"),
    ("5", "PH-SIM PIN required"),
    ("6", "PH-FSIM PIN required"),
    ("7", "PH-FSIM PUK required"),
    ("10", "SIM not inserted"),
    ("11", "SIM PIN required"),
    ("12", "SIM PUK required"),
    ("13", "SIM failure"),
    ("14", "SIM busy"),
    ("15", "SIM wrong"),
    ("16", "Incorrect password"),
    ("17", "SIM PIN2 required"),
    ("18", "SIM PUK2 required"),
    ("20", "Memory full"),
    ("21", "Invalid index"),
    ("22", "Not found"),
    ("23", "Memory failure"),
    ("24", "Text string too long"),
    ("25", "Invalid characters in text string"),
    ("26", "Dial string too long"),
    ("27", "Invalid characters in dial string"),
    ("30", "No network service"),
    ("31", "Network timeout"),
    ("32", "Network not allowed - emergency calls only"),
    ("40", "Network personalization PIN required"),
    ("41", "Network personalization PUK required"),
    ("42", "Network subset personalization PIN required"),
    ("43", "Network subset personalization PUK required"),
    ("44", "Service provider personalization PIN required"),
    ("45", "Service provider personalization PUK required"),
    ("46", "Corporate personalization PIN required"),
    ("47", "Corporate personalization PUK required"),
    ("100", "Unknown error"),
    ("103", "Illegal MS"),
    ("106", "Illegal ME"),
    ("107", "GPRS services not allowed"),
    ("111", "PLMN not allowed"),
    ("112", "Location area not allowed"),
    ("113", "Roaming not allowed in this location area"),
    ("132", "Service option not supported"),
    ("133", "Requested service option not subscribed"),
    ("134", "Service option temporarily out of order"),
    ("148", "Unspecified GPRS error"),
    ("149", "PDP authentication failure"),
    ("150", "Invalid mobile class"),
];

/// SMS service error codes (3GPP TS 27.005 §3.2.5, plus common vendor
/// extensions).
static CMS_ERRORS: &[(&str, &str)] = &[
    ("1", "Unassigned number"),
    ("8", "Operator determined barring"),
    ("10", "Call barred"),
    ("21", "Short message transfer rejected"),
    ("27", "Destination out of service"),
    ("28", "Unidentified subscriber"),
    ("29", "Facility rejected"),
    ("30", "Unknown subscriber"),
    ("38", "Network out of order"),
    ("41", "Temporary failure"),
    ("42", "Congestion"),
    ("47", "Resources unavailable"),
    ("50", "Requested facility not subscribed"),
    ("69", "Requested facility not implemented"),
    ("81", "Invalid short message transfer reference value"),
    ("95", "Invalid message, unspecified"),
    ("96", "Invalid mandatory information"),
    ("97", "Message type non-existent or not implemented"),
    ("98", "Message not compatible with short message protocol state"),
    ("99", "Information element non-existent or not implemented"),
    ("111", "Protocol error, unspecified"),
    ("127", "Interworking, unspecified"),
    ("128", "Telematic interworking not supported"),
    ("129", "Short message Type 0 not supported"),
    ("130", "Cannot replace short message"),
    ("143", "Unspecified TP-PID error"),
    ("144", "Data coding scheme (alphabet) not supported"),
    ("145", "Message class not supported"),
    ("159", "Unspecified TP-DCS error"),
    ("160", "Command cannot be actioned"),
    ("161", "Command unsupported"),
    ("175", "Unspecified TP-Command error"),
    ("176", "TPDU not supported"),
    ("192", "SC busy"),
    ("193", "No SC subscription"),
    ("194", "SC system failure"),
    ("195", "Invalid SME address"),
    ("196", "Destination SME barred"),
    ("197", "SM Rejected-Duplicate SM"),
    ("198", "TP-VPF not supported"),
    ("199", "TP-VP not supported"),
    ("208", "D0 SIM SMS storage full"),
    ("209", "No SMS storage capability in SIM"),
    ("210", "Error in MS"),
    ("211", "Memory capacity exceeded"),
    ("212", "SIM Application Toolkit busy"),
    ("213", "SIM data download error"),
    ("255", "Unspecified error cause"),
    ("300", "ME failure"),
    ("301", "SMS service of ME reserved"),
    ("302", "Operation not allowed"),
    ("303", "Operation not supported"),
    ("304", "Invalid PDU mode parameter"),
    ("305", "Invalid text mode parameter"),
    ("310", "SIM not inserted"),
    ("311", "SIM PIN required"),
    ("312", "PH-SIM PIN required"),
    ("313", "SIM failure"),
    ("314", "SIM busy"),
    ("315", "SIM wrong"),
    ("316", "SIM PUK required"),
    ("317", "SIM PIN2 required"),
    ("318", "SIM PUK2 required"),
    ("320", "Memory failure"),
    ("321", "Invalid memory index"),
    ("322", "Memory full"),
    ("330", "SMSC address unknown"),
    ("331", "No network service"),
    ("332", "Network timeout"),
    ("340", "No +CNMA acknowledgement expected"),
    ("500", "Unknown error"),
    ("538", "Invalid parameter"),
];
