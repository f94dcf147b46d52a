//! Subcommand handlers

use crate::config::{CliConfig, OutputFormat};
use crate::Command;
use anyhow::{bail, Context, Result};
use cantools_codec::codec::{decode_signal, frame_payload, MAX_PAYLOAD_LEN};
use cantools_codec::dbc::import_dbc_file;
use cantools_codec::signals::parse_can_id;
use cantools_codec::{encode_signal_value, Session, Signal, SignalField};
use serde::Serialize;
use std::path::Path;

/// Parse `FIELD=VALUE` for `--set`
pub fn parse_field_assignment(s: &str) -> std::result::Result<(SignalField, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
    let field = key.parse::<SignalField>()?;
    Ok((field, value.to_string()))
}

/// Parse `SIGNAL=VALUE` for `--value`
pub fn parse_value_assignment(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SIGNAL=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {}: {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

pub fn parse_can_id_arg(s: &str) -> std::result::Result<u32, String> {
    parse_can_id(s.trim()).ok_or_else(|| format!("invalid CAN ID '{}'", s))
}

/// Parse hex payload bytes, ignoring spaces, colons, commas and dashes
pub fn parse_hex_payload(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | ',' | '-'))
        .collect();
    if !digits.is_ascii() {
        bail!("payload '{}' is not hex", s);
    }
    if digits.len() % 2 != 0 {
        bail!("payload '{}' has an odd number of hex digits", s);
    }
    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect::<Result<Vec<u8>>>()?;
    if bytes.len() > MAX_PAYLOAD_LEN {
        bail!("payload has {} bytes, at most {} allowed", bytes.len(), MAX_PAYLOAD_LEN);
    }
    Ok(bytes)
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_session(config: &CliConfig, file: &Path) -> Result<Session> {
    let mut session = Session::new(config.codec.clone());
    session
        .load(file)
        .with_context(|| format!("Failed to load DBC file: {:?}", file))?;
    Ok(session)
}

/// Apply `--message` and `--set` to the session draft
///
/// Assignments are applied in validation order so that the bit length check
/// sees the new start bit.
fn apply_assignments(
    session: &mut Session,
    message: Option<&str>,
    assignments: &[(SignalField, String)],
) -> Result<()> {
    if let Some(message) = message {
        session.set_message_name(message)?;
    }
    for field in SignalField::ALL {
        for (_, value) in assignments.iter().filter(|(f, _)| *f == field) {
            session.validate_field(field, value)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SignalRow<'a> {
    index: usize,
    #[serde(flatten)]
    signal: &'a Signal,
}

fn list(session: &Session, format: OutputFormat) -> Result<()> {
    let store = session.store();
    if format == OutputFormat::Json {
        let rows: Vec<_> = store
            .iter()
            .enumerate()
            .map(|(index, signal)| SignalRow { index, signal })
            .collect();
        return print_json(&rows);
    }

    if let Some(info) = &session.document().vehicle_info {
        println!("Vehicle: {}", info);
    }
    let stats = store.stats();
    println!(
        "{} signals in {} messages (limit {}, sorted by {})",
        stats.num_signals,
        stats.num_messages,
        stats.capacity,
        session.sort_mode().label()
    );
    for (index, signal) in store.iter().enumerate() {
        println!(
            "{:>3}  0x{:<8X} {:<24} {}",
            index,
            signal.can_id,
            signal.signal_name,
            signal.message_label()
        );
    }
    Ok(())
}

fn show(session: &Session, index: usize, format: OutputFormat) -> Result<()> {
    let signal = session.store().get(index).with_context(|| {
        format!("No signal at index {} ({} signals)", index, session.store().len())
    })?;
    if format == OutputFormat::Json {
        return print_json(signal);
    }
    println!("{}", signal);
    Ok(())
}

fn decode(
    session: &Session,
    can_id: u32,
    data: &str,
    dlc: Option<u8>,
    format: OutputFormat,
) -> Result<()> {
    let bytes = parse_hex_payload(data)?;
    let dlc = dlc.unwrap_or(bytes.len() as u8);
    let payload = frame_payload(&bytes, dlc);

    if format == OutputFormat::Json {
        return print_json(&session.decode_frame_detailed(can_id, payload));
    }

    println!("ID: 0x{:X}  DLC: {}  Data: {}", can_id, payload.len(), format_hex(payload));
    let mut matched = false;
    for signal in session.store().matching(can_id) {
        matched = true;
        match decode_signal(signal, payload) {
            Ok(decoded) => println!("{}", decoded),
            Err(e) => {
                log::debug!("{}: {}", signal.signal_name, e);
                println!("{}: decode error", signal.signal_name);
            }
        }
    }
    if !matched {
        println!("No signals for this ID");
    }
    Ok(())
}

fn encode(
    session: &Session,
    can_id: u32,
    values: &[(String, f64)],
    data: Option<&str>,
    dlc: u8,
) -> Result<()> {
    let len = usize::from(dlc).min(MAX_PAYLOAD_LEN);
    let mut payload = match data {
        Some(hex) => parse_hex_payload(hex)?,
        None => Vec::new(),
    };
    payload.resize(len, 0);

    for (name, value) in values {
        let signal = session
            .store()
            .matching(can_id)
            .find(|s| &s.signal_name == name)
            .with_context(|| format!("No signal '{}' with CAN ID 0x{:X}", name, can_id))?;
        let raw = encode_signal_value(signal, *value, &mut payload)
            .with_context(|| format!("Cannot encode {} = {}", name, value))?;
        log::info!("{} = {} (raw {})", name, value, raw);
    }

    println!("{}", format_hex(&payload));
    Ok(())
}

/// Run one subcommand
pub(crate) fn run(command: Command, config: &CliConfig) -> Result<()> {
    let format = config.output.format;

    match command {
        Command::Create { name, vehicle } => {
            let mut session = Session::new(config.codec.clone());
            let path = session
                .create_file(&name, &vehicle)
                .with_context(|| format!("Failed to create DBC file '{}'", name))?;
            println!("Created {}", path.display());
        }
        Command::List { file } => {
            let session = open_session(config, &file)?;
            list(&session, format)?;
        }
        Command::Show { file, index } => {
            let session = open_session(config, &file)?;
            show(&session, index, format)?;
        }
        Command::Add {
            file,
            defaults,
            message,
            set,
            dry_run,
        } => {
            let mut session = open_session(config, &file)?;
            if defaults {
                session.reset_defaults();
            } else {
                session.reset_draft();
            }
            apply_assignments(&mut session, message.as_deref(), &set)?;
            if dry_run {
                println!("{}", session.draft_preview());
                return Ok(());
            }
            session.commit_signal()?;
            if let Some(index) = session.selected() {
                println!("Saved signal at index {}", index);
            }
        }
        Command::Edit {
            file,
            index,
            message,
            set,
        } => {
            let mut session = open_session(config, &file)?;
            session.begin_edit(index)?;
            apply_assignments(&mut session, message.as_deref(), &set)?;
            session.commit_signal()?;
            if let Some(index) = session.selected() {
                println!("Saved signal at index {}", index);
            }
        }
        Command::Delete { file, index } => {
            let mut session = open_session(config, &file)?;
            let removed = session.delete_signal(index)?;
            println!("Deleted {}", removed.signal_name);
        }
        Command::Decode {
            file,
            can_id,
            data,
            dlc,
        } => {
            let session = open_session(config, &file)?;
            decode(&session, can_id, &data, dlc, format)?;
        }
        Command::Encode {
            file,
            can_id,
            values,
            data,
            dlc,
        } => {
            let session = open_session(config, &file)?;
            encode(&session, can_id, &values, data.as_deref(), dlc)?;
        }
        Command::Import { source, file } => {
            let signals = import_dbc_file(&source)
                .with_context(|| format!("Failed to import {:?}", source))?;
            let total = signals.len();
            let mut session = open_session(config, &file)?;
            let added = session.import_signals(signals)?;
            println!("Imported {} of {} signals into {}", added, total, file.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_assignment() {
        assert_eq!(
            parse_field_assignment("can-id=0x257"),
            Ok((SignalField::CanId, "0x257".to_string()))
        );
        assert_eq!(
            parse_field_assignment("unit="),
            Ok((SignalField::Unit, String::new()))
        );
        assert!(parse_field_assignment("scale").is_err());
        assert!(parse_field_assignment("colour=red").is_err());
    }

    #[test]
    fn test_parse_value_assignment() {
        assert_eq!(
            parse_value_assignment("Speed=-16.72"),
            Ok(("Speed".to_string(), -16.72))
        );
        assert!(parse_value_assignment("Speed=fast").is_err());
    }

    #[test]
    fn test_parse_hex_payload() {
        assert_eq!(parse_hex_payload("00 30 12").unwrap(), vec![0x00, 0x30, 0x12]);
        assert_eq!(parse_hex_payload("0a:FF").unwrap(), vec![0x0A, 0xFF]);
        assert!(parse_hex_payload("").unwrap().is_empty());
        assert!(parse_hex_payload("123").is_err());
        assert!(parse_hex_payload("zz").is_err());
        assert!(parse_hex_payload("000000000000000000").is_err());
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x00, 0xAB, 0x05]), "00 AB 05");
    }
}
