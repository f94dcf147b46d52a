//! DBC serializer
//!
//! Signals are grouped by `(can_id, message name)` and each group is written
//! once, as a `BO_` line followed by its `SG_` lines, in order of first
//! appearance in the store.

use super::{DbcDocument, DEFAULT_MESSAGE_NAME, VEHICLE_PREFIX};
use crate::signals::{parse_can_id, ByteOrder, Signal, SignalDraft, ValueType};
use std::io::{self, Write};

/// `BO_ <id> <name>: 8 VehicleBus`
pub fn format_bo_line(can_id: u32, message_name: &str) -> String {
    let name = if message_name.is_empty() {
        DEFAULT_MESSAGE_NAME
    } else {
        message_name
    };
    format!("BO_ {} {}: 8 VehicleBus", can_id, name)
}

fn sg_line(
    name: &str,
    start_bit: &str,
    bit_length: &str,
    endian: char,
    sign: char,
    scaling: [&str; 4],
    unit: &str,
) -> String {
    let [scale, offset, min, max] = scaling;
    format!(
        " SG_ {} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\"  Receiver",
        name, start_bit, bit_length, endian, sign, scale, offset, min, max, unit
    )
}

/// One ` SG_` line for a committed signal
///
/// Numbers use the shortest text that parses back to the same value.
pub fn format_sg_line(signal: &Signal) -> String {
    sg_line(
        &signal.signal_name,
        &signal.start_bit.to_string(),
        &signal.bit_length.to_string(),
        signal.byte_order.dbc_char(),
        signal.value_type.dbc_char(),
        [
            &signal.scale.to_string(),
            &signal.offset.to_string(),
            &signal.min.to_string(),
            &signal.max.to_string(),
        ],
        &signal.unit,
    )
}

fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.is_empty() {
        default
    } else {
        text
    }
}

/// Preview of the `BO_`/`SG_` pair a draft would produce
///
/// Works on partially filled drafts: blank fields fall back to their
/// defaults and unparsable byte order or sign text writes big-endian/unsigned.
pub fn format_draft_entry(draft: &SignalDraft) -> String {
    let signal_name = or_default(&draft.signal_name, "Signal");
    let message_name = or_default(&draft.message_name, signal_name);
    let can_id = parse_can_id(&draft.can_id).unwrap_or(0);

    let endian = ByteOrder::from_text(&draft.byte_order)
        .unwrap_or(ByteOrder::BigEndian)
        .dbc_char();
    let sign = ValueType::from_text(&draft.sign)
        .unwrap_or(ValueType::Unsigned)
        .dbc_char();

    let bo = format_bo_line(can_id, message_name);
    let sg = sg_line(
        signal_name,
        or_default(&draft.start_bit, "0"),
        or_default(&draft.bit_length, "8"),
        endian,
        sign,
        [
            or_default(&draft.scale, "1"),
            or_default(&draft.offset, "0"),
            or_default(&draft.min, "0"),
            or_default(&draft.max, "0"),
        ],
        &draft.unit,
    );
    format!("{}\n{}", bo, sg)
}

/// Write a whole document: header, vehicle comment, then message groups
pub fn write_document<W: Write>(out: &mut W, document: &DbcDocument) -> io::Result<()> {
    if !document.header.is_empty() {
        out.write_all(document.header.as_bytes())?;
        if !document.header.ends_with('\n') {
            out.write_all(b"\n")?;
        }
    }

    if let Some(info) = document.vehicle_info.as_deref().filter(|i| !i.is_empty()) {
        writeln!(out, "{}{}\";", VEHICLE_PREFIX, info)?;
    }

    for group in document.store.messages() {
        writeln!(out, "{}", format_bo_line(group.can_id, group.name))?;
        for signal in group.signals {
            writeln!(out, "{}", format_sg_line(signal))?;
        }
    }

    Ok(())
}

/// Render a document to a string
pub fn render_document(document: &DbcDocument) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_document(&mut buf, document);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::DEFAULT_HEADER;

    fn speed() -> Signal {
        Signal::new("DI_vehicleSpeed", 0x257)
            .with_message("DI_speed")
            .with_layout(12, 12, ByteOrder::LittleEndian)
            .with_scaling(0.08, -40.0)
            .with_range(-40.0, 285.0)
            .with_unit("kph")
    }

    #[test]
    fn test_format_lines() {
        assert_eq!(format_bo_line(599, "DI_speed"), "BO_ 599 DI_speed: 8 VehicleBus");
        assert_eq!(format_bo_line(1, ""), "BO_ 1 Message: 8 VehicleBus");
        assert_eq!(
            format_sg_line(&speed()),
            " SG_ DI_vehicleSpeed : 12|12@1+ (0.08,-40) [-40|285] \"kph\"  Receiver"
        );

        let signed = Signal::new("T", 1)
            .with_layout(7, 8, ByteOrder::BigEndian)
            .with_value_type(ValueType::Signed);
        assert_eq!(
            format_sg_line(&signed),
            " SG_ T : 7|8@0- (1,0) [0|0] \"\"  Receiver"
        );
    }

    #[test]
    fn test_draft_preview_defaults() {
        let mut draft = SignalDraft::new();
        draft.can_id = "0x10".to_string();
        assert_eq!(
            format_draft_entry(&draft),
            "BO_ 16 Signal: 8 VehicleBus\n SG_ Signal : 0|8@0+ (1,0) [0|0] \"\"  Receiver"
        );

        let preview = format_draft_entry(&SignalDraft::with_defaults());
        assert!(preview.starts_with("BO_ 599 DI_vehicleSpeed: 8 VehicleBus\n"));
        assert!(preview.contains("12|12@1+ (0.08,-40) [-40|285] \"kph\""));
    }

    #[test]
    fn test_document_groups_written_once() {
        let mut doc = DbcDocument::new(8)
            .with_header(DEFAULT_HEADER)
            .with_vehicle_info("Tesla Model 3 2021");
        doc.store.add(speed()).unwrap();
        doc.store.add(Signal::new("Rpm", 0x100)).unwrap();
        doc.store
            .add(Signal::new("Gear", 0x257).with_message("DI_speed"))
            .unwrap();

        let text = render_document(&doc);
        assert!(text.starts_with(DEFAULT_HEADER));
        assert!(text.contains("CM_ \"Vehicle: Tesla Model 3 2021\";\n"));
        assert_eq!(text.matches("BO_ 599 DI_speed").count(), 1);

        let lines: Vec<&str> = text.lines().skip_while(|l| !l.starts_with("BO_")).collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with(" SG_ DI_vehicleSpeed"));
        assert!(lines[2].starts_with(" SG_ Gear"));
        assert_eq!(lines[3], "BO_ 256 Rpm: 8 VehicleBus");
    }

    #[test]
    fn test_header_gets_final_newline() {
        let doc = DbcDocument::new(8).with_header("VERSION \"\"");
        assert_eq!(render_document(&doc), "VERSION \"\"\n");
    }
}
