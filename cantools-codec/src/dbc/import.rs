//! Import through the `can-dbc` parser
//!
//! Third-party DBC files often use constructs the line reader keeps as plain
//! text (attributes, value tables, multiplexing). `can-dbc` parses the full
//! grammar; its messages and signals are flattened into [`Signal`] records.

use crate::persist;
use crate::signals::{ByteOrder, Signal, ValueType, MAX_CAN_ID};
use crate::types::{CodecError, Result};
use std::path::Path;

fn convert_signal(message: &can_dbc::Message, dbc_sig: &can_dbc::Signal) -> Option<Signal> {
    let (Ok(start_bit), Ok(bit_length)) = (
        u16::try_from(*dbc_sig.start_bit()),
        u16::try_from(*dbc_sig.signal_size()),
    ) else {
        log::warn!(
            "Skipping signal '{}': layout {}|{} out of range",
            dbc_sig.name(),
            dbc_sig.start_bit(),
            dbc_sig.signal_size()
        );
        return None;
    };

    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };
    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    Some(Signal {
        message_name: message.message_name().to_string(),
        signal_name: dbc_sig.name().to_string(),
        // Bit 31 marks extended IDs in DBC files
        can_id: message.message_id().0 & MAX_CAN_ID,
        start_bit,
        bit_length,
        byte_order,
        value_type,
        scale: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        min: *dbc_sig.min(),
        max: *dbc_sig.max(),
        unit: dbc_sig.unit().to_string(),
    })
}

/// Flatten every message of a parsed DBC into signal records, in file order
pub fn signals_from_dbc(dbc: &can_dbc::DBC) -> Vec<Signal> {
    dbc.messages()
        .iter()
        .flat_map(|message| {
            message
                .signals()
                .iter()
                .filter_map(move |sig| convert_signal(message, sig))
        })
        .collect()
}

/// Read and parse a DBC file with `can-dbc`
pub fn import_dbc_file(path: &Path) -> Result<Vec<Signal>> {
    log::info!("Importing DBC file: {:?}", path);

    let text = persist::read_text(path)?;
    let dbc = can_dbc::DBC::try_from(text.as_str())
        .map_err(|e| CodecError::Import(format!("{:?}: {:?}", path, e)))?;

    let signals = signals_from_dbc(&dbc);
    log::info!(
        "Imported {} signals from {} messages",
        signals.len(),
        dbc.messages().len()
    );
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "VERSION \"\"\n\
\n\
NS_ :\n\
\n\
BS_:\n\
\n\
BU_: ECU\n\
\n\
BO_ 2147484240 Extended: 8 ECU\n \
SG_ Temp : 7|8@0- (0.5,-20) [-20|107.5] \"C\" Vector__XXX\n\
\n\
BO_ 256 Engine: 8 ECU\n \
SG_ Rpm : 0|16@1+ (0.25,0) [0|16383.75] \"rpm\" Vector__XXX\n \
SG_ Load : 16|8@1+ (1,0) [0|100] \"%\" Vector__XXX\n";

    #[test]
    fn test_signals_from_dbc() {
        let dbc = can_dbc::DBC::from_slice(SAMPLE.as_bytes()).unwrap();
        let signals = signals_from_dbc(&dbc);
        assert_eq!(signals.len(), 3);

        let temp = &signals[0];
        assert_eq!(temp.message_name, "Extended");
        assert_eq!(temp.can_id, 0x250);
        assert_eq!(temp.byte_order, ByteOrder::BigEndian);
        assert_eq!(temp.value_type, ValueType::Signed);
        assert_eq!(temp.offset, -20.0);

        let rpm = &signals[1];
        assert_eq!(rpm.can_id, 256);
        assert_eq!(rpm.bit_length, 16);
        assert_eq!(rpm.scale, 0.25);
        assert_eq!(rpm.unit, "rpm");
    }

    #[test]
    fn test_import_latin1_file() {
        let (head, tail) = SAMPLE.split_once("\"C\"").unwrap();
        let mut bytes = head.as_bytes().to_vec();
        bytes.extend_from_slice(b"\"\xB0C\"");
        bytes.extend_from_slice(tail.as_bytes());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), bytes).unwrap();

        let signals = import_dbc_file(file.path()).unwrap();
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].unit, "\u{B0}C");
    }

    #[test]
    fn test_import_missing_file() {
        let err = import_dbc_file(Path::new("/nonexistent/file.dbc")).unwrap_err();
        assert!(matches!(err, CodecError::IoError(_)));
    }
}
