//! Committed signal definitions
//!
//! A [`Signal`] is the typed form of one `SG_` entry. Drafts are converted into
//! signals once every field validates, and the DBC reader builds them directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest CAN ID accepted from user input (29-bit extended frame)
pub const MAX_CAN_ID: u32 = 0x1FFF_FFFF;

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Little-endian (Intel format), `@1` in DBC text
    LittleEndian,
    /// Big-endian (Motorola format), `@0` in DBC text
    BigEndian,
}

impl ByteOrder {
    /// Classify free text by its first character.
    ///
    /// Accepts `0`/`b`/`B`/`m`/`M` for big-endian and `1`/`l`/`L`/`i`/`I` for
    /// little-endian. Anything else (including empty text) is rejected.
    pub fn from_text(text: &str) -> Option<Self> {
        match text.chars().next()? {
            '0' | 'b' | 'B' | 'm' | 'M' => Some(ByteOrder::BigEndian),
            '1' | 'l' | 'L' | 'i' | 'I' => Some(ByteOrder::LittleEndian),
            _ => None,
        }
    }

    /// Character used after `@` in an `SG_` line
    pub fn dbc_char(self) -> char {
        match self {
            ByteOrder::LittleEndian => '1',
            ByteOrder::BigEndian => '0',
        }
    }

    pub fn is_big_endian(self) -> bool {
        self == ByteOrder::BigEndian
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "Little-endian (Intel)"),
            ByteOrder::BigEndian => write!(f, "Big-endian (Motorola)"),
        }
    }
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Unsigned integer, `+` in DBC text
    Unsigned,
    /// Two's-complement signed integer, `-` in DBC text
    Signed,
}

impl ValueType {
    /// Classify free text by its first character.
    ///
    /// `s`/`S`/`-`/`1` mean signed, `u`/`U`/`+`/`0` mean unsigned.
    pub fn from_text(text: &str) -> Option<Self> {
        match text.chars().next()? {
            's' | 'S' | '-' | '1' => Some(ValueType::Signed),
            'u' | 'U' | '+' | '0' => Some(ValueType::Unsigned),
            _ => None,
        }
    }

    /// Character following the byte order in an `SG_` line
    pub fn dbc_char(self) -> char {
        match self {
            ValueType::Signed => '-',
            ValueType::Unsigned => '+',
        }
    }

    pub fn is_signed(self) -> bool {
        self == ValueType::Signed
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Signed => write!(f, "Signed"),
            ValueType::Unsigned => write!(f, "Unsigned"),
        }
    }
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Owning message name (blank falls back to the signal name)
    pub message_name: String,
    /// Signal name
    pub signal_name: String,
    /// CAN ID of the owning message
    pub can_id: u32,
    /// Start bit in the CAN frame
    ///
    /// Wider than the 0..63 range so that values read from a malformed file
    /// survive loading and fail at decode time instead.
    pub start_bit: u16,
    /// Length in bits
    pub bit_length: u16,
    /// Byte order
    pub byte_order: ByteOrder,
    /// Signed or unsigned raw value
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub scale: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value (informational)
    pub min: f64,
    /// Maximum physical value (informational)
    pub max: f64,
    /// Engineering unit (e.g., "kph", "V"), may be empty
    pub unit: String,
}

impl Signal {
    /// Create an 8-bit little-endian unsigned signal at bit 0 with identity scaling
    pub fn new(signal_name: impl Into<String>, can_id: u32) -> Self {
        Self {
            message_name: String::new(),
            signal_name: signal_name.into(),
            can_id,
            start_bit: 0,
            bit_length: 8,
            byte_order: ByteOrder::LittleEndian,
            value_type: ValueType::Unsigned,
            scale: 1.0,
            offset: 0.0,
            min: 0.0,
            max: 0.0,
            unit: String::new(),
        }
    }

    /// Builder method: set the owning message name
    pub fn with_message(mut self, message_name: impl Into<String>) -> Self {
        self.message_name = message_name.into();
        self
    }

    /// Builder method: set start bit, length and byte order
    pub fn with_layout(mut self, start_bit: u16, bit_length: u16, byte_order: ByteOrder) -> Self {
        self.start_bit = start_bit;
        self.bit_length = bit_length;
        self.byte_order = byte_order;
        self
    }

    /// Builder method: set the value type
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Builder method: set scale and offset
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Builder method: set the informational physical range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Builder method: set the unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Name of the message this signal is grouped under
    pub fn message_label(&self) -> &str {
        if self.message_name.is_empty() {
            &self.signal_name
        } else {
            &self.message_name
        }
    }

    /// True when the layout satisfies the committed-signal ranges
    pub fn has_valid_layout(&self) -> bool {
        self.start_bit <= 63
            && (1..=64).contains(&self.bit_length)
            && self.start_bit + self.bit_length <= 64
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Message: {}", self.message_label())?;
        writeln!(f, "Signal: {}", self.signal_name)?;
        writeln!(f, "CAN ID: 0x{:X}", self.can_id)?;
        writeln!(f, "Start bit: {}", self.start_bit)?;
        writeln!(f, "Bit length: {}", self.bit_length)?;
        writeln!(f, "Byte order: {}", self.byte_order)?;
        writeln!(f, "Sign: {}", self.value_type)?;
        writeln!(f, "Scale: {}", self.scale)?;
        writeln!(f, "Offset: {}", self.offset)?;
        writeln!(f, "Min: {}", self.min)?;
        writeln!(f, "Max: {}", self.max)?;
        write!(f, "Unit: {}", self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_from_text() {
        for text in ["0", "b", "Big", "m", "Motorola"] {
            assert_eq!(ByteOrder::from_text(text), Some(ByteOrder::BigEndian), "{text}");
        }
        for text in ["1", "l", "Little", "i", "Intel"] {
            assert_eq!(ByteOrder::from_text(text), Some(ByteOrder::LittleEndian), "{text}");
        }
        assert_eq!(ByteOrder::from_text(""), None);
        assert_eq!(ByteOrder::from_text("x"), None);
    }

    #[test]
    fn test_value_type_from_text() {
        for text in ["s", "Signed", "-", "1"] {
            assert_eq!(ValueType::from_text(text), Some(ValueType::Signed), "{text}");
        }
        for text in ["u", "Unsigned", "+", "0"] {
            assert_eq!(ValueType::from_text(text), Some(ValueType::Unsigned), "{text}");
        }
        assert_eq!(ValueType::from_text("?"), None);
    }

    #[test]
    fn test_message_label_fallback() {
        let sig = Signal::new("EngineSpeed", 0x100);
        assert_eq!(sig.message_label(), "EngineSpeed");

        let sig = sig.with_message("EngineData");
        assert_eq!(sig.message_label(), "EngineData");
    }

    #[test]
    fn test_layout_validity() {
        let sig = Signal::new("A", 1).with_layout(56, 8, ByteOrder::LittleEndian);
        assert!(sig.has_valid_layout());

        let sig = Signal::new("A", 1).with_layout(60, 8, ByteOrder::LittleEndian);
        assert!(!sig.has_valid_layout());

        let sig = Signal::new("A", 1).with_layout(0, 0, ByteOrder::LittleEndian);
        assert!(!sig.has_valid_layout());
    }
}
