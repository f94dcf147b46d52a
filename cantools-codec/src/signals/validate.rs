//! Field validation and the editable signal draft
//!
//! The draft holds one text value per field, exactly as typed. Each field has a
//! validator that runs when the value is entered and again, in a fixed order,
//! before the draft is committed to the store.

use crate::signals::signal::{ByteOrder, Signal, ValueType, MAX_CAN_ID};
use crate::types::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Character typed in place of `.` by input widgets without a decimal point
pub const DECIMAL_PLACEHOLDER: char = '_';

/// Fields of the signal draft
///
/// `ALL` holds the eleven entered one by one, in validation order. The message
/// name is optional and set on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalField {
    MessageName,
    SignalName,
    CanId,
    StartBit,
    BitLength,
    ByteOrder,
    Sign,
    Offset,
    Scale,
    Unit,
    Min,
    Max,
}

impl SignalField {
    /// All fields in the order `validate_all` checks them
    pub const ALL: [SignalField; 11] = [
        SignalField::SignalName,
        SignalField::CanId,
        SignalField::StartBit,
        SignalField::BitLength,
        SignalField::ByteOrder,
        SignalField::Sign,
        SignalField::Offset,
        SignalField::Scale,
        SignalField::Unit,
        SignalField::Min,
        SignalField::Max,
    ];

    /// Short label used in menus and error messages
    pub fn label(self) -> &'static str {
        match self {
            SignalField::MessageName => "Message name",
            SignalField::SignalName => "Signal name",
            SignalField::CanId => "CAN ID",
            SignalField::StartBit => "Start bit",
            SignalField::BitLength => "Bit length",
            SignalField::ByteOrder => "Byte order",
            SignalField::Sign => "Sign",
            SignalField::Offset => "Offset",
            SignalField::Scale => "Scale",
            SignalField::Unit => "Unit",
            SignalField::Min => "Min",
            SignalField::Max => "Max",
        }
    }

    /// Prompt shown when asking for the field's value
    pub fn prompt(self) -> &'static str {
        match self {
            SignalField::MessageName => "Message name:",
            SignalField::SignalName => "Signal name:",
            SignalField::CanId => "CAN ID (dec/0x):",
            SignalField::StartBit => "Start bit (0-63):",
            SignalField::BitLength => "Bit length (1-64):",
            SignalField::ByteOrder => "Byte order (0=BE/1=LE):",
            SignalField::Sign => "Signed? (s/u):",
            SignalField::Offset => "Offset (use '_' for .):",
            SignalField::Scale => "Scale (use '_' for .):",
            SignalField::Unit => "Unit (e.g. kph):",
            SignalField::Min => "Min (use '_' for .):",
            SignalField::Max => "Max (use '_' for .):",
        }
    }

    /// Key used on the command line (`can-id`, `start-bit`, ...)
    pub fn key(self) -> &'static str {
        match self {
            SignalField::MessageName => "message",
            SignalField::SignalName => "name",
            SignalField::CanId => "can-id",
            SignalField::StartBit => "start-bit",
            SignalField::BitLength => "bit-length",
            SignalField::ByteOrder => "byte-order",
            SignalField::Sign => "sign",
            SignalField::Offset => "offset",
            SignalField::Scale => "scale",
            SignalField::Unit => "unit",
            SignalField::Min => "min",
            SignalField::Max => "max",
        }
    }

    /// True for offset, scale, min and max
    pub fn is_decimal(self) -> bool {
        matches!(
            self,
            SignalField::Offset | SignalField::Scale | SignalField::Min | SignalField::Max
        )
    }
}

impl fmt::Display for SignalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SignalField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        SignalField::ALL
            .into_iter()
            .find(|field| field.key() == wanted)
            .ok_or_else(|| format!("unknown signal field '{}'", s))
    }
}

/// Replace the decimal placeholder with `.`
pub fn decimal_substitute(text: &str) -> String {
    text.replace(DECIMAL_PLACEHOLDER, ".")
}

/// Parse a CAN ID written in decimal or with a `0x` prefix
pub fn parse_can_id(text: &str) -> Option<u32> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => text.parse::<u64>().ok()?,
    };
    u32::try_from(value).ok()
}

fn parse_int(text: &str) -> Option<i32> {
    text.parse::<i32>().ok()
}

/// Parse an optional decimal field, accepting the placeholder for `.`
///
/// Infinities and NaN are rejected: they cannot be written back to a DBC file.
pub fn parse_decimal(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    decimal_substitute(text)
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn required(field: SignalField, text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

/// Names end at whitespace or `:` when a DBC file is read back
fn dbc_name(field: SignalField, text: &str) -> Result<(), ValidationError> {
    if text.chars().any(|c| c.is_whitespace() || c == ':' || c == '"') {
        return Err(ValidationError::new(field, "no spaces, ':' or '\"' allowed"));
    }
    Ok(())
}

/// Quoted DBC text cannot hold `"` or a line break
fn dbc_text(field: SignalField, text: &str) -> Result<(), ValidationError> {
    if text.chars().any(|c| c == '"' || c == '\r' || c == '\n') {
        return Err(ValidationError::new(field, "no '\"' or line breaks allowed"));
    }
    Ok(())
}

/// Validate the text of one field.
///
/// `start_bit` is the draft's current start bit text; the bit length rule
/// only checks the combined span when it parses.
pub fn validate_field_text(
    field: SignalField,
    text: &str,
    start_bit: &str,
) -> Result<(), ValidationError> {
    match field {
        SignalField::MessageName => dbc_name(field, text),
        SignalField::SignalName => {
            required(field, text)?;
            dbc_name(field, text)
        }
        SignalField::CanId => {
            required(field, text)?;
            match parse_can_id(text) {
                Some(id) if id <= MAX_CAN_ID => Ok(()),
                _ => Err(ValidationError::new(field, "must be 0x0..0x1FFFFFFF")),
            }
        }
        SignalField::StartBit => {
            required(field, text)?;
            match parse_int(text) {
                Some(bit) if (0..=63).contains(&bit) => Ok(()),
                _ => Err(ValidationError::new(field, "must be 0..63")),
            }
        }
        SignalField::BitLength => {
            required(field, text)?;
            let length = match parse_int(text) {
                Some(length) if (1..=64).contains(&length) => length,
                _ => return Err(ValidationError::new(field, "must be 1..64")),
            };
            if let Some(start) = parse_int(start_bit) {
                if i64::from(start) + i64::from(length) > 64 {
                    return Err(ValidationError::new(field, "start bit + length must be <= 64"));
                }
            }
            Ok(())
        }
        SignalField::ByteOrder => {
            required(field, text)?;
            ByteOrder::from_text(text)
                .map(|_| ())
                .ok_or_else(|| ValidationError::new(field, "use 0/1, b/l (big/little)"))
        }
        SignalField::Sign => {
            required(field, text)?;
            ValueType::from_text(text)
                .map(|_| ())
                .ok_or_else(|| ValidationError::new(field, "use s/u or +/-"))
        }
        SignalField::Offset | SignalField::Scale | SignalField::Min | SignalField::Max => {
            if text.is_empty() || parse_decimal(text).is_some() {
                Ok(())
            } else {
                Err(ValidationError::new(field, "enter a valid number"))
            }
        }
        SignalField::Unit => dbc_text(field, text),
    }
}

/// The transient "current edit" record
///
/// Every field is kept as entered so that a rejected value never destroys
/// what was there before, and so the draft can be shown back to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalDraft {
    pub message_name: String,
    pub signal_name: String,
    pub can_id: String,
    pub start_bit: String,
    pub bit_length: String,
    pub byte_order: String,
    pub sign: String,
    pub offset: String,
    pub scale: String,
    pub unit: String,
    pub min: String,
    pub max: String,
}

impl SignalDraft {
    /// Blank draft
    pub fn new() -> Self {
        Self::default()
    }

    /// The example vehicle speed signal offered by "Reset defaults"
    ///
    /// The message name stays blank so a committed copy is grouped under its
    /// own signal name.
    pub fn with_defaults() -> Self {
        let mut draft = Self {
            signal_name: "DI_vehicleSpeed".to_string(),
            can_id: "0x257".to_string(),
            start_bit: "12".to_string(),
            bit_length: "12".to_string(),
            byte_order: "1".to_string(),
            sign: "u".to_string(),
            offset: "-40".to_string(),
            scale: "0_08".to_string(),
            unit: "kph".to_string(),
            min: "-40".to_string(),
            max: "285".to_string(),
            ..Self::default()
        };
        draft.normalize_decimals();
        draft
    }

    /// Populate a draft from a stored signal, for editing
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            message_name: signal.message_name.clone(),
            signal_name: signal.signal_name.clone(),
            can_id: format!("0x{:X}", signal.can_id),
            start_bit: signal.start_bit.to_string(),
            bit_length: signal.bit_length.to_string(),
            byte_order: signal.byte_order.dbc_char().to_string(),
            sign: match signal.value_type {
                ValueType::Signed => "s".to_string(),
                ValueType::Unsigned => "u".to_string(),
            },
            offset: signal.offset.to_string(),
            scale: signal.scale.to_string(),
            unit: signal.unit.clone(),
            min: signal.min.to_string(),
            max: signal.max.to_string(),
        }
    }

    /// Current text of a field
    pub fn get(&self, field: SignalField) -> &str {
        match field {
            SignalField::MessageName => &self.message_name,
            SignalField::SignalName => &self.signal_name,
            SignalField::CanId => &self.can_id,
            SignalField::StartBit => &self.start_bit,
            SignalField::BitLength => &self.bit_length,
            SignalField::ByteOrder => &self.byte_order,
            SignalField::Sign => &self.sign,
            SignalField::Offset => &self.offset,
            SignalField::Scale => &self.scale,
            SignalField::Unit => &self.unit,
            SignalField::Min => &self.min,
            SignalField::Max => &self.max,
        }
    }

    /// Overwrite a field without validating it
    pub fn set(&mut self, field: SignalField, text: impl Into<String>) {
        let text = text.into();
        match field {
            SignalField::MessageName => self.message_name = text,
            SignalField::SignalName => self.signal_name = text,
            SignalField::CanId => self.can_id = text,
            SignalField::StartBit => self.start_bit = text,
            SignalField::BitLength => self.bit_length = text,
            SignalField::ByteOrder => self.byte_order = text,
            SignalField::Sign => self.sign = text,
            SignalField::Offset => self.offset = text,
            SignalField::Scale => self.scale = text,
            SignalField::Unit => self.unit = text,
            SignalField::Min => self.min = text,
            SignalField::Max => self.max = text,
        }
    }

    /// Validate candidate text for a field against this draft
    pub fn check(&self, field: SignalField, text: &str) -> Result<(), ValidationError> {
        validate_field_text(field, text, &self.start_bit)
    }

    /// Validate candidate text and store it (normalized) when it passes
    pub fn accept(&mut self, field: SignalField, text: &str) -> Result<(), ValidationError> {
        self.check(field, text)?;
        if field.is_decimal() {
            self.set(field, decimal_substitute(text));
        } else {
            self.set(field, text);
        }
        Ok(())
    }

    /// Run every validator in order and report the first failure
    ///
    /// The message name is checked after the eleven entered fields.
    pub fn validate_all(&self) -> Result<(), ValidationError> {
        for field in SignalField::ALL {
            self.check(field, self.get(field))?;
        }
        self.check(SignalField::MessageName, &self.message_name)
    }

    /// Replace the decimal placeholder in offset, scale, min and max
    pub fn normalize_decimals(&mut self) {
        for field in SignalField::ALL.into_iter().filter(|f| f.is_decimal()) {
            let normalized = decimal_substitute(self.get(field));
            self.set(field, normalized);
        }
    }

    /// Convert a fully valid draft into a committed signal
    ///
    /// Empty optional numbers take their defaults (scale 1, everything else 0)
    /// and a blank message name falls back to the signal name.
    pub fn to_signal(&self) -> Result<Signal, ValidationError> {
        self.validate_all()?;

        // validate_all guarantees every required field parses
        let invalid = |field: SignalField| ValidationError::new(field, "invalid value");
        let can_id = parse_can_id(&self.can_id).ok_or_else(|| invalid(SignalField::CanId))?;
        let start_bit = self
            .start_bit
            .parse::<u16>()
            .map_err(|_| invalid(SignalField::StartBit))?;
        let bit_length = self
            .bit_length
            .parse::<u16>()
            .map_err(|_| invalid(SignalField::BitLength))?;
        let byte_order =
            ByteOrder::from_text(&self.byte_order).ok_or_else(|| invalid(SignalField::ByteOrder))?;
        let value_type = ValueType::from_text(&self.sign).ok_or_else(|| invalid(SignalField::Sign))?;

        let message_name = if self.message_name.is_empty() {
            self.signal_name.clone()
        } else {
            self.message_name.clone()
        };

        Ok(Signal {
            message_name,
            signal_name: self.signal_name.clone(),
            can_id,
            start_bit,
            bit_length,
            byte_order,
            value_type,
            scale: parse_decimal(&self.scale).unwrap_or(1.0),
            offset: parse_decimal(&self.offset).unwrap_or(0.0),
            min: parse_decimal(&self.min).unwrap_or(0.0),
            max: parse_decimal(&self.max).unwrap_or(0.0),
            unit: self.unit.clone(),
        })
    }
}
