//! Core types for the CAN signal codec
//!
//! This module defines the error taxonomy shared by every layer of the codec and
//! the records emitted when a frame is decoded against the signal store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::signals::SignalField;

/// Timestamp type used for decoded frames
pub type Timestamp = DateTime<Utc>;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors surfaced by store, persistence and session operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Signal limit reached ({max} signals)")]
    CapacityExceeded { max: usize },

    #[error("Signal index {index} out of range (store holds {len} signals)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No DBC file selected. Select or create a DBC file first.")]
    NoActiveFile,

    #[error("File already exists: {0:?}")]
    FileExists(PathBuf),

    #[error("Failed to import DBC file: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A field of the signal draft failed its rule
///
/// The display form names the field and the violated constraint, e.g.
/// `Start bit: must be 0..63`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .field.label())]
pub struct ValidationError {
    /// Field that failed
    pub field: SignalField,
    /// Human-readable constraint
    pub message: String,
}

impl ValidationError {
    pub fn new(field: SignalField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A DBC line did not match its grammar
///
/// Never escapes the reader: the offending line is kept as passthrough text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} at column {column}")]
pub struct ParseError {
    pub expected: &'static str,
    pub column: usize,
}

/// A stored signal could not be extracted from a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum DecodeError {
    #[error("start bit {0} outside 0..63")]
    StartBitOutOfRange(u16),

    #[error("bit length {0} outside 1..64")]
    BitLengthOutOfRange(u16),

    #[error("{bit_length} bits at start bit {start_bit} do not fit a {payload_len}-byte payload")]
    OutsidePayload {
        start_bit: u16,
        bit_length: u16,
        payload_len: usize,
    },
}

/// A physical value could not be written into a payload
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("invalid signal layout: {0}")]
    Layout(#[from] DecodeError),

    #[error("scale is zero, no raw value maps to a physical value")]
    ZeroScale,

    #[error("raw value {raw} does not fit {bit_length} {kind} bits")]
    OutOfRange {
        raw: f64,
        bit_length: u16,
        kind: &'static str,
    },
}

/// A successfully decoded signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSignal {
    /// Signal name from the store
    pub name: String,
    /// Physical value (raw * scale + offset)
    pub value: f64,
    /// Raw value after sign extension; wide enough for 64-bit unsigned fields
    pub raw_value: i128,
    /// Engineering unit, empty when the signal has none
    pub unit: String,
}

impl fmt::Display for DecodedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}: {:.3}", self.name, self.value)
        } else {
            write!(f, "{}: {:.3} {}", self.name, self.value, self.unit)
        }
    }
}

/// A matching signal that failed to decode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeFailure {
    pub name: String,
    pub error: DecodeError,
}

/// All signals of the store decoded against one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFrame {
    /// When the frame was decoded
    pub timestamp: Timestamp,
    /// CAN ID used for the lookup
    pub can_id: u32,
    /// Payload bytes (already truncated to the DLC)
    pub data: Vec<u8>,
    /// Signals that decoded, in store order
    pub signals: Vec<DecodedSignal>,
    /// Signals that matched the ID but could not be extracted
    pub failures: Vec<DecodeFailure>,
}

impl DecodedFrame {
    /// Data length code of the decoded payload
    pub fn dlc(&self) -> usize {
        self.data.len()
    }

    /// True if no stored signal carries this frame's CAN ID
    pub fn is_unmatched(&self) -> bool {
        self.signals.is_empty() && self.failures.is_empty()
    }
}
