//! Signal definitions and their validation
//!
//! This module contains the committed signal model and the editable text draft
//! that is validated field by field before it becomes a signal.

pub mod signal;
pub mod validate;

// Re-export key types for convenience
pub use signal::{ByteOrder, Signal, ValueType, MAX_CAN_ID};
pub use validate::{
    decimal_substitute, parse_can_id, parse_decimal, validate_field_text, SignalDraft,
    SignalField, DECIMAL_PLACEHOLDER,
};
