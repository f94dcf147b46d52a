//! Bit-field codec
//!
//! Extracts raw integers from CAN payloads and converts them to physical values,
//! and writes physical values back into payloads. Handles bit extraction,
//! byte order, sign extension and scale/offset conversion.
//!
//! The big-endian walk starts at `start_bit` and moves down one bit index per
//! step, reading bit `7 - (index % 8)` of byte `index / 8`. Files written by
//! earlier releases depend on this numbering, so it is kept as is.

use crate::signals::Signal;
use crate::store::SignalStore;
use crate::types::{DecodeError, DecodeFailure, DecodedFrame, DecodedSignal, EncodeError};
use byteorder::{ByteOrder as _, LittleEndian};
use chrono::Utc;

/// Mask covering the low `bit_length` bits
fn mask(bit_length: u8) -> u64 {
    if bit_length >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_length) - 1
    }
}

/// View up to the first 8 payload bytes as one little-endian integer
fn payload_as_u64(payload: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = payload.len().min(8);
    buf[..len].copy_from_slice(&payload[..len]);
    LittleEndian::read_u64(&buf)
}

/// Extract a raw value from payload bytes
///
/// Returns `None` when `bit_length` is outside 1..=64, `start_bit` is above 63,
/// or a big-endian walk would leave the payload.
pub fn extract_raw(payload: &[u8], start_bit: u8, bit_length: u8, big_endian: bool) -> Option<u64> {
    if bit_length == 0 || bit_length > 64 || start_bit > 63 {
        return None;
    }

    if !big_endian {
        // Bytes past the payload read as zero
        let value = payload_as_u64(payload);
        return Some((value >> start_bit) & mask(bit_length));
    }

    // The walk would pass below bit 0
    if u16::from(start_bit) + 1 < u16::from(bit_length) {
        return None;
    }

    let mut raw: u64 = 0;
    for i in 0..bit_length {
        let bit_index = start_bit - i;
        let byte_index = usize::from(bit_index / 8);
        if byte_index >= payload.len() {
            return None;
        }
        let bit_in_byte = 7 - (bit_index % 8);
        let bit = (payload[byte_index] >> bit_in_byte) & 0x01;
        raw = (raw << 1) | u64::from(bit);
    }

    Some(raw)
}

/// Write a raw value into payload bytes along the same walk [`extract_raw`] reads
///
/// Returns `None` (leaving the payload untouched) for the layouts
/// `extract_raw` rejects, and for little-endian fields that extend past the
/// payload.
pub fn insert_raw(
    payload: &mut [u8],
    start_bit: u8,
    bit_length: u8,
    big_endian: bool,
    raw: u64,
) -> Option<()> {
    if bit_length == 0 || bit_length > 64 || start_bit > 63 {
        return None;
    }
    let raw = raw & mask(bit_length);

    if !big_endian {
        let len = payload.len().min(8);
        if usize::from(start_bit) + usize::from(bit_length) > len * 8 {
            return None;
        }
        let field = mask(bit_length) << start_bit;
        let value = (payload_as_u64(payload) & !field) | ((raw << start_bit) & field);

        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        payload[..len].copy_from_slice(&buf[..len]);
        return Some(());
    }

    if u16::from(start_bit) + 1 < u16::from(bit_length) {
        return None;
    }
    // The highest byte touched is the one holding start_bit
    if usize::from(start_bit / 8) >= payload.len() {
        return None;
    }

    for i in 0..bit_length {
        let bit_index = start_bit - i;
        let byte_index = usize::from(bit_index / 8);
        let bit_in_byte = 7 - (bit_index % 8);
        let bit = ((raw >> (bit_length - 1 - i)) & 0x01) as u8;
        payload[byte_index] = (payload[byte_index] & !(1 << bit_in_byte)) | (bit << bit_in_byte);
    }

    Some(())
}

/// Sign-extend a value from N bits to 64 bits
///
/// If the value's MSB is 1, fill the upper bits with 1s.
pub fn sign_extend(value: u64, bit_length: u8) -> i64 {
    if bit_length == 0 || bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        (value | !mask(bit_length)) as i64
    } else {
        value as i64
    }
}

/// Check a signal's layout and narrow it to the codec's integer widths
fn checked_layout(signal: &Signal) -> Result<(u8, u8), DecodeError> {
    let start_bit = u8::try_from(signal.start_bit)
        .ok()
        .filter(|bit| *bit <= 63)
        .ok_or(DecodeError::StartBitOutOfRange(signal.start_bit))?;
    let bit_length = u8::try_from(signal.bit_length)
        .ok()
        .filter(|len| (1..=64).contains(len))
        .ok_or(DecodeError::BitLengthOutOfRange(signal.bit_length))?;
    Ok((start_bit, bit_length))
}

fn outside_payload(signal: &Signal, payload_len: usize) -> DecodeError {
    DecodeError::OutsidePayload {
        start_bit: signal.start_bit,
        bit_length: signal.bit_length,
        payload_len,
    }
}

/// Decode one signal into its raw (sign-extended) and physical values
pub fn decode_signal(signal: &Signal, payload: &[u8]) -> Result<DecodedSignal, DecodeError> {
    let (start_bit, bit_length) = checked_layout(signal)?;
    let big_endian = signal.byte_order.is_big_endian();

    let raw = extract_raw(payload, start_bit, bit_length, big_endian)
        .ok_or_else(|| outside_payload(signal, payload.len()))?;

    let (raw_value, numeric) = if signal.value_type.is_signed() {
        let signed = sign_extend(raw, bit_length);
        (i128::from(signed), signed as f64)
    } else {
        (i128::from(raw), raw as f64)
    };

    Ok(DecodedSignal {
        name: signal.signal_name.clone(),
        value: numeric * signal.scale + signal.offset,
        raw_value,
        unit: signal.unit.clone(),
    })
}

/// Decode one signal into its physical value
pub fn decode_signal_value(signal: &Signal, payload: &[u8]) -> Result<f64, DecodeError> {
    decode_signal(signal, payload).map(|decoded| decoded.value)
}

/// Encode a physical value into the signal's bits of `payload`
///
/// The raw value is `round((physical - offset) / scale)` and must fit the
/// signal's bit length and signedness.
pub fn encode_signal_value(
    signal: &Signal,
    physical: f64,
    payload: &mut [u8],
) -> Result<u64, EncodeError> {
    let (start_bit, bit_length) = checked_layout(signal)?;
    if signal.scale == 0.0 {
        return Err(EncodeError::ZeroScale);
    }

    let raw = ((physical - signal.offset) / signal.scale).round();
    let (min, max, kind) = if signal.value_type.is_signed() {
        let half = 1i128 << (bit_length - 1);
        (-half, half - 1, "signed")
    } else {
        (0, (1i128 << bit_length) - 1, "unsigned")
    };

    let out_of_range = EncodeError::OutOfRange {
        raw,
        bit_length: signal.bit_length,
        kind,
    };
    if !raw.is_finite() || raw < min as f64 || raw > max as f64 {
        return Err(out_of_range);
    }
    let raw_int = raw as i128;
    if raw_int < min || raw_int > max {
        return Err(out_of_range);
    }

    // Two's complement for negative values, truncated to the field by insert_raw
    let bits = raw_int as u64;
    let big_endian = signal.byte_order.is_big_endian();
    insert_raw(payload, start_bit, bit_length, big_endian, bits)
        .ok_or_else(|| EncodeError::Layout(outside_payload(signal, payload.len())))?;

    Ok(bits & mask(bit_length))
}

/// Largest classic CAN payload
pub const MAX_PAYLOAD_LEN: usize = 8;

/// The bytes of `data` covered by a data length code (capped at 8)
pub fn frame_payload(data: &[u8], dlc: u8) -> &[u8] {
    let len = usize::from(dlc).min(MAX_PAYLOAD_LEN).min(data.len());
    &data[..len]
}

/// Decode every stored signal with a matching CAN ID
///
/// One entry per matching signal, in store order. A failing signal never
/// stops the others from being decoded.
pub fn decode_frame(
    store: &SignalStore,
    can_id: u32,
    payload: &[u8],
) -> Vec<(String, Result<f64, DecodeError>)> {
    store
        .matching(can_id)
        .map(|signal| {
            (
                signal.signal_name.clone(),
                decode_signal_value(signal, payload),
            )
        })
        .collect()
}

/// Decode a frame into a timestamped [`DecodedFrame`]
pub fn decode_frame_detailed(store: &SignalStore, can_id: u32, payload: &[u8]) -> DecodedFrame {
    let mut signals = Vec::new();
    let mut failures = Vec::new();

    for signal in store.matching(can_id) {
        match decode_signal(signal, payload) {
            Ok(decoded) => {
                log::trace!("{} = {} (raw {})", decoded.name, decoded.value, decoded.raw_value);
                signals.push(decoded);
            }
            Err(error) => {
                log::debug!("Signal '{}' failed to decode: {}", signal.signal_name, error);
                failures.push(DecodeFailure {
                    name: signal.signal_name.clone(),
                    error,
                });
            }
        }
    }

    DecodedFrame {
        timestamp: Utc::now(),
        can_id,
        data: payload.to_vec(),
        signals,
        failures,
    }
}
