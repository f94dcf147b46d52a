//! DBC line parser
//!
//! Lines are classified on their whitespace-trimmed form. Vehicle comments,
//! `BO_` and `SG_` lines are consumed; anything else, including `SG_` lines
//! that do not match the grammar, is kept verbatim as header text.

use super::{DbcDocument, DEFAULT_MESSAGE_NAME, VEHICLE_PREFIX};
use crate::signals::{ByteOrder, Signal, ValueType};
use crate::types::ParseError;

/// Character cursor over one line
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError {
            expected,
            column: self.pos + 1,
        }
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ParseError> {
        if self.rest().starts_with(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(self.error(keyword))
        }
    }

    /// Length of the run of ASCII digits starting `offset` bytes ahead
    fn digits_len(&self, offset: usize) -> usize {
        self.rest()[offset..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count()
    }

    fn sign_len(&self) -> usize {
        usize::from(matches!(self.rest().as_bytes().first(), Some(b'+' | b'-')))
    }

    /// Signed decimal integer after optional whitespace
    fn integer(&mut self, expected: &'static str) -> Result<i64, ParseError> {
        self.skip_ws();
        let sign = self.sign_len();
        let digits = self.digits_len(sign);
        if digits == 0 {
            return Err(self.error(expected));
        }
        let text = &self.rest()[..sign + digits];
        let value = text.parse::<i64>().map_err(|_| self.error(expected))?;
        self.pos += text.len();
        Ok(value)
    }

    /// Unsigned decimal integer after optional whitespace
    fn unsigned(&mut self, expected: &'static str) -> Result<u64, ParseError> {
        self.skip_ws();
        let plus = usize::from(self.rest().starts_with('+'));
        let digits = self.digits_len(plus);
        if digits == 0 {
            return Err(self.error(expected));
        }
        let text = &self.rest()[plus..plus + digits];
        let value = text.parse::<u64>().map_err(|_| self.error(expected))?;
        self.pos += plus + digits;
        Ok(value)
    }

    /// Longest prefix that reads as a decimal float, after optional whitespace
    fn float(&mut self, expected: &'static str) -> Result<f64, ParseError> {
        self.skip_ws();
        let bytes = self.rest().as_bytes();
        let mut len = self.sign_len();

        let int_digits = self.digits_len(len);
        len += int_digits;
        let mut frac_digits = 0;
        if bytes.get(len) == Some(&b'.') {
            frac_digits = self.digits_len(len + 1);
            len += 1 + frac_digits;
        }
        if int_digits + frac_digits == 0 {
            return Err(self.error(expected));
        }

        // Exponent only counts when digits follow it
        if matches!(bytes.get(len), Some(b'e' | b'E')) {
            let mut exp = len + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits = self.digits_len(exp);
            if exp_digits > 0 {
                len = exp + exp_digits;
            }
        }

        let value = self.rest()[..len]
            .parse::<f64>()
            .map_err(|_| self.error(expected))?;
        self.pos += len;
        Ok(value)
    }
}

/// Text of a `CM_ "Vehicle: <text>"` comment, up to the next quote
pub fn parse_vehicle_comment(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(VEHICLE_PREFIX)?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// CAN ID and name of a `BO_ <id> <name>[:]` line
pub fn parse_bo_line(line: &str) -> Result<(u32, &str), ParseError> {
    let mut cur = Cursor::new(line);
    cur.expect_keyword("BO_")?;
    let id = cur.unsigned("message id")?;
    let can_id = u32::try_from(id).map_err(|_| cur.error("32-bit message id"))?;
    cur.skip_ws();
    let name = cur.take_while(|c| c != ':' && !c.is_whitespace());
    if name.is_empty() {
        return Err(cur.error("message name"));
    }
    Ok((can_id, name))
}

/// Build a signal from an `SG_` line in the context of the current message
pub fn parse_sg_line(line: &str, can_id: u32, message_name: &str) -> Result<Signal, ParseError> {
    let mut cur = Cursor::new(line);
    cur.expect_keyword("SG_")?;
    cur.skip_ws();

    let name = cur.take_while(|c| c != ':' && !c.is_whitespace());
    if name.is_empty() {
        return Err(cur.error("signal name"));
    }
    // Skips multiplexer indicators such as `M` or `m3`
    cur.take_while(|c| c != ':');
    cur.expect(':', "':'")?;

    let start_bit = cur.integer("start bit")?;
    cur.expect('|', "'|'")?;
    let bit_length = cur.integer("bit length")?;
    cur.expect('@', "'@'")?;
    let endian = cur.next_char().ok_or_else(|| cur.error("byte order"))?;
    let sign = cur.next_char().ok_or_else(|| cur.error("value type"))?;

    cur.skip_ws();
    cur.expect('(', "'('")?;
    let scale = cur.float("scale")?;
    cur.expect(',', "','")?;
    let offset = cur.float("offset")?;
    cur.expect(')', "')'")?;

    cur.skip_ws();
    cur.expect('[', "'['")?;
    let min = cur.float("minimum")?;
    cur.expect('|', "'|'")?;
    let max = cur.float("maximum")?;
    cur.expect(']', "']'")?;

    cur.skip_ws();
    let unit = if cur.eat('"') {
        cur.take_while(|c| c != '"')
    } else {
        ""
    };

    let start_bit = u16::try_from(start_bit).map_err(|_| cur.error("start bit in 0..65535"))?;
    let bit_length = u16::try_from(bit_length).map_err(|_| cur.error("bit length in 0..65535"))?;

    let message_name = if message_name.is_empty() {
        DEFAULT_MESSAGE_NAME
    } else {
        message_name
    };

    Ok(Signal {
        message_name: message_name.to_string(),
        signal_name: name.to_string(),
        can_id,
        start_bit,
        bit_length,
        byte_order: if endian == '1' {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        },
        value_type: if sign == '-' {
            ValueType::Signed
        } else {
            ValueType::Unsigned
        },
        scale,
        offset,
        min,
        max,
        unit: unit.to_string(),
    })
}

/// Parse a whole DBC text into a document holding at most `max_signals` signals
///
/// The store is left in file order; callers sort it.
pub fn parse_document(text: &str, max_signals: usize) -> DbcDocument {
    let mut document = DbcDocument::new(max_signals);
    let mut can_id: u32 = 0;
    let mut message_name = String::new();

    for (line_no, raw) in text.split('\n').enumerate() {
        let line = raw.trim_end_matches(|c| c == '\r' || c == '\n');
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(info) = parse_vehicle_comment(trimmed) {
            document.set_vehicle_info(info);
            continue;
        }

        if let Ok((id, name)) = parse_bo_line(trimmed) {
            can_id = id;
            message_name = name.to_string();
            continue;
        }

        if trimmed.starts_with("SG_") {
            match parse_sg_line(trimmed, can_id, &message_name) {
                Ok(signal) => {
                    if document.store.is_full() {
                        log::warn!(
                            "Signal limit ({}) reached, dropping '{}' on line {}",
                            document.store.capacity(),
                            signal.signal_name,
                            line_no + 1
                        );
                    } else {
                        log::debug!("Line {}: signal '{}'", line_no + 1, signal.signal_name);
                        // Capacity was checked above
                        let _ = document.store.add(signal);
                    }
                    continue;
                }
                Err(e) => {
                    log::debug!("Line {}: kept as text, {}", line_no + 1, e);
                }
            }
        }

        document.header.push_str(line);
        document.header.push('\n');
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_comment() {
        assert_eq!(
            parse_vehicle_comment("CM_ \"Vehicle: Tesla Model 3\";"),
            Some("Tesla Model 3")
        );
        assert_eq!(parse_vehicle_comment("CM_ \"Vehicle: unterminated"), None);
        assert_eq!(parse_vehicle_comment("CM_ \"Other\";"), None);
    }

    #[test]
    fn test_bo_line() {
        assert_eq!(parse_bo_line("BO_ 599 DI_speed: 8 VehicleBus"), Ok((599, "DI_speed")));
        assert_eq!(parse_bo_line("BO_ 1 Name"), Ok((1, "Name")));
        assert!(parse_bo_line("BO_ x Name: 8").is_err());
        assert!(parse_bo_line("BO_ 12 : 8").is_err());
        assert!(parse_bo_line("BO_TX_BU_ 12 : A,B;").is_err());
    }

    #[test]
    fn test_sg_line_fields() {
        let line = "SG_ DI_vehicleSpeed : 12|12@1+ (0.08,-40) [-40|285] \"kph\"  Receiver";
        let signal = parse_sg_line(line, 599, "DI_speed").unwrap();
        assert_eq!(signal.signal_name, "DI_vehicleSpeed");
        assert_eq!(signal.message_name, "DI_speed");
        assert_eq!(signal.can_id, 599);
        assert_eq!(signal.start_bit, 12);
        assert_eq!(signal.bit_length, 12);
        assert_eq!(signal.byte_order, ByteOrder::LittleEndian);
        assert_eq!(signal.value_type, ValueType::Unsigned);
        assert_eq!(signal.scale, 0.08);
        assert_eq!(signal.offset, -40.0);
        assert_eq!(signal.min, -40.0);
        assert_eq!(signal.max, 285.0);
        assert_eq!(signal.unit, "kph");
    }

    #[test]
    fn test_sg_line_lenient_forms() {
        // Multiplexer indicator, spaces inside brackets, exponent, no unit
        let line = "SG_ Mode m3 : 7|4@0- ( 1e-1, 0) [ -5| 5.5]";
        let signal = parse_sg_line(line, 1, "").unwrap();
        assert_eq!(signal.message_name, "Message");
        assert_eq!(signal.byte_order, ByteOrder::BigEndian);
        assert_eq!(signal.value_type, ValueType::Signed);
        assert_eq!(signal.scale, 0.1);
        assert_eq!(signal.max, 5.5);
        assert_eq!(signal.unit, "");

        // Unterminated unit runs to the end of the line
        let signal = parse_sg_line("SG_ A : 0|8@1+ (1,0) [0|0] \"deg C", 1, "M").unwrap();
        assert_eq!(signal.unit, "deg C");
    }

    #[test]
    fn test_sg_line_failures() {
        let err = parse_sg_line("SG_ A : 0|8 1+ (1,0) [0|0] \"\"", 1, "M").unwrap_err();
        assert_eq!(err.expected, "'@'");
        assert!(parse_sg_line("SG_ A 0|8@1+ (1,0) [0|0]", 1, "M").is_err());
        assert!(parse_sg_line("SG_ A : 0|8@1+ 1,0 [0|0]", 1, "M").is_err());
        assert!(parse_sg_line("SG_ A : -1|8@1+ (1,0) [0|0]", 1, "M").is_err());
        assert!(parse_sg_line("SG_ A : 0|8@", 1, "M").is_err());
    }

    #[test]
    fn test_document_classification() {
        let text = "VERSION \"\"\r\n\
                    \r\n\
                    NS_ :\r\n\
                    \x20   CM_\r\n\
                    CM_ \"Vehicle: Model 3\";\r\n\
                    BO_ 599 DI_speed: 8 VehicleBus\r\n\
                    \x20SG_ Speed : 12|12@1+ (0.08,-40) [-40|285] \"kph\"  Receiver\r\n\
                    \x20SG_ Broken : 12|12 1+ (0.08,-40) [-40|285] \"kph\"  Receiver\r\n\
                    VAL_ 599 Speed 0 \"Stop\" ;\r\n";

        let doc = parse_document(text, 32);
        assert_eq!(doc.vehicle_info.as_deref(), Some("Model 3"));
        assert_eq!(doc.store.len(), 1);
        assert_eq!(doc.store.get(0).unwrap().signal_name, "Speed");
        assert_eq!(
            doc.header,
            "VERSION \"\"\nNS_ :\n    CM_\n \
             SG_ Broken : 12|12 1+ (0.08,-40) [-40|285] \"kph\"  Receiver\n\
             VAL_ 599 Speed 0 \"Stop\" ;\n"
        );
    }

    #[test]
    fn test_document_drops_signals_past_capacity() {
        let mut text = String::from("BO_ 1 M: 8 VehicleBus\n");
        for i in 0..4 {
            text.push_str(&format!(" SG_ S{} : {}|1@1+ (1,0) [0|1] \"\"  Receiver\n", i, i));
        }
        let doc = parse_document(&text, 3);
        assert_eq!(doc.store.len(), 3);
        assert_eq!(doc.store.get(2).unwrap().signal_name, "S2");
        assert!(doc.header.is_empty());
    }

    #[test]
    fn test_signal_before_any_message() {
        let doc = parse_document("SG_ Lone : 0|8@1+ (1,0) [0|0] \"\"", 32);
        let signal = doc.store.get(0).unwrap();
        assert_eq!(signal.can_id, 0);
        assert_eq!(signal.message_name, "Message");
    }
}
