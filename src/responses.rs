//! Data-source attribute response decoding
//!
//! The peer answers each attribute request with one frame:
//!
//! ```text
//! bytes 0-3  notification id (u32, little-endian)
//! byte 4     attribute id
//! bytes 5..  UTF-8 payload (rest of the frame)
//! ```
//!
//! Dates arrive as `YYYYMMDDTHHMMSS` in the peer's local time.

use crate::types::{AttributeId, RelayError, Result};
use chrono::NaiveDateTime;

/// Length of the fixed part of a response frame
pub const RESPONSE_HEADER_LEN: usize = 5;

/// Wire format of the date attribute
pub const DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A decoded attribute response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResponse {
    pub id: u32,
    /// Raw attribute tag; unknown tags are carried through and ignored later
    pub tag: u8,
    pub payload: String,
}

impl AttributeResponse {
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < RESPONSE_HEADER_LEN {
            return Err(RelayError::MalformedFrame {
                frame: "data-source",
                len: frame.len(),
                min: RESPONSE_HEADER_LEN,
            });
        }

        let id = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let tag = frame[4];
        let payload = String::from_utf8_lossy(&frame[RESPONSE_HEADER_LEN..])
            .trim_end_matches('\0')
            .to_string();

        Ok(Self { id, tag, payload })
    }

    pub fn encode(id: u32, attribute: AttributeId, payload: &str) -> Vec<u8> {
        let mut frame = Vec::with_capacity(RESPONSE_HEADER_LEN + payload.len());
        frame.extend_from_slice(&id.to_le_bytes());
        frame.push(attribute.to_u8());
        frame.extend_from_slice(payload.as_bytes());
        frame
    }

    pub fn attribute(&self) -> Option<AttributeId> {
        AttributeId::from_u8(self.tag)
    }
}

/// Parse a date attribute payload.
pub fn parse_date(payload: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(payload.trim(), DATE_FORMAT)
        .map_err(|_| RelayError::DateParseFailure(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_app_identifier() {
        let mut frame = vec![0x42, 0, 0, 0, 0x00];
        frame.extend_from_slice(b"com.apple.MobileSMS");

        let response = AttributeResponse::decode(&frame).unwrap();
        assert_eq!(response.id, 0x42);
        assert_eq!(response.attribute(), Some(AttributeId::AppIdentifier));
        assert_eq!(response.payload, "com.apple.MobileSMS");
    }

    #[test]
    fn test_decode_empty_payload() {
        let response = AttributeResponse::decode(&[1, 0, 0, 0, 1]).unwrap();
        assert_eq!(response.attribute(), Some(AttributeId::Title));
        assert!(response.payload.is_empty());
    }

    #[test]
    fn test_decode_short_frame() {
        let err = AttributeResponse::decode(&[1, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedFrame { len: 4, min: 5, .. }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let response = AttributeResponse::decode(&[1, 0, 0, 0, 3, b'h', 0xFF, b'i']).unwrap();
        assert_eq!(response.payload, "h\u{FFFD}i");
    }

    #[test]
    fn test_trailing_nul_trimmed() {
        let response = AttributeResponse::decode(&[1, 0, 0, 0, 1, b'A', b'l', 0, 0]).unwrap();
        assert_eq!(response.payload, "Al");
    }

    #[test]
    fn test_unknown_tag_survives_decode() {
        let response = AttributeResponse::decode(&[1, 0, 0, 0, 0x7F, b'x']).unwrap();
        assert_eq!(response.tag, 0x7F);
        assert_eq!(response.attribute(), None);
    }

    #[test]
    fn test_encode_layout() {
        let frame = AttributeResponse::encode(0x0102_0304, AttributeId::Message, "Hi");
        assert_eq!(frame, vec![4, 3, 2, 1, 3, b'H', b'i']);
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("20240315T134502").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 13);
        assert_eq!(date.minute(), 45);
        assert_eq!(date.second(), 2);
    }

    #[test]
    fn test_parse_date_failure() {
        assert!(matches!(
            parse_date("yesterday"),
            Err(RelayError::DateParseFailure(_))
        ));
        assert!(parse_date("20241345T000000").is_err());
        assert!(parse_date("").is_err());
    }
}
