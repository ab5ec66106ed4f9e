//! Notification-source event decoding
//!
//! Every notification the peer creates, changes or dismisses is announced by
//! an 8-byte frame on the notification-source characteristic:
//!
//! ```text
//! byte 0     event kind (0 = added, 1 = modified, 2 = removed)
//! byte 1     event flags
//! byte 2     category id
//! byte 3     category count
//! bytes 4-7  notification id (u32, little-endian)
//! ```

use crate::types::{CategoryId, EventFlags, EventKind, RelayError, Result};

/// Minimum length of a notification-source frame
pub const EVENT_FRAME_LEN: usize = 8;

/// A decoded notification-source event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub flags: EventFlags,
    pub category: CategoryId,
    pub category_count: u8,
    pub id: u32,
}

impl NotificationEvent {
    pub fn is_pre_existing(&self) -> bool {
        self.flags.contains(EventFlags::PRE_EXISTING)
    }

    /// Encode back into wire form. Used by tests.
    pub fn encode(&self) -> [u8; EVENT_FRAME_LEN] {
        let id = self.id.to_le_bytes();
        [
            self.kind.to_u8(),
            self.flags.bits(),
            self.category.code(),
            self.category_count,
            id[0],
            id[1],
            id[2],
            id[3],
        ]
    }
}

/// Decoder for notification-source frames
pub struct EventDecoder;

impl EventDecoder {
    /// Decode a frame. Trailing bytes beyond the fixed layout are ignored.
    pub fn decode(frame: &[u8]) -> Result<NotificationEvent> {
        let header: &[u8; EVENT_FRAME_LEN] = frame
            .get(..EVENT_FRAME_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(RelayError::MalformedFrame {
                frame: "notification-source",
                len: frame.len(),
                min: EVENT_FRAME_LEN,
            })?;

        let kind = EventKind::from_u8(header[0])?;
        let flags = EventFlags::from_bits_retain(header[1]);
        let category = CategoryId::from_u8(header[2]);
        let category_count = header[3];
        let id = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        Ok(NotificationEvent {
            kind,
            flags,
            category,
            category_count,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_added() {
        let event = EventDecoder::decode(&[0, 0, 0, 0, 0x42, 0, 0, 0]).unwrap();
        assert_eq!(event.kind, EventKind::Added);
        assert_eq!(event.id, 0x42);
        assert_eq!(event.flags, EventFlags::empty());
        assert_eq!(event.category, CategoryId::Other);
    }

    #[test]
    fn test_decode_removed_full_id() {
        let event = EventDecoder::decode(&[2, 0, 1, 3, 0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(event.kind, EventKind::Removed);
        assert_eq!(event.id, 0x1234_5678);
        assert_eq!(event.category, CategoryId::IncomingCall);
        assert_eq!(event.category_count, 3);
    }

    #[test]
    fn test_decode_flags() {
        let event = EventDecoder::decode(&[1, 0b0001_0110, 6, 1, 1, 0, 0, 0]).unwrap();
        assert_eq!(event.kind, EventKind::Modified);
        assert!(event.flags.contains(EventFlags::IMPORTANT));
        assert!(event.flags.contains(EventFlags::NEGATIVE_ACTION));
        assert!(event.is_pre_existing());
        assert!(!event.flags.contains(EventFlags::SILENT));
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let err = EventDecoder::decode(&[0, 0, 0, 0, 0x42, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedFrame { len: 7, min: 8, .. }
        ));
        assert!(EventDecoder::decode(&[]).is_err());
    }

    #[test]
    fn test_unknown_kind() {
        let err = EventDecoder::decode(&[3, 0, 0, 0, 1, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, RelayError::UnknownEvent(3)));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let event = EventDecoder::decode(&[0, 0, 0, 0, 7, 0, 0, 0, 0xFF, 0xFF]).unwrap();
        assert_eq!(event.id, 7);
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let event = NotificationEvent {
            kind: EventKind::Removed,
            flags: EventFlags::SILENT,
            category: CategoryId::Social,
            category_count: 2,
            id: 0x0102_0304,
        };
        assert_eq!(event.encode(), [2, 1, 4, 2, 4, 3, 2, 1]);
    }
}
