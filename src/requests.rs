//! Attribute request generation
//!
//! Once a notification is announced, its content is fetched by writing
//! get-notification-attributes commands to the control point. Each command
//! asks for a single attribute so that the responses stay small enough for
//! one link-layer packet:
//!
//! ```text
//! byte 0     command id (0 = get notification attributes)
//! bytes 1-4  notification id (u32, little-endian)
//! byte 5     attribute id
//! bytes 6-7  max length (u16, little-endian), title/subtitle/message only
//! ```

use crate::types::{AttributeId, CommandId, RelayError, Result};

const REQUEST_HEADER_LEN: usize = 6;

/// A single get-notification-attributes command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRequest {
    pub id: u32,
    pub attribute: AttributeId,
    pub max_len: Option<u16>,
}

impl AttributeRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(REQUEST_HEADER_LEN + 2);
        frame.push(CommandId::GetNotificationAttributes as u8);
        frame.extend_from_slice(&self.id.to_le_bytes());
        frame.push(self.attribute.to_u8());
        if self.attribute.takes_max_len() {
            // The peer rejects a capped attribute without a length.
            let max_len = self.max_len.unwrap_or(u16::MAX);
            frame.extend_from_slice(&max_len.to_le_bytes());
        }
        frame
    }

    /// Decode a control-point frame written by [`AttributeRequest::encode`].
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let malformed = || RelayError::MalformedFrame {
            frame: "control-point",
            len: frame.len(),
            min: REQUEST_HEADER_LEN,
        };

        if frame.len() < REQUEST_HEADER_LEN
            || CommandId::from_u8(frame[0]) != Some(CommandId::GetNotificationAttributes)
        {
            return Err(malformed());
        }

        let id = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
        let attribute = AttributeId::from_u8(frame[5]).ok_or_else(malformed)?;
        let max_len = if attribute.takes_max_len() {
            match frame.get(6..8) {
                Some(len) => Some(u16::from_le_bytes([len[0], len[1]])),
                None => return Err(malformed()),
            }
        } else {
            None
        };

        Ok(Self {
            id,
            attribute,
            max_len,
        })
    }
}

/// Builds the fixed batch of requests issued for every new notification
#[derive(Debug, Clone, Copy)]
pub struct AttributeRequestBuilder {
    title_max_len: u16,
    message_max_len: u16,
}

impl AttributeRequestBuilder {
    pub fn new(title_max_len: u16, message_max_len: u16) -> Self {
        Self {
            title_max_len,
            message_max_len,
        }
    }

    /// Requests for app identifier, title, message and date, in that order.
    pub fn requests(&self, id: u32) -> [AttributeRequest; 4] {
        [
            AttributeRequest {
                id,
                attribute: AttributeId::AppIdentifier,
                max_len: None,
            },
            AttributeRequest {
                id,
                attribute: AttributeId::Title,
                max_len: Some(self.title_max_len),
            },
            AttributeRequest {
                id,
                attribute: AttributeId::Message,
                max_len: Some(self.message_max_len),
            },
            AttributeRequest {
                id,
                attribute: AttributeId::Date,
                max_len: None,
            },
        ]
    }

    /// Encoded frames for [`AttributeRequestBuilder::requests`].
    pub fn for_notification(&self, id: u32) -> Vec<Vec<u8>> {
        self.requests(id).iter().map(AttributeRequest::encode).collect()
    }
}
