//! Common types, enums, and error definitions for the ANCS protocol

use std::fmt;
use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error types for the notification relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed {frame} frame: {len} bytes, need at least {min}")]
    MalformedFrame {
        frame: &'static str,
        len: usize,
        min: usize,
    },

    #[error("Unknown event kind: {0}")]
    UnknownEvent(u8),

    #[error("Unknown notification: {0:#010x}")]
    UnknownNotification(u32),

    #[error("Application not in allow-list: {0}")]
    FilteredApplication(String),

    #[error("Unparseable date attribute: {0:?}")]
    DateParseFailure(String),

    #[error("Store holds {resident} records, capacity is {capacity}")]
    CapacityExceeded { resident: usize, capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid trace at line {line}: {reason}")]
    InvalidTrace { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Errors caused by what the peer sent us. These are dropped and logged,
    /// never surfaced as failures of the pipeline.
    pub fn is_protocol_noise(&self) -> bool {
        matches!(
            self,
            RelayError::MalformedFrame { .. }
                | RelayError::UnknownEvent(_)
                | RelayError::UnknownNotification(_)
                | RelayError::FilteredApplication(_)
                | RelayError::DateParseFailure(_)
        )
    }
}

/// Event kinds carried in byte 0 of a notification-source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    Added = 0,
    Modified = 1,
    Removed = 2,
}

impl EventKind {
    /// Convert a byte to an EventKind
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(EventKind::Added),
            1 => Ok(EventKind::Modified),
            2 => Ok(EventKind::Removed),
            _ => Err(RelayError::UnknownEvent(value)),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Added => write!(f, "ADDED"),
            EventKind::Modified => write!(f, "MODIFIED"),
            EventKind::Removed => write!(f, "REMOVED"),
        }
    }
}

bitflags::bitflags! {
    /// Flag bits carried in byte 1 of a notification-source frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventFlags: u8 {
        const SILENT = 1 << 0;
        const IMPORTANT = 1 << 1;
        const PRE_EXISTING = 1 << 2;
        const POSITIVE_ACTION = 1 << 3;
        const NEGATIVE_ACTION = 1 << 4;
    }
}

/// Control-point command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    GetNotificationAttributes = 0,
    GetAppAttributes = 1,
    PerformNotificationAction = 2,
}

impl CommandId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CommandId::GetNotificationAttributes),
            1 => Some(CommandId::GetAppAttributes),
            2 => Some(CommandId::PerformNotificationAction),
            _ => None,
        }
    }
}

/// Notification attribute tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeId {
    AppIdentifier = 0,
    Title = 1,
    Subtitle = 2,
    Message = 3,
    MessageSize = 4,
    Date = 5,
    PositiveActionLabel = 6,
    NegativeActionLabel = 7,
}

impl AttributeId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AttributeId::AppIdentifier),
            1 => Some(AttributeId::Title),
            2 => Some(AttributeId::Subtitle),
            3 => Some(AttributeId::Message),
            4 => Some(AttributeId::MessageSize),
            5 => Some(AttributeId::Date),
            6 => Some(AttributeId::PositiveActionLabel),
            7 => Some(AttributeId::NegativeActionLabel),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Title, subtitle and message must be followed by a 2-byte max length
    /// in a request.
    pub fn takes_max_len(self) -> bool {
        matches!(
            self,
            AttributeId::Title | AttributeId::Subtitle | AttributeId::Message
        )
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeId::AppIdentifier => write!(f, "AppIdentifier"),
            AttributeId::Title => write!(f, "Title"),
            AttributeId::Subtitle => write!(f, "Subtitle"),
            AttributeId::Message => write!(f, "Message"),
            AttributeId::MessageSize => write!(f, "MessageSize"),
            AttributeId::Date => write!(f, "Date"),
            AttributeId::PositiveActionLabel => write!(f, "PositiveActionLabel"),
            AttributeId::NegativeActionLabel => write!(f, "NegativeActionLabel"),
        }
    }
}

/// Category the peer assigns to a notification (byte 2 of an event frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CategoryId {
    Other = 0,
    IncomingCall = 1,
    MissedCall = 2,
    Voicemail = 3,
    Social = 4,
    Schedule = 5,
    Email = 6,
    News = 7,
    HealthAndFitness = 8,
    BusinessAndFinance = 9,
    Location = 10,
    Entertainment = 11,
}

impl CategoryId {
    /// Unknown codes collapse to `Other`; the peer may add categories.
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => CategoryId::IncomingCall,
            2 => CategoryId::MissedCall,
            3 => CategoryId::Voicemail,
            4 => CategoryId::Social,
            5 => CategoryId::Schedule,
            6 => CategoryId::Email,
            7 => CategoryId::News,
            8 => CategoryId::HealthAndFitness,
            9 => CategoryId::BusinessAndFinance,
            10 => CategoryId::Location,
            11 => CategoryId::Entertainment,
            _ => CategoryId::Other,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Helper function to format bytes as hex for debugging
pub fn hex_dump(data: &[u8], max_len: usize) -> String {
    let len = data.len().min(max_len);
    let hex: String = data[..len]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > max_len {
        format!("{} ... ({} bytes total)", hex, data.len())
    } else {
        format!("{} ({} bytes)", hex, data.len())
    }
}
