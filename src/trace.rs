//! Frame trace replay format
//!
//! A trace is a text capture of what the peer sent, one directive per line:
//!
//! ```text
//! # new SMS from Alice
//! link connected
//! ns 00 00 00 00 42 00 00 00
//! ds 42000000 00 636f6d2e6170706c652e4d6f62696c65534d53
//! wait 50
//! ```
//!
//! `ns` lines are notification-source frames, `ds` lines data-source frames.
//! Hex may be split by whitespace anywhere.

use crate::relay::LinkState;
use crate::types::{RelayError, Result};
use std::time::Duration;

/// One replayable step of a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceDirective {
    Event(Vec<u8>),
    Response(Vec<u8>),
    Link(LinkState),
    Wait(Duration),
}

pub fn parse_trace(text: &str) -> Result<Vec<TraceDirective>> {
    let mut directives = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let invalid = |reason: String| RelayError::InvalidTrace {
            line: line_no,
            reason,
        };
        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let directive = match keyword {
            "ns" => TraceDirective::Event(decode_hex(rest).map_err(invalid)?),
            "ds" => TraceDirective::Response(decode_hex(rest).map_err(invalid)?),
            "wait" => {
                let millis = rest
                    .parse::<u64>()
                    .map_err(|e| invalid(format!("bad wait {:?}: {}", rest, e)))?;
                TraceDirective::Wait(Duration::from_millis(millis))
            }
            "link" => TraceDirective::Link(parse_link_state(rest).map_err(invalid)?),
            other => return Err(invalid(format!("unknown directive {:?}", other))),
        };
        directives.push(directive);
    }

    Ok(directives)
}

fn decode_hex(text: &str) -> std::result::Result<Vec<u8>, String> {
    let compact: String = text.split_whitespace().collect();
    if compact.is_empty() {
        return Err("missing frame bytes".to_string());
    }
    hex::decode(&compact).map_err(|e| format!("bad hex {:?}: {}", text, e))
}

fn parse_link_state(text: &str) -> std::result::Result<LinkState, String> {
    let mut words = text.split_whitespace();
    match words.next() {
        Some("disconnected") => Ok(LinkState::Disconnected),
        Some("peer") => Ok(LinkState::PeerConnected),
        Some("connected") => Ok(LinkState::Connected),
        Some("pairing") => match words.next() {
            Some(passcode) => Ok(LinkState::Pairing {
                passcode: passcode.to_string(),
            }),
            None => Err("pairing needs a passcode".to_string()),
        },
        other => Err(format!("unknown link state {:?}", other)),
    }
}
