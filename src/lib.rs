//! ANCS notification relay
//!
//! This library implements the wearable side of the Apple Notification Center
//! Service: it decodes notification-source events, requests notification
//! attributes through the control point, reassembles the data-source
//! responses into complete records and hands them to a display.
//!
//! # Modules
//!
//! - `events`: notification-source frame decoding
//! - `requests`: control-point attribute request frames
//! - `responses`: data-source attribute response frames
//! - `reassembler`: merges responses into records
//! - `store`: bounded notification store and call slot
//! - `pending`: FIFO hand-off of ids awaiting attribute fetch
//! - `relay`: the context object tying the above together
//! - `display`: output stage driven by completion signals
//! - `applist`, `config`, `trace`, `types`: supporting pieces

pub mod applist;
pub mod config;
pub mod display;
pub mod events;
pub mod pending;
pub mod reassembler;
pub mod relay;
pub mod requests;
pub mod responses;
pub mod store;
pub mod trace;
pub mod types;

pub use applist::{AllowList, Application};
pub use config::RelayConfig;
pub use display::{DisplayLoop, DisplayStep, NotificationView, Presenter};
pub use events::{EventDecoder, NotificationEvent, EVENT_FRAME_LEN};
pub use pending::{pending_fetch_queue, PendingFetchConsumer, PendingFetchProducer};
pub use reassembler::{AttributeReassembler, ResponseOutcome};
pub use relay::{ControlPoint, FetchWorker, LinkState, NotificationRelay};
pub use requests::{AttributeRequest, AttributeRequestBuilder};
pub use responses::{parse_date, AttributeResponse, DATE_FORMAT, RESPONSE_HEADER_LEN};
pub use store::{NotificationRecord, NotificationStore};
pub use trace::{parse_trace, TraceDirective};
pub use types::{
    hex_dump, AttributeId, CategoryId, CommandId, EventFlags, EventKind, RelayError, Result,
};
