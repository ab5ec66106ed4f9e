//! Notification relay context
//!
//! `NotificationRelay` is the one object the transport and display
//! collaborators talk to. It owns the store, the allow-list and the producer
//! side of the pending-fetch queue, and exposes the boundary calls:
//!
//! - transport callbacks: [`NotificationRelay::submit_event_frame`] and
//!   [`NotificationRelay::submit_response_frame`]
//! - fetch worker: [`FetchWorker::run`], writing requests through a [`ControlPoint`]
//! - display: [`NotificationRelay::completion`], [`NotificationRelay::unpresented_records`],
//!   [`NotificationRelay::active_call`] and [`NotificationRelay::mark_presented`]
//!
//! All store access goes through a single mutex. The lock is never held
//! across an await point.

use crate::applist::AllowList;
use crate::config::RelayConfig;
use crate::events::{EventDecoder, NotificationEvent};
use crate::pending::{pending_fetch_queue, PendingFetchConsumer, PendingFetchProducer};
use crate::reassembler::{AttributeReassembler, ResponseOutcome};
use crate::requests::AttributeRequestBuilder;
use crate::responses::AttributeResponse;
use crate::store::{NotificationRecord, NotificationStore};
use crate::types::{hex_dump, EventKind, RelayError, Result};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Writes outbound frames to the peer's control point
#[async_trait::async_trait]
pub trait ControlPoint: Send + Sync {
    async fn write(&self, frame: &[u8]) -> Result<()>;
}

/// State of the link to the peer, shown by the display while idle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    /// Peer connected, notification service not yet subscribed
    PeerConnected,
    /// Subscribed to the notification service
    Connected,
    Pairing {
        passcode: String,
    },
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "Disconnected."),
            LinkState::PeerConnected => write!(f, "Connected."),
            LinkState::Connected => write!(f, "Standby."),
            LinkState::Pairing { passcode } => write!(f, "Pairing... Passcode {}", passcode),
        }
    }
}

/// Shared context for the transport, fetch and display threads
pub struct NotificationRelay {
    config: RelayConfig,
    allow_list: AllowList,
    store: Mutex<NotificationStore>,
    pending: PendingFetchProducer,
    completion: Notify,
    completed: AtomicU64,
    dropped_pre_existing: AtomicU64,
    link_state: Mutex<LinkState>,
}

impl NotificationRelay {
    /// Build the relay and the worker that drains its pending-fetch queue.
    pub fn new(config: RelayConfig) -> Result<(Arc<Self>, FetchWorker)> {
        config.validate()?;

        let (pending, consumer) = pending_fetch_queue(config.pending_capacity);
        let builder = AttributeRequestBuilder::new(config.title_max_len, config.message_max_len);

        let relay = Arc::new(Self {
            allow_list: config.allow_list(),
            store: Mutex::new(
                NotificationStore::new(config.store_capacity)
                    .with_dismissed_capacity(config.pending_capacity),
            ),
            pending,
            completion: Notify::new(),
            completed: AtomicU64::new(0),
            dropped_pre_existing: AtomicU64::new(0),
            link_state: Mutex::new(LinkState::default()),
            config,
        });
        info!(
            "Relay ready: capacity {}, {} allowed applications",
            relay.config.store_capacity,
            relay.allow_list.len()
        );

        Ok((relay, FetchWorker { consumer, builder }))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn lock_store(&self) -> MutexGuard<'_, NotificationStore> {
        // Poisoning is ignored; every store mutation is a single step.
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a notification id for attribute retrieval.
    pub fn enqueue_added(&self, id: u32) -> bool {
        self.pending.enqueue(id)
    }

    /// Handle a notification-source frame, dropping anything malformed.
    pub fn submit_event_frame(&self, frame: &[u8]) -> Option<NotificationEvent> {
        match self.try_submit_event_frame(frame) {
            Ok(event) => Some(event),
            Err(e) => {
                self.report_dropped(&e, frame);
                None
            }
        }
    }

    /// Handle a notification-source frame, returning why it was dropped.
    pub fn try_submit_event_frame(&self, frame: &[u8]) -> Result<NotificationEvent> {
        let event = EventDecoder::decode(frame)?;
        debug!(
            "Event {} for {:#010x} (flags {:?}, category {:?})",
            event.kind, event.id, event.flags, event.category
        );

        match event.kind {
            EventKind::Added => {
                self.lock_store().undismiss(event.id);
                if !self.enqueue_added(event.id) && event.is_pre_existing() {
                    let dropped = self.dropped_pre_existing.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(
                        "{} pre-existing notifications lost to a full fetch queue",
                        dropped
                    );
                }
            }
            EventKind::Modified => {
                debug!("Ignoring modification of {:#010x}", event.id);
            }
            EventKind::Removed => {
                let mut store = self.lock_store();
                store.dismiss(event.id);
                if store.is_active_call(event.id) {
                    store.clear_call();
                    info!("Call {:#010x} ended", event.id);
                } else if store.remove(event.id).is_some() {
                    info!("Notification {:#010x} removed", event.id);
                } else {
                    debug!(
                        "Notification {:#010x} removed before its record arrived",
                        event.id
                    );
                }
            }
        }

        Ok(event)
    }

    /// Handle a data-source frame, dropping anything the peer got wrong.
    pub fn submit_response_frame(&self, frame: &[u8]) -> Option<ResponseOutcome> {
        match self.try_submit_response_frame(frame) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.report_dropped(&e, frame);
                None
            }
        }
    }

    /// Handle a data-source frame, returning why it was dropped.
    pub fn try_submit_response_frame(&self, frame: &[u8]) -> Result<ResponseOutcome> {
        let response = AttributeResponse::decode(frame)?;
        let outcome = {
            let mut store = self.lock_store();
            AttributeReassembler::new(&self.allow_list).apply(&mut store, &response)?
        };

        if let ResponseOutcome::Completed { id } = outcome {
            self.completed.fetch_add(1, Ordering::SeqCst);
            debug!("Signalling display for {:#010x}", id);
            self.completion.notify_one();
        }
        Ok(outcome)
    }

    fn report_dropped(&self, e: &RelayError, frame: &[u8]) {
        match e {
            RelayError::MalformedFrame { .. } | RelayError::UnknownEvent(_) => {
                warn!("Dropping frame: {} [{}]", e, hex_dump(frame, 16))
            }
            RelayError::FilteredApplication(app_id) => {
                info!("Message from {} suppressed", app_id)
            }
            e if e.is_protocol_noise() => debug!("Dropping frame: {}", e),
            e => error!("Unexpected failure handling frame: {}", e),
        }
    }

    /// Wakes the display whenever a record becomes complete
    pub fn completion(&self) -> &Notify {
        &self.completion
    }

    /// Number of incomplete to complete transitions so far
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Pre-existing notifications announced while the fetch queue was full
    pub fn dropped_pre_existing_count(&self) -> u64 {
        self.dropped_pre_existing.load(Ordering::SeqCst)
    }

    /// Snapshot of regular records not yet presented, oldest first
    pub fn unpresented_records(&self) -> Vec<NotificationRecord> {
        self.lock_store().unpresented().cloned().collect()
    }

    /// Snapshot of every regular record, oldest first
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.lock_store().iter().cloned().collect()
    }

    pub fn find(&self, id: u32) -> Option<NotificationRecord> {
        self.lock_store().find(id).cloned()
    }

    pub fn active_call(&self) -> Option<NotificationRecord> {
        self.lock_store().active_call().cloned()
    }

    pub fn mark_presented(&self, id: u32) -> bool {
        self.lock_store().mark_presented(id)
    }

    pub fn set_link_state(&self, state: LinkState) {
        info!("Link state: {}", state);
        *self
            .link_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    pub fn link_state(&self) -> LinkState {
        self.link_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Drains the pending-fetch queue and writes attribute requests
pub struct FetchWorker {
    consumer: PendingFetchConsumer,
    builder: AttributeRequestBuilder,
}

impl FetchWorker {
    /// Issue the request batch for every queued id until the relay is dropped.
    ///
    /// Requests are fire-and-forget: responses are matched later by id. If a
    /// write fails, the rest of that batch is skipped and the notification
    /// stays incomplete until it is removed or evicted.
    pub async fn run(mut self, control_point: Arc<dyn ControlPoint>) {
        while let Some(id) = self.consumer.next().await {
            self.fetch(id, control_point.as_ref()).await;
        }
        debug!("Pending-fetch queue closed, fetch worker exiting");
    }

    async fn fetch(&self, id: u32, control_point: &dyn ControlPoint) {
        debug!("Requesting attributes for {:#010x}", id);
        for frame in self.builder.for_notification(id) {
            if let Err(e) = control_point.write(&frame).await {
                warn!("Attribute request for {:#010x} failed: {}", id, e);
                return;
            }
        }
    }

    /// Issue requests for everything already queued, without waiting.
    pub async fn drain(&mut self, control_point: &dyn ControlPoint) -> usize {
        let mut fetched = 0;
        while let Some(id) = self.consumer.try_next() {
            self.fetch(id, control_point).await;
            fetched += 1;
        }
        fetched
    }
}
