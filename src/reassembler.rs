//! Attribute reassembly
//!
//! Merges attribute responses into notification records. A record is only
//! created when the app-identifier response arrives and passes the
//! allow-list and the peer has not removed the id in the meantime; every
//! other attribute for an id without a record is dropped.
//! Completion (title and body both present) is reported once per record.

use crate::applist::AllowList;
use crate::responses::{parse_date, AttributeResponse};
use crate::store::{NotificationRecord, NotificationStore};
use crate::types::{AttributeId, RelayError, Result};
use log::{debug, info, warn};

/// What a response did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A new record was created (in the call slot if `call` is set)
    Created { id: u32, call: bool },
    /// A field of an existing record changed
    Updated { id: u32, attribute: AttributeId },
    /// The record just became complete
    Completed { id: u32 },
    /// Valid frame with nothing to do (unknown tag, repeated app id, empty text)
    Ignored { id: u32, tag: u8 },
}

/// Applies attribute responses to a store
pub struct AttributeReassembler<'a> {
    allow_list: &'a AllowList,
}

impl<'a> AttributeReassembler<'a> {
    pub fn new(allow_list: &'a AllowList) -> Self {
        Self { allow_list }
    }

    pub fn apply(
        &self,
        store: &mut NotificationStore,
        response: &AttributeResponse,
    ) -> Result<ResponseOutcome> {
        let id = response.id;
        let ignored = ResponseOutcome::Ignored {
            id,
            tag: response.tag,
        };

        let Some(attribute) = response.attribute() else {
            debug!(
                "Ignoring unknown attribute tag {} for {:#010x}",
                response.tag, id
            );
            return Ok(ignored);
        };

        if attribute == AttributeId::AppIdentifier {
            if store.contains(id) {
                debug!("Repeated app identifier for {:#010x}", id);
                return Ok(ignored);
            }
            if store.is_dismissed(id) {
                debug!("App identifier for removed notification {:#010x}", id);
                return Ok(ignored);
            }
            return self.create(store, id, &response.payload);
        }

        let record = store
            .find_mut(id)
            .ok_or(RelayError::UnknownNotification(id))?;

        match attribute {
            AttributeId::Title | AttributeId::Message => {
                if response.payload.is_empty() {
                    return Ok(ignored);
                }
                if attribute == AttributeId::Title {
                    record.title = response.payload.clone();
                } else {
                    record.body = response.payload.clone();
                }
                if record.refresh_complete() {
                    info!(
                        "Notification {:#010x} from {} complete",
                        id, record.application
                    );
                    return Ok(ResponseOutcome::Completed { id });
                }
                Ok(ResponseOutcome::Updated { id, attribute })
            }
            AttributeId::Date => {
                match parse_date(&response.payload) {
                    Ok(timestamp) => record.timestamp = Some(timestamp),
                    Err(e) => warn!("Notification {:#010x}: {}", id, e),
                }
                Ok(ResponseOutcome::Updated { id, attribute })
            }
            _ => Ok(ignored),
        }
    }

    fn create(
        &self,
        store: &mut NotificationStore,
        id: u32,
        app_id: &str,
    ) -> Result<ResponseOutcome> {
        let application = self
            .allow_list
            .resolve(app_id)
            .ok_or_else(|| RelayError::FilteredApplication(app_id.to_string()))?;

        let record = NotificationRecord::new(id, application);
        let call = record.is_call();
        if call {
            store.set_call(record);
        } else {
            store.insert(record);
        }
        info!("Message from {} added as {:#010x}", app_id, id);

        Ok(ResponseOutcome::Created { id, call })
    }
}
