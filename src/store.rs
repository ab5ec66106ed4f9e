//! Bounded notification store
//!
//! Holds at most `capacity` regular notifications, evicting the oldest
//! inserted record when a new one arrives at capacity. Eviction ignores
//! whether a record is complete or has been presented.
//!
//! Call notifications never enter the bounded list. They live in a single
//! call slot that is only cleared by an explicit removal; a second call
//! replaces the first.
//!
//! Removed ids are remembered in a short tombstone list so that attribute
//! responses already in flight for them cannot bring the notification back.

use crate::applist::Application;
use crate::types::{RelayError, Result};
use chrono::NaiveDateTime;
use log::{debug, error, info};
use std::collections::VecDeque;

/// One notification, keyed by the peer's notification id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: u32,
    pub application: Application,
    pub title: String,
    pub body: String,
    pub timestamp: Option<NaiveDateTime>,
    pub complete: bool,
    /// Set by the display once the record has been rendered
    pub presented: bool,
}

impl NotificationRecord {
    pub fn new(id: u32, application: Application) -> Self {
        Self {
            id,
            application,
            title: String::new(),
            body: String::new(),
            timestamp: None,
            complete: false,
            presented: false,
        }
    }

    pub fn is_call(&self) -> bool {
        self.application.is_call()
    }

    /// Recompute completion. Returns true only on the incomplete to complete
    /// transition.
    pub(crate) fn refresh_complete(&mut self) -> bool {
        if self.complete || self.title.is_empty() || self.body.is_empty() {
            return false;
        }
        self.complete = true;
        true
    }
}

/// Capacity-bounded, insertion-ordered notification collection plus the call slot
#[derive(Debug)]
pub struct NotificationStore {
    capacity: usize,
    records: VecDeque<NotificationRecord>,
    call: Option<NotificationRecord>,
    dismissed: VecDeque<u32>,
    dismissed_capacity: usize,
}

impl NotificationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
            call: None,
            dismissed: VecDeque::new(),
            dismissed_capacity: capacity,
        }
    }

    /// Remember up to `dismissed_capacity` removed ids instead of `capacity`.
    pub fn with_dismissed_capacity(mut self, dismissed_capacity: usize) -> Self {
        self.dismissed_capacity = dismissed_capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of regular records; the call slot is not counted.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a regular record, evicting the oldest one first when full.
    ///
    /// A record with the same id is replaced and becomes the newest entry.
    /// Returns the evicted record, if any.
    pub fn insert(&mut self, record: NotificationRecord) -> Option<NotificationRecord> {
        self.remove(record.id);

        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            debug!(
                "Store full ({}), evicted notification {:#010x} (complete={}, presented={})",
                self.capacity, old.id, old.complete, old.presented
            );
        }

        self.records.push_back(record);
        if let Err(e) = self.check_capacity() {
            error!("{}", e);
        }
        evicted
    }

    /// Install a call record, replacing any active call.
    pub fn set_call(&mut self, record: NotificationRecord) -> Option<NotificationRecord> {
        let previous = self.call.replace(record);
        if let Some(old) = &previous {
            info!("Call {:#010x} replaced by a newer call", old.id);
        }
        previous
    }

    pub fn clear_call(&mut self) -> Option<NotificationRecord> {
        self.call.take()
    }

    pub fn active_call(&self) -> Option<&NotificationRecord> {
        self.call.as_ref()
    }

    pub fn is_active_call(&self, id: u32) -> bool {
        self.call.as_ref().is_some_and(|call| call.id == id)
    }

    /// Look up a record in the call slot first, then the bounded list.
    pub fn find(&self, id: u32) -> Option<&NotificationRecord> {
        match &self.call {
            Some(call) if call.id == id => Some(call),
            _ => self.records.iter().find(|record| record.id == id),
        }
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut NotificationRecord> {
        match &mut self.call {
            Some(call) if call.id == id => Some(call),
            _ => self.records.iter_mut().find(|record| record.id == id),
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.find(id).is_some()
    }

    /// Remove a regular record. No-op for unknown ids.
    pub fn remove(&mut self, id: u32) -> Option<NotificationRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        self.records.remove(index)
    }

    /// Record that the peer removed `id`. The oldest tombstone is forgotten
    /// once the list is full.
    pub fn dismiss(&mut self, id: u32) {
        if self.dismissed_capacity == 0 || self.dismissed.contains(&id) {
            return;
        }
        if self.dismissed.len() >= self.dismissed_capacity {
            self.dismissed.pop_front();
        }
        self.dismissed.push_back(id);
    }

    /// Forget a tombstone, e.g. when the peer announces the id again.
    pub fn undismiss(&mut self, id: u32) -> bool {
        match self.dismissed.iter().position(|&dismissed| dismissed == id) {
            Some(index) => {
                self.dismissed.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_dismissed(&self, id: u32) -> bool {
        self.dismissed.contains(&id)
    }

    /// Regular records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    /// Regular records not yet presented, in insertion order
    pub fn unpresented(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter().filter(|record| !record.presented)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.records.iter().map(|record| record.id).collect()
    }

    /// Mark a record (regular or call) as presented. Returns false for unknown ids.
    pub fn mark_presented(&mut self, id: u32) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.presented = true;
                true
            }
            None => false,
        }
    }

    /// Internal-consistency check on the capacity bound.
    pub fn check_capacity(&self) -> Result<()> {
        if self.records.len() > self.capacity {
            return Err(RelayError::CapacityExceeded {
                resident: self.records.len(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sms(id: u32) -> NotificationRecord {
        NotificationRecord::new(id, Application::Sms)
    }

    #[test]
    fn test_insert_and_find() {
        let mut store = NotificationStore::new(8);
        assert!(store.insert(sms(1)).is_none());
        assert!(store.insert(sms(2)).is_none());

        assert_eq!(store.len(), 2);
        assert_eq!(store.find(2).map(|r| r.id), Some(2));
        assert!(store.find(3).is_none());
    }

    #[test]
    fn test_evicts_first_inserted() {
        let mut store = NotificationStore::new(8);
        for id in 1..=8 {
            store.insert(sms(id));
        }
        // Completeness and presentation do not protect a record.
        store.find_mut(1).unwrap().complete = true;
        store.mark_presented(1);

        let evicted = store.insert(sms(9)).unwrap();
        assert_eq!(evicted.id, 1);
        assert_eq!(store.len(), 8);
        assert_eq!(store.ids(), vec![2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut store = NotificationStore::new(3);
        for id in 0..100 {
            store.insert(sms(id));
            assert!(store.len() <= 3);
            assert!(store.check_capacity().is_ok());
        }
        assert_eq!(store.ids(), vec![97, 98, 99]);
    }

    #[test]
    fn test_eviction_is_not_lru() {
        let mut store = NotificationStore::new(2);
        store.insert(sms(1));
        store.insert(sms(2));
        // Touching record 1 does not make it younger.
        store.find_mut(1).unwrap().title = "touched".to_string();
        store.insert(sms(3));
        assert_eq!(store.ids(), vec![2, 3]);
    }

    #[test]
    fn test_reinsert_same_id_replaces() {
        let mut store = NotificationStore::new(3);
        store.insert(sms(1));
        store.insert(sms(2));
        store.insert(NotificationRecord::new(1, Application::Signal));

        assert_eq!(store.len(), 2);
        assert_eq!(store.ids(), vec![2, 1]);
        assert_eq!(store.find(1).unwrap().application, Application::Signal);
    }

    #[test]
    fn test_remove() {
        let mut store = NotificationStore::new(8);
        store.insert(sms(1));
        store.insert(sms(2));

        assert_eq!(store.remove(1).map(|r| r.id), Some(1));
        assert!(store.remove(1).is_none());
        assert!(store.remove(42).is_none());
        assert_eq!(store.ids(), vec![2]);
    }

    #[test]
    fn test_call_slot_outside_capacity() {
        let mut store = NotificationStore::new(2);
        store.set_call(NotificationRecord::new(100, Application::Phone));
        for id in 1..=10 {
            store.insert(sms(id));
        }

        assert_eq!(store.len(), 2);
        assert_eq!(store.active_call().map(|r| r.id), Some(100));
        assert!(store.is_active_call(100));
        assert_eq!(store.find(100).map(|r| r.id), Some(100));
    }

    #[test]
    fn test_second_call_overwrites() {
        let mut store = NotificationStore::new(8);
        store.set_call(NotificationRecord::new(100, Application::Phone));
        let previous = store.set_call(NotificationRecord::new(101, Application::FaceTime));

        assert_eq!(previous.map(|r| r.id), Some(100));
        assert!(!store.is_active_call(100));
        assert!(store.find(100).is_none());
        assert_eq!(store.active_call().map(|r| r.id), Some(101));

        store.clear_call();
        assert!(store.active_call().is_none());
    }

    #[test]
    fn test_unpresented_in_insertion_order() {
        let mut store = NotificationStore::new(8);
        for id in [5, 3, 9, 1] {
            store.insert(sms(id));
        }
        store.mark_presented(3);

        let ids: Vec<u32> = store.unpresented().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 9, 1]);
        assert!(!store.mark_presented(77));
    }

    #[test]
    fn test_refresh_complete_is_edge_triggered() {
        let mut record = sms(1);
        assert!(!record.refresh_complete());

        record.title = "Alice".to_string();
        assert!(!record.refresh_complete());

        record.body = "Hello".to_string();
        assert!(record.refresh_complete());
        assert!(record.complete);

        // Already complete: no second transition.
        record.body = "Hello again".to_string();
        assert!(!record.refresh_complete());
    }

    #[test]
    fn test_dismissed_ids_are_bounded() {
        let mut store = NotificationStore::new(8).with_dismissed_capacity(2);
        store.dismiss(1);
        store.dismiss(1);
        store.dismiss(2);
        assert!(store.is_dismissed(1));

        // Oldest tombstone goes first.
        store.dismiss(3);
        assert!(!store.is_dismissed(1));
        assert!(store.is_dismissed(2));
        assert!(store.is_dismissed(3));

        assert!(store.undismiss(2));
        assert!(!store.undismiss(2));
        assert!(!store.is_dismissed(2));
    }
}
