//! Pending-fetch queue
//!
//! Hands notification ids from the transport callback, which must never
//! block, to the fetch worker that issues attribute requests. Ordering is
//! FIFO: under a burst the oldest announced notification is fetched first,
//! so older notifications cannot be starved by newer ones.
//!
//! The queue is bounded. When it is full the incoming id is dropped; a peer
//! flooding "added" events cannot grow memory without limit. The bound has to
//! cover the replay a peer sends on reconnect, where every pre-existing
//! notification arrives as "added" at once. Ids dropped from such a replay
//! are never fetched, which is why the default is 64 and the relay counts
//! them. The consumer
//! waits on the channel rather than polling, so an idle relay uses no CPU and
//! a new id is picked up as soon as the worker task is scheduled.

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Create a connected producer/consumer pair holding at most `capacity` ids.
pub fn pending_fetch_queue(capacity: usize) -> (PendingFetchProducer, PendingFetchConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PendingFetchProducer { tx },
        PendingFetchConsumer { rx },
    )
}

/// Producer half, used from the transport callback context
#[derive(Clone, Debug)]
pub struct PendingFetchProducer {
    tx: mpsc::Sender<u32>,
}

impl PendingFetchProducer {
    /// Queue an id without blocking. Returns false if it was dropped.
    pub fn enqueue(&self, id: u32) -> bool {
        match self.tx.try_send(id) {
            Ok(()) => {
                debug!("Queued notification {:#010x} for attribute fetch", id);
                true
            }
            Err(TrySendError::Full(id)) => {
                warn!(
                    "Pending-fetch queue full, dropping notification {:#010x}",
                    id
                );
                false
            }
            Err(TrySendError::Closed(id)) => {
                warn!(
                    "Fetch worker gone, dropping notification {:#010x}",
                    id
                );
                false
            }
        }
    }
}

/// Consumer half, owned by the fetch worker
#[derive(Debug)]
pub struct PendingFetchConsumer {
    rx: mpsc::Receiver<u32>,
}

impl PendingFetchConsumer {
    /// Wait for the next id. Returns `None` once every producer is dropped
    /// and the queue is drained.
    pub async fn next(&mut self) -> Option<u32> {
        self.rx.recv().await
    }

    /// Take the next id if one is already queued.
    pub fn try_next(&mut self) -> Option<u32> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let (producer, mut consumer) = pending_fetch_queue(8);
        for id in [10, 20, 30] {
            assert!(producer.enqueue(id));
        }

        assert_eq!(consumer.next().await, Some(10));
        assert_eq!(consumer.next().await, Some(20));
        assert_eq!(consumer.next().await, Some(30));
        assert_eq!(consumer.try_next(), None);
    }

    #[tokio::test]
    async fn test_drops_when_full() {
        let (producer, mut consumer) = pending_fetch_queue(2);
        assert!(producer.enqueue(1));
        assert!(producer.enqueue(2));
        assert!(!producer.enqueue(3));

        assert_eq!(consumer.try_next(), Some(1));
        assert_eq!(consumer.try_next(), Some(2));
        assert_eq!(consumer.try_next(), None);
    }

    #[tokio::test]
    async fn test_closed_after_producers_dropped() {
        let (producer, mut consumer) = pending_fetch_queue(4);
        producer.enqueue(5);
        drop(producer);

        assert_eq!(consumer.next().await, Some(5));
        assert_eq!(consumer.next().await, None);
    }

    #[tokio::test]
    async fn test_enqueue_from_plain_thread() {
        let (producer, mut consumer) = pending_fetch_queue(4);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.enqueue(0x42)
        });

        // Consumer blocks until the id arrives.
        let id = tokio::time::timeout(Duration::from_secs(2), consumer.next())
            .await
            .unwrap();
        assert_eq!(id, Some(0x42));
        assert!(handle.join().unwrap());
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_dropped() {
        let (producer, consumer) = pending_fetch_queue(4);
        drop(consumer);
        assert!(!producer.enqueue(1));
    }
}
