//! Bounded command queue between request handlers and the dispatcher.
//!
//! Many producers (one per control request) enqueue; exactly one consumer
//! (the dispatcher) drains. Each enqueue and each drain is atomic with
//! respect to the others, so a drain observes a prefix of the accepted
//! commands in acceptance order and never loses or duplicates one.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::command::Command;
use crate::constants::DEFAULT_QUEUE_CAPACITY;

/// The queue was at capacity; the rejected command is handed back.
#[derive(Debug, Error)]
#[error("command queue full (capacity {capacity})")]
pub struct QueueFull {
    /// Capacity of the queue at the time of rejection.
    pub capacity: usize,
    /// The command that was not accepted.
    pub command: Command,
}

/// Counters describing queue activity since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Commands currently waiting.
    pub pending: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Commands accepted.
    pub enqueued: u64,
    /// Commands rejected for lack of space.
    pub rejected: u64,
    /// Commands handed to the consumer.
    pub drained: u64,
}

#[derive(Debug, Default)]
struct QueueInner {
    items: VecDeque<Command>,
    enqueued: u64,
    rejected: u64,
    drained: u64,
}

/// Bounded FIFO of [`Command`]s.
#[derive(Debug)]
pub struct CommandQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
}

impl CommandQueue {
    /// Create a queue holding at most `capacity` pending commands (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Append a command. Returns its acceptance sequence number (1-based).
    ///
    /// When the queue is full the new command is rejected and everything
    /// already queued is kept.
    pub fn enqueue(&self, command: Command) -> Result<u64, QueueFull> {
        let mut inner = self.inner.lock();
        if inner.items.len() >= self.capacity {
            inner.rejected += 1;
            debug!(kind = command.kind(), capacity = self.capacity, "command rejected");
            return Err(QueueFull {
                capacity: self.capacity,
                command,
            });
        }
        inner.items.push_back(command);
        inner.enqueued += 1;
        Ok(inner.enqueued)
    }

    /// Atomically remove and return every pending command, oldest first.
    pub fn drain(&self) -> Vec<Command> {
        let mut inner = self.inner.lock();
        let items = std::mem::take(&mut inner.items);
        inner.drained += items.len() as u64;
        items.into()
    }

    /// Number of commands waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether no commands are waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the queue counters.
    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        QueueStats {
            pending: inner.items.len(),
            capacity: self.capacity,
            enqueued: inner.enqueued,
            rejected: inner.rejected,
            drained: inner.drained,
        }
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;
    use crate::command::ScrollDirection;

    fn click(n: u32) -> Command {
        Command::Click { x: n, y: n }
    }

    #[test]
    fn drain_empty_queue() {
        let queue = CommandQueue::default();
        assert!(queue.drain().is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn drain_returns_fifo_order() {
        let queue = CommandQueue::new(8);
        let _ = queue.enqueue(Command::Back).unwrap();
        let _ = queue
            .enqueue(Command::Scroll {
                direction: ScrollDirection::Down,
                amount: 100,
            })
            .unwrap();
        let _ = queue.enqueue(Command::Reload).unwrap();
        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0], Command::Back);
        assert_eq!(drained[2], Command::Reload);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn enqueue_returns_increasing_sequence() {
        let queue = CommandQueue::new(4);
        assert_eq!(queue.enqueue(Command::Home).unwrap(), 1);
        assert_eq!(queue.enqueue(Command::Home).unwrap(), 2);
        let _ = queue.drain();
        assert_eq!(queue.enqueue(Command::Home).unwrap(), 3);
    }

    #[test]
    fn full_queue_rejects_newest() {
        let queue = CommandQueue::new(2);
        let _ = queue.enqueue(click(1)).unwrap();
        let _ = queue.enqueue(click(2)).unwrap();
        let err = queue.enqueue(click(3)).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(err.command, click(3));
        assert_eq!(queue.drain(), vec![click(1), click(2)]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let queue = CommandQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.enqueue(Command::Back).is_ok());
        assert!(queue.enqueue(Command::Back).is_err());
    }

    #[test]
    fn stats_track_activity() {
        let queue = CommandQueue::new(1);
        let _ = queue.enqueue(Command::Forward).unwrap();
        let _ = queue.enqueue(Command::Forward).unwrap_err();
        assert_eq!(
            queue.stats(),
            QueueStats {
                pending: 1,
                capacity: 1,
                enqueued: 1,
                rejected: 1,
                drained: 0,
            }
        );
        let _ = queue.drain();
        let stats = queue.stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.drained, 1);
    }

    #[test]
    fn stats_serialize_camel_case() {
        let json = serde_json::to_value(CommandQueue::new(3).stats()).unwrap();
        assert_eq!(json["capacity"], 3);
        assert!(json.get("pending").is_some());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(CommandQueue::new(10_000));
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..500u32 {
                        let _ = queue.enqueue(Command::Click { x: p, y: i }).unwrap();
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while seen.len() < 2000 {
            seen.extend(queue.drain());
            thread::yield_now();
        }
        for handle in producers {
            handle.join().unwrap();
        }
        seen.extend(queue.drain());
        assert_eq!(seen.len(), 2000);

        for p in 0..4u32 {
            let ys: Vec<u32> = seen
                .iter()
                .filter_map(|c| match c {
                    Command::Click { x, y } if *x == p => Some(*y),
                    _ => None,
                })
                .collect();
            assert_eq!(ys, (0..500).collect::<Vec<_>>(), "producer {p} out of order");
        }
    }

    proptest! {
        #[test]
        fn interleaved_drains_preserve_acceptance_order(
            ops in prop::collection::vec(prop::option::of(0u32..1000), 0..200),
            capacity in 1usize..32,
        ) {
            let queue = CommandQueue::new(capacity);
            let mut accepted = Vec::new();
            let mut drained = Vec::new();
            for op in ops {
                match op {
                    Some(n) => {
                        if queue.enqueue(click(n)).is_ok() {
                            accepted.push(click(n));
                        }
                    }
                    None => drained.extend(queue.drain()),
                }
                prop_assert!(queue.len() <= capacity);
            }
            drained.extend(queue.drain());
            prop_assert_eq!(drained, accepted);
        }
    }
}
