//! # Shared Deque
//!
//! Thread-safe double-ended queue with a blocking wait-for-nonempty.
//!
//! This is the single synchronization structure underneath the whole
//! messaging layer: each connection buffers its outbound messages in one,
//! and every endpoint funnels completed inbound messages from all of its
//! connections into one shared instance that the application drains at its
//! own pace.
//!
//! Locking is deliberately coarse - one mutex held for the duration of each
//! call. Message volume in this system is bursty rather than a sustained
//! firehose, so correctness wins over a lock-free fast path.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

/// A mutex-protected deque supporting push/pop at both ends plus a
/// condition-variable-gated wait until non-empty.
///
/// All operations take `&self`; the structure is intended to be shared
/// behind an `Arc` or embedded in an already-shared owner.
pub struct SharedDeque<T> {
    items: Mutex<VecDeque<T>>,
    nonempty: Condvar,
}

impl<T> SharedDeque<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            nonempty: Condvar::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A poisoned lock means a panic elsewhere; the queue itself is
        // still structurally sound, so recover the guard rather than
        // propagate the panic into the I/O path.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item at the tail and wakes one waiter.
    pub fn push_back(&self, item: T) {
        self.lock().push_back(item);
        self.nonempty.notify_one();
    }

    /// Prepends an item at the head and wakes one waiter.
    pub fn push_front(&self, item: T) {
        self.lock().push_front(item);
        self.nonempty.notify_one();
    }

    /// Removes and returns the head item, if any.
    pub fn pop_front(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes and returns the tail item, if any.
    pub fn pop_back(&self) -> Option<T> {
        self.lock().pop_back()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drops every queued item.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Blocks the calling thread until the queue is non-empty.
    ///
    /// Must only be called from an application thread, never from the I/O
    /// thread - the I/O event loop is single-threaded and parking it would
    /// stall every connection on the endpoint.
    pub fn wait(&self) {
        let mut guard = self.lock();
        while guard.is_empty() {
            guard = self
                .nonempty
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<T: Clone> SharedDeque<T> {
    /// Returns a clone of the head item without removing it.
    pub fn front(&self) -> Option<T> {
        self.lock().front().cloned()
    }

    /// Returns a clone of the tail item without removing it.
    pub fn back(&self) -> Option<T> {
        self.lock().back().cloned()
    }
}

impl<T> Default for SharedDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn push_pop_both_ends() {
        let q = SharedDeque::new();
        q.push_back(1);
        q.push_back(2);
        q.push_front(0);

        assert_eq!(q.len(), 3);
        assert_eq!(q.front(), Some(0));
        assert_eq!(q.back(), Some(2));
        assert_eq!(q.pop_front(), Some(0));
        assert_eq!(q.pop_back(), Some(2));
        assert_eq!(q.pop_front(), Some(1));
        assert_eq!(q.pop_front(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn clear_empties_queue() {
        let q = SharedDeque::new();
        for i in 0..10 {
            q.push_back(i);
        }
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn wait_returns_after_push() {
        let q = Arc::new(SharedDeque::new());

        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                q.push_back(42u32);
            })
        };

        let start = Instant::now();
        q.wait();
        let waited = start.elapsed();

        assert_eq!(q.pop_front(), Some(42));
        // Should wake promptly once the item lands, not spin until some
        // unrelated timeout.
        assert!(waited < Duration::from_secs(5));
        producer.join().expect("producer thread");
    }

    #[test]
    fn wait_returns_immediately_when_nonempty() {
        let q = SharedDeque::new();
        q.push_back(1);
        q.wait();
        assert_eq!(q.pop_front(), Some(1));
    }
}
