//! # Out-of-band Handlers
//!
//! Completed control messages (commands and subnegotiations) are fanned out
//! to every registered [`Handler`]. Each handler is wrapped in a runner that
//! owns a bounded inbox and a dedicated thread pulling from it, so a slow
//! handler only delays its own inbox.
//!
//! ## Overflow Policy
//! Dispatch never blocks. If a handler's inbox is full when a message is
//! offered, the handler is considered unresponsive: its inbox is closed and
//! it is evicted from the registry. It receives nothing further.

use crate::error::TelnetResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Inbox capacity for user-registered handlers
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Inbox capacity for the built-in system handlers
pub const SYSTEM_QUEUE_CAPACITY: usize = 1024;

/// A consumer of out-of-band (`IAC ...`) messages.
///
/// Every handler sees every message; it is up to the handler to check
/// whether a message applies to it, e.g. with
/// [`has_seq_prefix`](crate::protocol::has_seq_prefix).
/// `handle` runs on the handler's own thread and should return quickly.
pub trait Handler: Send + 'static {
    fn handle(&mut self, message: &[u8]);
}

impl<F> Handler for F
where
    F: FnMut(&[u8]) + Send + 'static,
{
    fn handle(&mut self, message: &[u8]) {
        self(message)
    }
}

/// Identifies a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

struct HandlerRunner {
    id: HandlerId,
    capacity: usize,
    inbox: SyncSender<Vec<u8>>,
    // Detached on drop: closing `inbox` is what stops the thread.
    _thread: JoinHandle<()>,
}

impl HandlerRunner {
    fn spawn(id: HandlerId, capacity: usize, mut handler: Box<dyn Handler>) -> TelnetResult<Self> {
        let (inbox, messages) = mpsc::sync_channel::<Vec<u8>>(capacity);
        let thread = thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                // Ends once the registry drops the sending half
                for message in messages {
                    handler.handle(&message);
                }
                debug!(handler = %id, "handler inbox closed");
            })?;

        Ok(Self {
            id,
            capacity,
            inbox,
            _thread: thread,
        })
    }

    /// Offer a message without blocking. Returns false if the runner is dead.
    fn offer(&self, message: Vec<u8>) -> bool {
        match self.inbox.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    handler = %self.id,
                    capacity = self.capacity,
                    "handler unresponsive, inbox full; evicting"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(handler = %self.id, "handler thread gone; evicting");
                false
            }
        }
    }
}

/// The set of live handler runners for one connection
pub struct HandlerRegistry {
    runners: Mutex<Vec<HandlerRunner>>,
    next_id: AtomicU64,
    default_capacity: usize,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl HandlerRegistry {
    /// Create an empty registry whose `register` uses `default_capacity`
    pub fn new(default_capacity: usize) -> Self {
        Self {
            runners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            default_capacity: default_capacity.max(1),
        }
    }

    fn runners(&self) -> MutexGuard<'_, Vec<HandlerRunner>> {
        // The vector is never left half-updated, so a poisoned lock is still usable
        self.runners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a handler with the default inbox capacity
    pub fn register<H: Handler>(&self, handler: H) -> TelnetResult<HandlerId> {
        self.register_with_capacity(handler, self.default_capacity)
    }

    /// Register a handler with an explicit inbox capacity (minimum 1)
    pub fn register_with_capacity<H: Handler>(
        &self,
        handler: H,
        capacity: usize,
    ) -> TelnetResult<HandlerId> {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let capacity = capacity.max(1);

        let mut runners = self.runners();
        let runner = HandlerRunner::spawn(id, capacity, Box::new(handler))?;
        runners.push(runner);
        debug!(handler = %id, capacity, "handler registered");
        Ok(id)
    }

    /// Remove a handler and close its inbox. Returns false if it was not
    /// registered (or was already evicted).
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut runners = self.runners();
        let before = runners.len();
        runners.retain(|runner| runner.id != id);
        before != runners.len()
    }

    /// Hand a copy of `message` to every live handler.
    ///
    /// Never blocks and never fails; handlers whose inbox is full are
    /// evicted while the registry lock is held.
    pub fn dispatch(&self, message: &[u8]) {
        let mut runners = self.runners();
        runners.retain(|runner| runner.offer(message.to_vec()));
    }

    /// Number of live handlers
    pub fn len(&self) -> usize {
        self.runners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners().is_empty()
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: HandlerId) -> bool {
        self.runners().iter().any(|runner| runner.id == id)
    }

    /// Close every inbox and forget all handlers
    pub fn clear(&self) {
        self.runners().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc::{Receiver, channel};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn forwarding_handler() -> (impl Handler, Receiver<Vec<u8>>) {
        let (tx, rx) = channel();
        let handler = move |msg: &[u8]| {
            let _ = tx.send(msg.to_vec());
        };
        (handler, rx)
    }

    #[test]
    fn test_register_and_dispatch() {
        let registry = HandlerRegistry::default();
        let (handler, rx) = forwarding_handler();
        registry.register(handler).unwrap();

        registry.dispatch(&[0xFF, 0xFD, 0xC9]);

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![0xFF, 0xFD, 0xC9]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_every_handler_gets_a_copy() {
        let registry = HandlerRegistry::default();
        let (first, rx1) = forwarding_handler();
        let (second, rx2) = forwarding_handler();
        registry.register(first).unwrap();
        registry.register(second).unwrap();

        registry.dispatch(b"one");
        registry.dispatch(b"two");

        for rx in [rx1, rx2] {
            assert_eq!(rx.recv_timeout(WAIT).unwrap(), b"one".to_vec());
            assert_eq!(rx.recv_timeout(WAIT).unwrap(), b"two".to_vec());
        }
    }

    #[test]
    fn test_dispatch_with_no_handlers() {
        let registry = HandlerRegistry::default();
        registry.dispatch(b"nobody home");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_closes_every_inbox() {
        let registry = HandlerRegistry::default();
        let (first, rx1) = forwarding_handler();
        let (second, rx2) = forwarding_handler();
        registry.register(first).unwrap();
        registry.register(second).unwrap();

        registry.clear();
        assert!(registry.is_empty());

        registry.dispatch(b"gone");
        for rx in [rx1, rx2] {
            // Sender side dropped with the runner
            assert_eq!(
                rx.recv_timeout(WAIT),
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected)
            );
        }
    }

    #[test]
    fn test_unregister() {
        let registry = HandlerRegistry::default();
        let (handler, rx) = forwarding_handler();
        let id = registry.register(handler).unwrap();

        assert!(registry.contains(id));
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(!registry.contains(id));

        registry.dispatch(b"late");
        // Inbox closed and nothing delivered
        assert!(rx.recv_timeout(WAIT).is_err());
    }

    #[test]
    fn test_full_inbox_evicts_only_that_handler() {
        let registry = HandlerRegistry::default();

        // A handler that blocks on its first message until released
        let (release_tx, release_rx) = channel::<()>();
        let (stuck_seen_tx, stuck_seen_rx) = channel::<Vec<u8>>();
        let stuck = move |msg: &[u8]| {
            let _ = stuck_seen_tx.send(msg.to_vec());
            let _ = release_rx.recv();
        };
        let stuck_id = registry.register_with_capacity(stuck, 2).unwrap();

        let (healthy, healthy_rx) = forwarding_handler();
        let healthy_id = registry.register(healthy).unwrap();

        for i in 0..5u8 {
            registry.dispatch(&[i]);
        }

        assert!(!registry.contains(stuck_id));
        assert!(registry.contains(healthy_id));
        assert_eq!(registry.len(), 1);

        registry.dispatch(b"after");

        for i in 0..5u8 {
            assert_eq!(healthy_rx.recv_timeout(WAIT).unwrap(), vec![i]);
        }
        assert_eq!(healthy_rx.recv_timeout(WAIT).unwrap(), b"after".to_vec());

        // Let the stuck handler drain whatever it had accepted
        drop(release_tx);
        let mut seen = Vec::new();
        while let Ok(msg) = stuck_seen_rx.recv_timeout(WAIT) {
            seen.push(msg);
        }
        assert!(seen.len() <= 3);
        assert!(!seen.contains(&b"after".to_vec()));
    }

    struct Exploding(std::sync::mpsc::Sender<()>);

    impl Handler for Exploding {
        fn handle(&mut self, _message: &[u8]) {
            let _ = self.0.send(());
            panic!("handler blew up");
        }
    }

    #[test]
    fn test_panicked_handler_is_evicted() {
        let registry = HandlerRegistry::default();
        let (done_tx, done_rx) = channel::<()>();
        let id = registry.register(Exploding(done_tx)).unwrap();

        registry.dispatch(b"boom");
        done_rx.recv_timeout(WAIT).unwrap();

        // The thread unwinds shortly after; keep offering until it is noticed
        for _ in 0..200 {
            if !registry.contains(id) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            registry.dispatch(b"ping");
        }
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_concurrent_registration_and_dispatch() {
        let registry = Arc::new(HandlerRegistry::default());
        let mut receivers = Vec::new();
        let mut joins = Vec::new();

        for _ in 0..4 {
            let (handler, rx) = forwarding_handler();
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            joins.push(std::thread::spawn(move || {
                registry.register(handler).unwrap();
            }));
        }
        for _ in 0..10 {
            registry.dispatch(b"x");
        }
        for join in joins {
            join.join().unwrap();
        }

        assert_eq!(registry.len(), 4);
        registry.dispatch(b"final");
        for rx in receivers {
            loop {
                let msg = rx.recv_timeout(WAIT).unwrap();
                if msg == b"final" {
                    break;
                }
            }
        }
    }
}
