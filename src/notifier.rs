//! Change notifier: the publish/subscribe fan-out behind `/events`.
//!
//! Every open event stream owns one [`ListenerHandle`]. Publishing pushes a
//! [`Notice`] into each listener's bounded channel. Delivery is a hint, not a
//! log: a listener whose receiving side is gone is pruned on the spot, a
//! listener whose buffer is full misses that one notice.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// per-listener buffer. a browser that falls this far behind only needs one reload anyway
const LISTENER_CAPACITY: usize = 16;

/// message pushed to every listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// shared folder contents changed
    Reload,
    /// server is stopping
    Shutdown,
}

impl Notice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notice::Reload => "reload",
            Notice::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// receiving end of one registration
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    rx: mpsc::Receiver<Notice>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// wait for the next notice. None once the listener was unsubscribed
    pub async fn recv(&mut self) -> Option<Notice> {
        self.rx.recv().await
    }

    /// next notice if one is already queued
    pub fn try_recv(&mut self) -> Option<Notice> {
        self.rx.try_recv().ok()
    }
}

/// listener registry owned by the server instance
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    listeners: DashMap<ListenerId, mpsc::Sender<Notice>>,
    next_id: AtomicU64,
    // publishers go through here one at a time so every listener sees the same order
    publish_lock: Mutex<()>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ListenerHandle {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        self.listeners.insert(id, tx);
        tracing::debug!("👂 {} subscribed ({} active)", id, self.listeners.len());
        ListenerHandle { id, rx }
    }

    /// drop a registration. returns false if it was already gone
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            tracing::debug!("{} unsubscribed ({} active)", id, self.listeners.len());
        }
        removed
    }

    /// push `notice` to every registered listener, returns how many got it
    pub fn publish(&self, notice: Notice) -> usize {
        let _serialized = self
            .publish_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut delivered = 0;
        self.listeners.retain(|id, tx| match tx.try_send(notice) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::trace!("{} is lagging, dropped {}", id, notice);
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Pruning disconnected {}", id);
                false
            }
        });

        tracing::debug!("📣 Published {} to {} listener(s)", notice, delivered);
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
