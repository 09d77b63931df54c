//! # Zero-Copy Race Frame Dispatcher
//!
//! The `Dispatcher` is the subscriber set of the feed. Connection handlers
//! register here and get a channel back; the tick loop hands each serialized
//! payload to `broadcast` exactly once.
//!
//! ## Core Design Principles:
//!
//! 1.  **Zero-Copy Fan-out**: a frame is serialized once and wrapped in an
//!     `Arc`. Every client receives a new pointer to the same bytes.
//!
//! 2.  **Never Block on a Client**: each client owns a small bounded MPSC
//!     channel fed with `try_send`, so a send completes immediately whether
//!     the socket behind it is fast, slow or gone. A client that stops
//!     draining misses frames once its buffer is full instead of growing it
//!     without limit. Writing to the socket happens in the client's own task.
//!
//! 3.  **Self-Healing Membership**: a failed send means the receiving half was
//!     dropped (the connection task ended). The client is removed during that
//!     same fan-out without disturbing delivery to anyone else.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::FeedError;

/// # Race Frame
///
/// One tick's payload as it goes over the wire, plus pipeline metadata.
#[derive(Debug, Clone)]
pub struct RaceFrame {
    /// Monotonic tick counter of the loop that produced the frame.
    pub tick: u64,
    /// Name of the source whose record the payload was built from.
    pub source: String,
    /// When the tick started collecting, for latency measurement.
    pub started_at: Instant,
    /// The serialized `RacePayload`: newline-free UTF-8 JSON.
    pub text: String,
}

/// Frames as received by a client task.
pub type FrameReceiver = mpsc::Receiver<Arc<RaceFrame>>;

/// Frames a client may fall behind by before new ones are dropped for it.
pub const CLIENT_BUFFER: usize = 8;

/// # Client Handle
///
/// The dispatcher's side of one connected subscriber.
struct ClientHandle {
    /// Identifier assigned by the connection surface, used in logs and removal.
    id: String,
    /// Sending half of the client's frame channel.
    sender: mpsc::Sender<Arc<RaceFrame>>,
}

/// # Core Dispatcher
///
/// Registration, removal and fan-out for every live subscriber. Cheap to
/// share behind an `Arc`; the lock is never held across an `.await`.
#[derive(Default)]
pub struct Dispatcher {
    clients: Mutex<Vec<ClientHandle>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Add Client
    ///
    /// Registers a subscriber and returns the receiving half of its channel.
    /// Dropping the receiver is enough to unsubscribe: the next broadcast
    /// notices and removes the handle.
    pub fn add_client(&self, id: &str) -> FrameReceiver {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.lock_clients().push(ClientHandle {
            id: id.to_string(),
            sender: tx,
        });
        log::info!("Client '{}' registered", id);
        rx
    }

    /// # Broadcast
    ///
    /// Sends `frame` to every registered client and drops the ones whose
    /// channel is closed. A client with a full buffer stays registered but
    /// skips this frame. Returns the number of clients that accepted it.
    pub fn broadcast(&self, frame: RaceFrame) -> usize {
        let frame = Arc::new(frame);
        let mut clients = self.lock_clients();
        let mut delivered = 0;

        clients.retain(|client| match client.sender.try_send(Arc::clone(&frame)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::warn!("Client '{}' is {} frames behind, skipping tick {}", client.id, CLIENT_BUFFER, frame.tick);
                true
            }
            Err(TrySendError::Closed(_)) => {
                let err = FeedError::Delivery {
                    client_id: client.id.clone(),
                };
                log::info!("{}. Removing from dispatcher.", err);
                false
            }
        });

        log::debug!(
            "Tick {} ({}) delivered to {} of {} client(s)",
            frame.tick,
            frame.source,
            delivered,
            clients.len()
        );
        delivered
    }

    /// Removes a specific client by its ID.
    pub fn remove_client(&self, id: &str) {
        let mut clients = self.lock_clients();
        let before = clients.len();
        clients.retain(|c| c.id != id);
        if clients.len() < before {
            log::info!("Client '{}' explicitly removed.", id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.lock_clients().len()
    }

    // Membership edits are single push/retain calls, so a poisoned list is
    // still consistent.
    fn lock_clients(&self) -> MutexGuard<'_, Vec<ClientHandle>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
