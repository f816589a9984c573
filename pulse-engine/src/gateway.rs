use std::sync::Arc;

use dashmap::DashMap;
use pulse_core::EngineHandle;
use pulse_types::{Quote, StockCode};
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

/// One batch of deltas fanned out to every connected client.
pub type QuoteBatch = Vec<(StockCode, Quote)>;

/// Fans scheduler/cache deltas out to every connected client.
///
/// Transport-agnostic: `pulse-server` owns the actual `/stocks_realtime`
/// websocket connections and is responsible for serializing a [`QuoteBatch`]
/// into the wire `realtime_update` event. A client whose channel is full or
/// closed is dropped silently for that batch — best-effort, no retry,
/// mirroring the original system's `socketio.emit` fire-and-forget
/// semantics.
#[derive(Default)]
pub struct Gateway {
    clients: DashMap<Uuid, mpsc::Sender<QuoteBatch>>,
}

impl Gateway {
    /// Create an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a new client connection, returning its id and the receiving
    /// half of its delta channel. `buffer` bounds how many pending batches
    /// a slow client can accumulate before further batches are dropped for
    /// it.
    #[must_use]
    pub fn register(&self, buffer: usize) -> (Uuid, mpsc::Receiver<QuoteBatch>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.clients.insert(id, tx);
        (id, rx)
    }

    /// Drop a client connection, e.g. on websocket close.
    pub fn unregister(&self, id: Uuid) {
        self.clients.remove(&id);
    }

    /// Send `batch` directly to one client, e.g. the initial snapshot
    /// answering a `refresh_realtime_data` request.
    pub fn send_to(&self, id: Uuid, batch: QuoteBatch) {
        if let Some(tx) = self.clients.get(&id) {
            if tx.try_send(batch).is_err() {
                tracing::debug!(client = %id, "dropped snapshot send: client backpressured or gone");
            }
        }
    }

    /// Fan `batch` out to every registered client.
    pub fn broadcast(&self, batch: &QuoteBatch) {
        for entry in &self.clients {
            if entry.value().try_send(batch.clone()).is_err() {
                tracing::debug!(client = %entry.key(), "dropped broadcast: client backpressured or gone");
            }
        }
    }

    /// Number of currently registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Spawn the loop that drains `deltas_rx` and broadcasts each batch,
    /// until `shutdown` flips or the channel closes.
    pub fn spawn(self: Arc<Self>, mut deltas_rx: mpsc::Receiver<QuoteBatch>, mut shutdown: watch::Receiver<bool>) -> EngineHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let gateway = self;
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    maybe_batch = deltas_rx.recv() => {
                        match maybe_batch {
                            Some(batch) => gateway.broadcast(&batch),
                            None => break,
                        }
                    }
                }
            }
        });
        EngineHandle::new(join, stop_tx)
    }
}
