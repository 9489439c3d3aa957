use tokio::sync::mpsc;

use crate::engine::UserId;

/// Default number of lines queued per connection before deliveries are dropped.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 1024;

/// The dispatcher's handle on one connected client.
#[derive(Debug)]
pub struct Session {
    pub id: UserId,
    pub peer: String,
    /// Feeds the connection's write loop (bounded to protect against slow clients).
    outbound: mpsc::Sender<String>,
}

impl Session {
    pub fn new(id: UserId, peer: String, outbound: mpsc::Sender<String>) -> Self {
        Self { id, peer, outbound }
    }

    /// Queue a line for this client. Returns false if the connection is gone
    /// or its queue is full; the line is dropped rather than blocking.
    pub fn send(&self, line: String) -> bool {
        self.outbound.try_send(line).is_ok()
    }
}
