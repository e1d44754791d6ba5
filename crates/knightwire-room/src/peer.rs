//! A connection as rooms see it.

use std::future::Future;
use std::sync::Arc;

use knightwire_transport::ConnectionId;
use tokio::sync::{mpsc, watch};

/// How many frames may wait in a connection's outbound queue before the
/// connection is treated as stalled and closed.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Work item for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send one text frame.
    Text(Arc<str>),
    /// Close the connection.
    Close,
}

/// Handle to one attached connection.
///
/// Cloning is cheap and every clone refers to the same connection:
/// liveness is shared, and sends go to the same outbound queue. Sending
/// never waits; the gateway's writer task drains the queue onto the
/// socket. A peer whose queue fills up is closed instead of buffering
/// without limit.
#[derive(Debug, Clone)]
pub struct Peer {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
    open: Arc<watch::Sender<bool>>,
}

impl Peer {
    /// Wraps the sending half of a connection's outbound queue.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            tx,
            open: Arc::new(watch::Sender::new(true)),
        }
    }

    /// Creates a peer together with the receiver its writer should drain,
    /// using [`OUTBOUND_CAPACITY`].
    pub fn channel(id: ConnectionId) -> (Self, mpsc::Receiver<Outbound>) {
        Self::with_capacity(id, OUTBOUND_CAPACITY)
    }

    /// Like [`channel`](Self::channel) with an explicit queue capacity.
    pub fn with_capacity(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// `false` once the peer was closed or its writer went away.
    pub fn is_open(&self) -> bool {
        *self.open.borrow() && !self.tx.is_closed()
    }

    /// Queues a text frame. Returns `false` if the frame was dropped,
    /// either because the peer is gone or because its queue is full. A
    /// full queue closes the peer.
    pub fn send_text(&self, text: Arc<str>) -> bool {
        if !self.is_open() {
            tracing::debug!(conn_id = %self.id, "skipping send to closed peer");
            return false;
        }
        match self.tx.try_send(Outbound::Text(text)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "outbound queue full, closing stalled peer");
                self.mark_closed();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Marks the peer closed and asks the writer to close the socket.
    /// Frames queued before the close are still delivered.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.flip_closed() {
            // A full queue means the writer is stalled; the gateway notices
            // through `closed()` instead.
            let _ = self.tx.try_send(Outbound::Close);
        }
    }

    /// Marks the peer closed without queueing a close, for when the remote
    /// side already hung up.
    pub fn mark_closed(&self) {
        self.flip_closed();
    }

    /// Resolves once the peer is marked closed, or once every clone of it
    /// has been dropped.
    ///
    /// The returned future does not borrow the peer and does not keep its
    /// outbound queue alive.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut open = self.open.subscribe();
        async move {
            let _ = open.wait_for(|open| !*open).await;
        }
    }

    /// Returns `true` if this call moved the peer from open to closed.
    fn flip_closed(&self) -> bool {
        self.open
            .send_if_modified(|open| std::mem::replace(open, false))
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Peer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_send_text_queues_frame() {
        let (peer, mut rx) = Peer::channel(ConnectionId::new(1));
        assert!(peer.send_text("hello".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("hello".into()));
    }

    #[test]
    fn test_peer_close_queues_close_once() {
        let (peer, mut rx) = Peer::channel(ConnectionId::new(1));
        peer.close();
        peer.close();
        assert!(!peer.is_open());
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_peer_send_after_close_is_skipped() {
        let (peer, mut rx) = Peer::channel(ConnectionId::new(1));
        peer.close();
        assert!(!peer.send_text("late".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_peer_with_dropped_writer_is_not_open() {
        let (peer, rx) = Peer::channel(ConnectionId::new(1));
        drop(rx);
        assert!(!peer.is_open());
        assert!(!peer.send_text("lost".into()));
    }

    #[test]
    fn test_peer_clones_share_liveness() {
        let (peer, _rx) = Peer::channel(ConnectionId::new(1));
        let clone = peer.clone();
        clone.mark_closed();
        assert!(!peer.is_open());
        assert_eq!(peer, clone);
    }

    #[test]
    fn test_peer_full_queue_closes_peer() {
        let (peer, mut rx) = Peer::with_capacity(ConnectionId::new(1), 2);
        assert!(peer.send_text("one".into()));
        assert!(peer.send_text("two".into()));

        assert!(!peer.send_text("three".into()));
        assert!(!peer.is_open());

        // Nothing past the capacity is buffered.
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("one".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("two".into()));
        assert!(rx.try_recv().is_err());
        assert!(!peer.send_text("four".into()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_peer_closed_resolves_on_overflow() {
        let (peer, _rx) = Peer::with_capacity(ConnectionId::new(1), 1);
        let closed = peer.closed();
        assert!(peer.send_text("one".into()));
        assert!(!peer.send_text("two".into()));

        tokio::time::timeout(std::time::Duration::from_secs(1), closed)
            .await
            .expect("closed() should resolve once the queue overflows");
    }

    #[tokio::test]
    async fn test_peer_closed_resolves_when_already_closed() {
        let (peer, _rx) = Peer::channel(ConnectionId::new(1));
        peer.close();
        tokio::time::timeout(std::time::Duration::from_secs(1), peer.closed())
            .await
            .expect("closed() should resolve immediately");
    }

    #[tokio::test]
    async fn test_peer_closed_stays_pending_while_open() {
        let (peer, _rx) = Peer::channel(ConnectionId::new(1));
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), peer.closed()).await;
        assert!(pending.is_err());
    }
}
