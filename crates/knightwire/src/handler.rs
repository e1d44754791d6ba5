//! Per-connection handler: the gateway between a socket and the
//! coordinator.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task:
//!   1. The writer drains the connection's outbound queue onto the socket
//!   2. The reader feeds every inbound frame to the coordinator, in order,
//!      and stops as soon as the peer is closed (rejected, evicted, or too
//!      slow to drain its queue)
//!   3. On close, the session is detached from its room and the writer
//!      gets a moment to flush

use std::sync::Arc;
use std::time::Duration;

use knightwire_protocol::Codec;
use knightwire_room::{Outbound, Peer, PositionValidator};
use knightwire_session::{Coordinator, Session};
use knightwire_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

/// How long the writer may keep flushing after the reader is done.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, C>(
    conn: WebSocketConnection,
    coordinator: Arc<Coordinator<V, C>>,
) where
    V: PositionValidator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (peer, outbound) = Peer::channel(conn_id);
    let mut writer = tokio::spawn(write_outbound(Arc::clone(&conn), outbound));
    let closed = peer.closed();
    tokio::pin!(closed);
    let mut session = Session::new(peer);

    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            () = &mut closed => {
                tracing::debug!(%conn_id, "peer closed by server");
                break;
            }
        };
        match received {
            Ok(Some(data)) => coordinator.handle_frame(&mut session, &data).await,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    coordinator.disconnect(&mut session).await;
    // Dropping the last sender lets the writer finish once it has flushed.
    drop(session);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::debug!(%conn_id, "writer did not drain in time");
        writer.abort();
    }
    tracing::debug!(%conn_id, "connection handler finished");
}

/// Writes queued frames until a close is requested, the queue is dropped,
/// or the socket fails. Closes the socket on the way out.
async fn write_outbound(conn: Arc<WebSocketConnection>, mut outbound: mpsc::Receiver<Outbound>) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Text(text) => {
                if let Err(e) = conn.send(&text).await {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}
