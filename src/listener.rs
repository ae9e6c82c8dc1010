//! Primary-side listener: accepts follower connections on the well-known
//! port after promotion.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::wire;
use crate::{DroverNode, RecordStore};

/// Spawn the accept loop.
///
/// The returned receiver resolves once the bind attempt has settled, so
/// the promotion path returns only after the listener is accepting — or
/// has logged a bind conflict and stood down. A conflict is treated as
/// evidence that a listener is already active on this host; the node
/// continues as primary either way.
pub(crate) fn spawn<S: RecordStore>(node: Arc<DroverNode<S>>) -> oneshot::Receiver<()> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let port = node.config.port;

    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => {
                info!(addr = %addr, "Follower listener accepting");
                let _ = ready_tx.send(());
                l
            }
            Err(e) => {
                error!(error = %e, addr = %addr, "Failed to bind follower listener, continuing as primary");
                let _ = ready_tx.send(());
                return;
            }
        };

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    debug!(follower = %peer_addr, "Follower connected");
                    let node = Arc::clone(&node);
                    tokio::spawn(async move {
                        serve_follower(node, stream, peer_addr).await;
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept follower connection");
                }
            }
        }
    });

    ready_rx
}

/// Own one follower connection for its whole lifetime.
///
/// Forwards queued frames to the socket and watches the read side solely
/// to observe closure — followers are not expected to send anything. On
/// any exit path the follower is removed from the registry.
async fn serve_follower<S: RecordStore>(
    node: Arc<DroverNode<S>>,
    stream: TcpStream,
    peer_addr: SocketAddr,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(follower = %peer_addr, error = %e, "Failed to set nodelay");
    }

    let framed = Framed::new(stream, wire::frame_codec());
    let (mut sink, mut frames) = framed.split();
    let mut queue = node.registry.register(peer_addr).await;

    loop {
        tokio::select! {
            outbound = queue.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        debug!(follower = %peer_addr, error = %e, "Send to follower failed");
                        break;
                    }
                }
                // Registry pruned this follower mid-broadcast.
                None => break,
            },
            inbound = frames.next() => match inbound {
                Some(Ok(frame)) => {
                    debug!(follower = %peer_addr, frame = %frame, "Ignoring frame from follower");
                }
                Some(Err(e)) => {
                    debug!(follower = %peer_addr, error = %e, "Follower read error");
                    break;
                }
                None => {
                    debug!(follower = %peer_addr, "Follower disconnected");
                    break;
                }
            },
        }
    }

    node.registry.remove(&peer_addr).await;
}
