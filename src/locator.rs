//! Replica-side leader locator: dial the well-known primary address until
//! a connection sticks, then consume its notification stream.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::role::Role;
use crate::wire;
use crate::{DroverNode, RecordStore};

/// Spawn the dial loop. Runs until this node is promoted to primary.
///
/// Failed dials retry after a fixed backoff — no exponential growth, no
/// give-up. A connection that closes (including clean end-of-stream) is
/// discarded and dialing resumes immediately.
pub(crate) fn spawn<S: RecordStore>(node: Arc<DroverNode<S>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let addr = node.config.primary_addr();

        loop {
            if node.role() == Role::Primary {
                info!("Promoted to primary, leader locator exiting");
                return;
            }

            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    // The promotion latch is set before the listener binds,
                    // so a dial that raced promotion and reached our own
                    // listener is caught here.
                    if node.role() == Role::Primary {
                        info!("Promoted to primary, leader locator exiting");
                        return;
                    }
                    info!(primary = %addr, "Connected to primary");
                    node.outbound.store(true, Ordering::Release);
                    receive_loop(&node, stream).await;
                    node.outbound.store(false, Ordering::Release);
                    info!(primary = %addr, "Primary connection closed, resuming dial");
                }
                Err(e) => {
                    node.role_cell.mark_replica();
                    debug!(primary = %addr, error = %e, "Failed to reach primary, retrying");
                    tokio::time::sleep(node.config.dial_backoff).await;
                }
            }
        }
    })
}

/// Consume notifications until the connection errors or closes.
///
/// A frame that fails to decode or apply is logged and dropped; it never
/// takes the loop down.
async fn receive_loop<S: RecordStore>(node: &DroverNode<S>, stream: TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to set nodelay");
    }

    let mut frames = Framed::new(stream, wire::frame_codec());

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => {
                debug!(frame = %frame, "Received notification");
                if let Err(e) = node.apply_frame(&frame) {
                    warn!(error = %e, frame = %frame, "Dropping notification");
                }
            }
            Err(e) => {
                warn!(error = %e, "Read error on primary connection");
                return;
            }
        }
    }
}
