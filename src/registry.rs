//! Primary-side registry of live follower connections.
//!
//! Sockets are never shared between tasks: each follower connection is
//! owned by exactly one task (see `listener`), reached through a bounded
//! channel. The map itself sits behind an `RwLock` so registration (a
//! follower connecting) and pruning (a broadcast in progress) can race
//! without corrupting iteration.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Frames queued per follower before it is treated as unreachable.
const FOLLOWER_QUEUE: usize = 256;

pub(crate) struct FollowerRegistry {
    followers: RwLock<HashMap<SocketAddr, mpsc::Sender<String>>>,
}

impl FollowerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            followers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly accepted follower and hand back the receive end
    /// of its outbound queue.
    pub(crate) async fn register(&self, addr: SocketAddr) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(FOLLOWER_QUEUE);
        let previous = self.followers.write().await.insert(addr, tx);
        if previous.is_some() {
            debug!(follower = %addr, "Replaced stale follower registration");
        } else {
            debug!(follower = %addr, "Follower registered");
        }
        rx
    }

    pub(crate) async fn remove(&self, addr: &SocketAddr) {
        if self.followers.write().await.remove(addr).is_some() {
            debug!(follower = %addr, "Follower deregistered");
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.followers.read().await.len()
    }

    /// Queue `frame` to every registered follower, pruning those whose
    /// send fails. Returns the number of successful deliveries.
    ///
    /// A follower with a full queue is treated the same as a dead one:
    /// dropped now, expected to reconnect and catch up on its own. A slow
    /// follower therefore never blocks delivery to the others.
    pub(crate) async fn send_or_drop(&self, frame: &str) -> usize {
        let snapshot: Vec<(SocketAddr, mpsc::Sender<String>)> = {
            let followers = self.followers.read().await;
            followers.iter().map(|(a, tx)| (*a, tx.clone())).collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (addr, tx) in snapshot {
            match tx.try_send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(follower = %addr, "Follower queue full, dropping connection");
                    dead.push(addr);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(follower = %addr, "Follower gone, dropping connection");
                    dead.push(addr);
                }
            }
        }

        if !dead.is_empty() {
            let mut followers = self.followers.write().await;
            for addr in &dead {
                followers.remove(addr);
            }
        }

        delivered
    }
}
