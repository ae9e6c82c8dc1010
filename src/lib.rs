//! drover — primary/replica write propagation for record-store services.
//!
//! Several identical application instances run behind a load balancer
//! that steers every write to one of them. drover lets each instance
//! discover whether it is that primary, fans completed writes out to
//! connected replicas over a text wire protocol, and applies incoming
//! notifications to the local store on the replica side.
//!
//! # Quick start
//!
//! 1. Implement [`RecordStore`] on your storage layer.
//! 2. Construct a [`Config`] and a [`DroverNode`], then call
//!    [`start`](DroverNode::start).
//! 3. Wire [`attach`](DroverNode::attach) into your write-hook system, or
//!    call [`handle_before_create`](DroverNode::handle_before_create) and
//!    [`handle_after_create`](DroverNode::handle_after_create) from your
//!    own hooks.
//!
//! Every node starts replica-leaning: the leader locator dials the
//! well-known primary address until it connects. A node that sees a local
//! write while disconnected concludes it is the primary, latches the
//! role, and starts accepting followers.

pub mod config;
pub mod wire;

mod broadcast;
mod hooks;
mod ingest;
mod listener;
mod locator;
mod registry;
mod role;

pub use config::Config;
pub use hooks::{HookRegistry, WriteHook};
pub use ingest::IngestError;
pub use role::Role;
pub use wire::{EntityKind, Notification, WireError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

// ============================================================================
// RecordStore trait
// ============================================================================

/// Storage collaborator: record lookup and validated upsert.
///
/// drover never bypasses validation — an upsert the store rejects is
/// logged and the notification dropped, leaving the replica to converge
/// on a future write to the same id.
pub trait RecordStore: Send + Sync + 'static {
    /// Handle to a named collection.
    type Collection: Send + Sync;

    /// Look up a collection by name.
    fn find_collection(&self, name: &str) -> Result<Self::Collection, StoreError>;

    /// Create or overwrite the record with `id`, running validation.
    fn upsert(
        &self,
        collection: &Self::Collection,
        id: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), StoreError>;
}

/// Errors surfaced by the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("validation rejected: {0}")]
    Validation(String),
}

// ============================================================================
// DroverNode
// ============================================================================

/// One application instance participating in write propagation.
///
/// Generic over `S`, your [`RecordStore`]. Constructed behind an [`Arc`]
/// so hooks and background tasks can share it freely.
pub struct DroverNode<S: RecordStore> {
    pub(crate) config: Config,
    /// True while an outbound connection to the primary is live.
    pub(crate) outbound: AtomicBool,
    pub(crate) registry: registry::FollowerRegistry,
    pub(crate) role_cell: role::RoleCell,
    pub(crate) store: S,
}

impl<S: RecordStore> DroverNode<S> {
    /// Create a new node around the host's store.
    pub fn new(config: Config, store: S) -> Arc<Self> {
        Arc::new(Self {
            config,
            outbound: AtomicBool::new(false),
            registry: registry::FollowerRegistry::new(),
            role_cell: role::RoleCell::new(),
            store,
        })
    }

    /// Start the leader locator. It dials until this node either connects
    /// to the primary or is itself promoted; it never needs restarting.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        locator::spawn(Arc::clone(self))
    }

    /// Register the promotion check and broadcast trigger with the host's
    /// write-hook system, for the message and user kinds.
    pub fn attach<H: HookRegistry>(self: &Arc<Self>, registry: &mut H) {
        const KINDS: [EntityKind; 2] = [EntityKind::Message, EntityKind::User];

        let node = Arc::clone(self);
        registry.before_create(
            &KINDS,
            Arc::new(move |notification| -> BoxFuture<'static, ()> {
                let node = Arc::clone(&node);
                Box::pin(async move { node.handle_before_create(&notification).await })
            }),
        );

        let node = Arc::clone(self);
        registry.after_create(
            &KINDS,
            Arc::new(move |notification| -> BoxFuture<'static, ()> {
                let node = Arc::clone(&node);
                Box::pin(async move { node.handle_after_create(&notification).await })
            }),
        );
    }

    /// Promotion check, run before every local record creation.
    ///
    /// A write arriving while no outbound connection exists means the
    /// load balancer considers this node the primary. The first such
    /// write wins the role latch, starts the listener, and returns only
    /// once the listener's bind attempt has settled — a bounded latency
    /// cost paid exactly once. Every later write returns immediately.
    pub async fn handle_before_create(self: &Arc<Self>, _notification: &Notification) {
        if self.outbound.load(Ordering::Acquire) {
            return;
        }
        if !self.role_cell.try_promote() {
            return;
        }

        info!("Write arrived with no primary connection, promoting to primary");
        let ready = listener::spawn(Arc::clone(self));
        let _ = ready.await;
    }

    /// Broadcast trigger, run after every successful local record
    /// creation. A no-op unless this node is the primary.
    pub async fn handle_after_create(&self, notification: &Notification) {
        broadcast::broadcast_write(self, notification).await;
    }

    /// Decode a wire frame and apply it to the local store.
    pub fn apply_frame(&self, frame: &str) -> Result<(), IngestError> {
        ingest::apply_frame(&self.store, frame)
    }

    /// Apply a decoded notification to the local store. Idempotent for a
    /// given notification.
    pub fn apply_notification(&self, notification: &Notification) -> Result<(), IngestError> {
        ingest::apply(&self.store, notification)
    }

    /// Current role of this node.
    pub fn role(&self) -> Role {
        self.role_cell.get()
    }

    /// True while an outbound connection to the primary is live.
    pub fn connected_to_primary(&self) -> bool {
        self.outbound.load(Ordering::Acquire)
    }

    /// Number of currently connected followers (primary side).
    pub async fn follower_count(&self) -> usize {
        self.registry.len().await
    }

    /// Borrow the storage collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }
}
