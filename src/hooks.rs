//! Integration seam for the host's write-hook system.
//!
//! The host application owns record creation; drover only needs to be
//! told about it. [`HookRegistry`] is the narrow registration surface
//! the host implements, and [`DroverNode::attach`](crate::DroverNode::attach)
//! plugs the promotion check and broadcast trigger into it for the
//! message and user kinds.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::wire::{EntityKind, Notification};

/// Async hook invoked by the host around record creation.
///
/// Receives the materialized record data as a [`Notification`]. Hooks
/// never fail the host's write — internal errors are logged and absorbed.
pub type WriteHook = Arc<dyn Fn(Notification) -> BoxFuture<'static, ()> + Send + Sync>;

/// Registration surface of the host's write-hook system.
pub trait HookRegistry {
    /// Register a hook that runs before a record of one of `kinds` is
    /// created.
    fn before_create(&mut self, kinds: &[EntityKind], hook: WriteHook);

    /// Register a hook that runs after a record of one of `kinds` has
    /// been created successfully.
    fn after_create(&mut self, kinds: &[EntityKind], hook: WriteHook);
}
