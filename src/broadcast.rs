//! Fan a completed local write out to every connected follower.

use tracing::{debug, warn};

use crate::role::Role;
use crate::wire::Notification;
use crate::{DroverNode, RecordStore};

/// Broadcast one notification, primary-side only.
///
/// Followers whose send fails are silently dropped from the registry —
/// no retry, no dead-letter queue. A dropped follower re-establishes via
/// its own leader locator and receives no backfill of missed writes.
pub(crate) async fn broadcast_write<S: RecordStore>(
    node: &DroverNode<S>,
    notification: &Notification,
) {
    if node.role() != Role::Primary {
        return;
    }

    let frame = match notification.encode() {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Write not propagated: notification is not encodable");
            return;
        }
    };

    let delivered = node.registry.send_or_drop(&frame).await;
    debug!(frame = %frame, delivered, "Broadcast notification");
}
