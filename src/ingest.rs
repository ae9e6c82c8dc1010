//! Replica-side ingestion: turn decoded notifications into upserts
//! against the storage collaborator.

use thiserror::Error;

use crate::wire::{Notification, WireError};
use crate::{RecordStore, StoreError};

/// Errors from applying a received notification.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("decode failed: {0}")]
    Decode(#[from] WireError),
    #[error("upsert failed: {0}")]
    Store(#[from] StoreError),
}

/// Decode one wire frame and apply it.
pub(crate) fn apply_frame<S: RecordStore>(store: &S, frame: &str) -> Result<(), IngestError> {
    let notification = Notification::decode(frame)?;
    apply(store, &notification)
}

/// Upsert one decoded notification, keyed by its id.
///
/// Validation is the store's: a rejected upsert surfaces as
/// [`IngestError::Store`] and the caller drops the notification. Applying
/// the same notification twice leaves the store unchanged after the
/// first application.
pub(crate) fn apply<S: RecordStore>(
    store: &S,
    notification: &Notification,
) -> Result<(), IngestError> {
    let collection = store.find_collection(notification.kind().collection())?;

    match notification {
        Notification::Message {
            id,
            content,
            author,
        } => {
            let fields = [("content", content.as_str()), ("user", author.as_str())];
            store.upsert(&collection, id, &fields)?;
        }
        Notification::User { id, username } => {
            let fields = [("username", username.as_str())];
            store.upsert(&collection, id, &fields)?;
        }
    }

    Ok(())
}
