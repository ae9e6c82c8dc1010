//! Write-notification types and the text wire codec.
//!
//! One notification per frame, newline-delimited on the wire:
//!
//! - `1:{id}:{content}:{author}` for a message
//! - `2:{id}:{username}` for a user
//!
//! The leading type tag selects a fixed field count. Frames that don't
//! match their tag's exact arity are rejected on decode rather than
//! guessed at.

use thiserror::Error;
use tokio_util::codec::LinesCodec;

/// Upper bound on a single wire frame.
const MAX_FRAME_LEN: usize = 8 * 1024;

/// Newline-framed text codec used on both sides of a connection.
pub(crate) fn frame_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_FRAME_LEN)
}

/// Entity kinds that participate in write propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Message,
    User,
}

impl EntityKind {
    /// Collection name in the record store.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Message => "messages",
            EntityKind::User => "users",
        }
    }
}

/// An immutable record of one completed local write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Message {
        id: String,
        content: String,
        author: String,
    },
    User {
        id: String,
        username: String,
    },
}

/// Errors from encoding or decoding a wire frame.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("unknown type tag {0:?}")]
    UnknownTag(String),
    #[error("tag {tag} expects {expected} fields, frame has {actual}")]
    FieldCount {
        tag: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} contains the frame delimiter")]
    DelimiterInField { field: &'static str },
}

impl Notification {
    pub fn kind(&self) -> EntityKind {
        match self {
            Notification::Message { .. } => EntityKind::Message,
            Notification::User { .. } => EntityKind::User,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Notification::Message { id, .. } => id,
            Notification::User { id, .. } => id,
        }
    }

    /// Serialize to a single wire frame.
    ///
    /// Fields containing `:` are rejected — the frame would not survive
    /// a round trip through [`decode`](Notification::decode).
    pub fn encode(&self) -> Result<String, WireError> {
        match self {
            Notification::Message {
                id,
                content,
                author,
            } => {
                reject_delimiter("id", id)?;
                reject_delimiter("content", content)?;
                reject_delimiter("author", author)?;
                Ok(format!("1:{id}:{content}:{author}"))
            }
            Notification::User { id, username } => {
                reject_delimiter("id", id)?;
                reject_delimiter("username", username)?;
                Ok(format!("2:{id}:{username}"))
            }
        }
    }

    /// Parse a single wire frame.
    pub fn decode(frame: &str) -> Result<Self, WireError> {
        if frame.is_empty() {
            return Err(WireError::EmptyFrame);
        }

        let fields: Vec<&str> = frame.split(':').collect();
        match fields[0] {
            "1" => {
                if fields.len() != 4 {
                    return Err(WireError::FieldCount {
                        tag: "1",
                        expected: 4,
                        actual: fields.len(),
                    });
                }
                Ok(Notification::Message {
                    id: fields[1].to_string(),
                    content: fields[2].to_string(),
                    author: fields[3].to_string(),
                })
            }
            "2" => {
                if fields.len() != 3 {
                    return Err(WireError::FieldCount {
                        tag: "2",
                        expected: 3,
                        actual: fields.len(),
                    });
                }
                Ok(Notification::User {
                    id: fields[1].to_string(),
                    username: fields[2].to_string(),
                })
            }
            other => Err(WireError::UnknownTag(other.to_string())),
        }
    }
}

fn reject_delimiter(field: &'static str, value: &str) -> Result<(), WireError> {
    if value.contains(':') {
        Err(WireError::DelimiterInField { field })
    } else {
        Ok(())
    }
}
