// Transport seam: the chat client (fetch, pagination, auth) is an external
// collaborator reached through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Orderable message token. Snowflake-style: ordering follows creation time.
pub type MessageId = u64;

/// One message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    pub author_id: u64,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The stored cursor no longer resolves against the message stream
    /// (e.g. the referenced message was deleted). The engine recovers by
    /// falling back to a full scan.
    #[error("cursor no longer resolves against the message stream")]
    StaleCursor,

    /// Any other remote failure. Not locally recoverable; propagated to the
    /// caller.
    #[error("message fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),
}

/// Paginated access to the group's message history.
///
/// Implementations must deliver messages oldest-first; the sync engine
/// resumes from a cursor and never re-requests older messages.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Fetch every message strictly after `cursor`, oldest first.
    async fn fetch_after(&self, cursor: MessageId) -> Result<Vec<ChatMessage>, TransportError>;

    /// Fetch every message timestamped at or after `start`, oldest first.
    async fn fetch_from(&self, start: DateTime<Utc>) -> Result<Vec<ChatMessage>, TransportError>;
}
