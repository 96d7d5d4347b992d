//! Chat message history persisted in PostgreSQL.
//!
//! A [`ChatMessageHistory`] is bound to one table and one session id. It
//! validates (or creates) the table when built, then appends and reads
//! messages for its session in insertion order. Destructive calls
//! ([`MessageHistory::clear`], [`MessageHistory::set_messages`]) only take
//! effect when the history was built with overwrite enabled.

mod memory;
pub mod message;
mod options;
pub(crate) mod schema;
mod store;

use async_trait::async_trait;

use crate::error::HistoryError;

pub use memory::InMemoryHistory;
pub use message::{ChatMessage, Role, StoredMessage};
pub use options::{ChatMessageHistoryBuilder, TableMode};
pub use schema::HistoryColumns;
pub use store::ChatMessageHistory;

/// Schema used when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";

/// Ordered message log for one conversation session.
#[async_trait]
pub trait MessageHistory: Send + Sync {
    /// Append one message.
    async fn add_message(&self, message: &ChatMessage) -> Result<(), HistoryError>;

    /// Append a human message.
    async fn add_user_message(&self, content: &str) -> Result<(), HistoryError> {
        self.add_message(&ChatMessage::human(content)).await
    }

    /// Append an AI message.
    async fn add_ai_message(&self, content: &str) -> Result<(), HistoryError> {
        self.add_message(&ChatMessage::ai(content)).await
    }

    /// Append a system message.
    async fn add_system_message(&self, content: &str) -> Result<(), HistoryError> {
        self.add_message(&ChatMessage::system(content)).await
    }

    /// Append several messages atomically, in order.
    async fn add_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError>;

    /// All messages of the session, oldest first.
    async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError>;

    /// Delete every message of the session. No-op without overwrite.
    async fn clear(&self) -> Result<(), HistoryError>;

    /// Replace the session's messages. No-op without overwrite.
    async fn set_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError>;
}

/// Log a destructive call refused by the overwrite gate.
fn refuse_without_overwrite(operation: &'static str, session_id: &str) {
    tracing::warn!(
        operation,
        session_id,
        "Ignoring destructive chat history call: overwrite is not enabled"
    );
}
