//! Process-local history with the same semantics as the PostgreSQL store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HistoryError;
use crate::history::{ChatMessage, MessageHistory, refuse_without_overwrite};

/// Ephemeral message history held in memory.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    session_id: String,
    messages: RwLock<Vec<ChatMessage>>,
    overwrite: bool,
}

impl InMemoryHistory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Allow `clear` and `set_messages` to discard messages.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageHistory for InMemoryHistory {
    async fn add_message(&self, message: &ChatMessage) -> Result<(), HistoryError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn add_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        self.messages.write().await.extend_from_slice(messages);
        Ok(())
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self.messages.read().await.clone())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        if !self.overwrite {
            refuse_without_overwrite("clear", &self.session_id);
            return Ok(());
        }
        self.messages.write().await.clear();
        Ok(())
    }

    async fn set_messages(&self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        if !self.overwrite {
            refuse_without_overwrite("set_messages", &self.session_id);
            return Ok(());
        }
        *self.messages.write().await = messages.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn sample() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("be brief"),
            ChatMessage::human("hello"),
            ChatMessage::ai("hi"),
        ]
    }

    #[tokio::test]
    async fn preserves_insertion_order() {
        let history = InMemoryHistory::new("s1");
        history.add_user_message("first").await.unwrap();
        history.add_messages(&sample()).await.unwrap();
        history.add_ai_message("last").await.unwrap();

        let mut expected = vec![ChatMessage::human("first")];
        expected.extend(sample());
        expected.push(ChatMessage::ai("last"));
        assert_eq!(history.messages().await.unwrap(), expected);
    }

    #[traced_test]
    #[tokio::test]
    async fn destructive_calls_are_gated() {
        let history = InMemoryHistory::new("s1");
        history.add_messages(&sample()).await.unwrap();

        history.clear().await.unwrap();
        history
            .set_messages(&[ChatMessage::ai("replaced")])
            .await
            .unwrap();

        assert_eq!(history.messages().await.unwrap(), sample());
        assert!(logs_contain("overwrite is not enabled"));
    }

    #[tokio::test]
    async fn overwrite_allows_clear_and_replace() {
        let history = InMemoryHistory::new("s1").with_overwrite(true);
        history.add_messages(&sample()).await.unwrap();

        history.clear().await.unwrap();
        assert!(history.is_empty().await);

        history.add_system_message("old").await.unwrap();
        let replacement = vec![ChatMessage::ai("last message warning!")];
        history.set_messages(&replacement).await.unwrap();
        assert_eq!(history.messages().await.unwrap(), replacement);
        assert_eq!(history.len().await, 1);
    }
}
