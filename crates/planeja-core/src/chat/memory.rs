//! In-memory conversation store used as the failover backend.

use std::collections::HashMap;
use std::sync::Mutex;

use planeja_types::chat::{ChatMessage, Conversation};
use planeja_types::error::RepositoryError;
use uuid::Uuid;

use crate::chat::store::ConversationStore;

#[derive(Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    // Messages in append order per conversation.
    messages: HashMap<Uuid, Vec<ChatMessage>>,
}

#[derive(Default)]
pub struct MemoryConversationStore {
    inner: Mutex<Inner>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConversationStore for MemoryConversationStore {
    async fn list_conversations(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let inner = self.lock();
        let mut list: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.subject_id == *subject_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        let mut inner = self.lock();
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        id: &Uuid,
        subject_id: &Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .conversations
            .get(id)
            .filter(|c| c.subject_id == *subject_id)
            .cloned())
    }

    async fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let inner = self.lock();
        let mut list = inner
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        // Stable sort: messages appended in the same instant keep their
        // append order.
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut inner = self.lock();
        if !inner.conversations.contains_key(&message.conversation_id) {
            return Err(RepositoryError::NotFound);
        }
        inner
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message.clone())
    }
}
