//! Conversation repository with automatic durable-to-memory failover.
//!
//! Same policy as the credential wrapper, with its own flag and its own
//! memory store: the two repositories degrade independently.

use planeja_types::chat::{ChatMessage, Conversation};
use planeja_types::error::RepositoryError;
use uuid::Uuid;

use crate::chat::memory::MemoryConversationStore;
use crate::chat::store::ConversationStore;
use crate::failover::{with_failover, FallbackFlag};

pub struct FailoverConversationStore<D: ConversationStore> {
    durable: D,
    fallback: MemoryConversationStore,
    flag: FallbackFlag,
}

impl<D: ConversationStore> FailoverConversationStore<D> {
    pub fn new(durable: D) -> Self {
        Self {
            durable,
            fallback: MemoryConversationStore::new(),
            flag: FallbackFlag::new(),
        }
    }

    pub fn using_memory(&self) -> bool {
        self.flag.active()
    }

    fn note_failure(&self, err: &RepositoryError) {
        if self.flag.trip() {
            tracing::warn!(
                reason = %err,
                "conversation store degraded to in-memory fallback for the rest of this process"
            );
        }
    }
}

impl<D: ConversationStore> ConversationStore for FailoverConversationStore<D> {
    async fn list_conversations(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        with_failover!(
            self,
            self.durable.list_conversations(subject_id).await,
            self.fallback.list_conversations(subject_id).await
        )
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        with_failover!(
            self,
            self.durable.create_conversation(conversation).await,
            self.fallback.create_conversation(conversation).await
        )
    }

    async fn get_conversation(
        &self,
        id: &Uuid,
        subject_id: &Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        with_failover!(
            self,
            self.durable.get_conversation(id, subject_id).await,
            self.fallback.get_conversation(id, subject_id).await
        )
    }

    async fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        with_failover!(
            self,
            self.durable.list_messages(conversation_id).await,
            self.fallback.list_messages(conversation_id).await
        )
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage, RepositoryError> {
        with_failover!(
            self,
            self.durable.append_message(message).await,
            self.fallback.append_message(message).await
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore {
        infrastructure: bool,
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn new(infrastructure: bool) -> Self {
            Self {
                infrastructure,
                calls: AtomicUsize::new(0),
            }
        }

        fn fail<T>(&self) -> Result<T, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.infrastructure {
                Err(RepositoryError::Unavailable("schema cache".to_string()))
            } else {
                Err(RepositoryError::Query("bad query".to_string()))
            }
        }
    }

    impl ConversationStore for BrokenStore {
        async fn list_conversations(
            &self,
            _subject_id: &Uuid,
        ) -> Result<Vec<Conversation>, RepositoryError> {
            self.fail()
        }
        async fn create_conversation(
            &self,
            _conversation: &Conversation,
        ) -> Result<Conversation, RepositoryError> {
            self.fail()
        }
        async fn get_conversation(
            &self,
            _id: &Uuid,
            _subject_id: &Uuid,
        ) -> Result<Option<Conversation>, RepositoryError> {
            self.fail()
        }
        async fn list_messages(
            &self,
            _conversation_id: &Uuid,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            self.fail()
        }
        async fn append_message(
            &self,
            _message: &ChatMessage,
        ) -> Result<ChatMessage, RepositoryError> {
            self.fail()
        }
    }

    fn conversation(subject_id: Uuid) -> Conversation {
        Conversation {
            id: Uuid::now_v7(),
            subject_id,
            title: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn infrastructure_error_switches_permanently() {
        let store = FailoverConversationStore::new(BrokenStore::new(true));
        let subject = Uuid::now_v7();
        let c = conversation(subject);

        store.create_conversation(&c).await.unwrap();
        assert!(store.using_memory());

        let list = store.list_conversations(&subject).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(store.durable.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn data_error_propagates_without_switching() {
        let store = FailoverConversationStore::new(BrokenStore::new(false));
        let err = store
            .create_conversation(&conversation(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
        assert!(!store.using_memory());
    }
}
