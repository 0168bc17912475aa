//! ConversationStore trait definition.
//!
//! Conversations and their messages are owned by a subject; every read is
//! ownership-filtered at the store level so handlers cannot leak another
//! subject's history by forgetting a check.

use planeja_types::chat::{ChatMessage, Conversation};
use planeja_types::error::RepositoryError;
use uuid::Uuid;

pub trait ConversationStore: Send + Sync {
    /// A subject's conversations, newest first.
    fn list_conversations(
        &self,
        subject_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Fetch a conversation only if `subject_id` owns it.
    fn get_conversation(
        &self,
        id: &Uuid,
        subject_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// A conversation's messages in chronological order.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    fn append_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;
}
