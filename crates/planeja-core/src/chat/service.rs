//! Chat turns: persist the user message, stream the generated reply, and
//! persist exactly one assistant message per turn.
//!
//! Streaming and persistence are decoupled on purpose: broadcast failures
//! (nobody listening, everyone lagged) never affect what is stored, and the
//! `done` event always carries the exact text that was persisted.

use chrono::Utc;
use planeja_types::chat::{ChatMessage, ChatStreamEvent, Conversation, MessageRole};
use planeja_types::error::ChatError;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::broker::StreamBroker;
use crate::chat::store::ConversationStore;
use crate::llm::{GenerationMessage, TextGenerator};

/// Reply persisted when the generator fails outright.
const GENERATION_FAILURE_TEXT: &str =
    "Sorry, I could not generate a response. Please try again.";

const TITLE_MAX_CHARS: usize = 60;

/// Everything one completed turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation: Conversation,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

pub struct ChatService<R, G>
where
    R: ConversationStore,
    G: TextGenerator,
{
    store: R,
    generator: G,
    broker: StreamBroker,
}

impl<R, G> ChatService<R, G>
where
    R: ConversationStore,
    G: TextGenerator,
{
    pub fn new(store: R, generator: G, broker: StreamBroker) -> Self {
        Self {
            store,
            generator,
            broker,
        }
    }

    pub fn broker(&self) -> &StreamBroker {
        &self.broker
    }

    pub async fn list_chats(&self, subject_id: &Uuid) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.store.list_conversations(subject_id).await?)
    }

    pub async fn create_chat(
        &self,
        subject_id: Uuid,
        title: Option<String>,
    ) -> Result<Conversation, ChatError> {
        let conversation = Conversation {
            id: Uuid::now_v7(),
            subject_id,
            title,
            created_at: Utc::now(),
        };
        Ok(self.store.create_conversation(&conversation).await?)
    }

    /// A conversation's messages, oldest first. Fails for a conversation
    /// the subject does not own.
    pub async fn messages(
        &self,
        subject_id: &Uuid,
        conversation_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let conversation = self
            .store
            .get_conversation(conversation_id, subject_id)
            .await?
            .ok_or(ChatError::ConversationNotFound)?;
        Ok(self.store.list_messages(&conversation.id).await?)
    }

    /// Run one chat turn.
    ///
    /// Persists the user message, streams generated tokens to the subject's
    /// broker channel in production order, persists exactly one assistant
    /// message, and finishes with a `done` event carrying the persisted
    /// text. Without a `conversation_id` a new conversation is created,
    /// titled from the message.
    pub async fn publish_turn(
        &self,
        subject_id: Uuid,
        conversation_id: Option<Uuid>,
        text: String,
    ) -> Result<TurnOutcome, ChatError> {
        let conversation = match conversation_id {
            Some(id) => self
                .store
                .get_conversation(&id, &subject_id)
                .await?
                .ok_or(ChatError::ConversationNotFound)?,
            None => {
                let conversation = Conversation {
                    id: Uuid::now_v7(),
                    subject_id,
                    title: Some(derive_title(&text)),
                    created_at: Utc::now(),
                };
                self.store.create_conversation(&conversation).await?
            }
        };

        let user_message = self
            .store
            .append_message(&ChatMessage {
                id: Uuid::now_v7(),
                conversation_id: conversation.id,
                role: MessageRole::User,
                content: text,
                author_subject_id: Some(subject_id),
                created_at: Utc::now(),
            })
            .await?;

        let history: Vec<GenerationMessage> = self
            .store
            .list_messages(&conversation.id)
            .await?
            .into_iter()
            .map(|m| GenerationMessage {
                role: m.role,
                content: m.content,
            })
            .collect();

        // The generator writes chunks into the channel while the drain side
        // broadcasts them live and accumulates the buffer. The channel
        // closes when the generator drops its sender.
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let generation = self.generator.generate(&history, tx);
        let drain = async {
            let mut buffer = String::new();
            while let Some(chunk) = rx.recv().await {
                self.broker.publish(
                    subject_id,
                    ChatStreamEvent::Token {
                        chat_id: conversation.id,
                        token: chunk.clone(),
                    },
                );
                buffer.push_str(&chunk);
            }
            buffer
        };
        let (result, buffer) = tokio::join!(generation, drain);

        let reply = match result {
            Ok(text) if !text.is_empty() => text,
            Ok(_) if !buffer.is_empty() => buffer,
            Ok(_) => {
                warn!(conversation_id = %conversation.id, "generator produced no text");
                GENERATION_FAILURE_TEXT.to_string()
            }
            Err(err) => {
                warn!(conversation_id = %conversation.id, error = %err, "generation failed");
                GENERATION_FAILURE_TEXT.to_string()
            }
        };

        let assistant_message = self
            .store
            .append_message(&ChatMessage {
                id: Uuid::now_v7(),
                conversation_id: conversation.id,
                role: MessageRole::Assistant,
                content: reply,
                author_subject_id: None,
                created_at: Utc::now(),
            })
            .await?;

        // Strictly after the last token of this turn.
        self.broker.publish(
            subject_id,
            ChatStreamEvent::Done {
                chat_id: conversation.id,
                text: assistant_message.content.clone(),
            },
        );
        debug!(conversation_id = %conversation.id, "turn completed");

        Ok(TurnOutcome {
            conversation,
            user_message,
            assistant_message,
        })
    }
}

fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}
