//! Conversation and message types.
//!
//! A conversation ("chat") belongs to a single subject. Messages within a
//! conversation are ordered by `created_at` ascending; that ordering is the
//! canonical read order and is never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who authored a message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A chat conversation owned by one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single message within a conversation.
///
/// `author_subject_id` is set for user messages and `None` for assistant
/// replies. Messages are immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub author_subject_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Event broadcast to a subject's connected clients while a reply streams.
///
/// `Token` events carry one generation chunk each and arrive in production
/// order; exactly one `Done` follows the last token of a turn, carrying the
/// same text that was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    Token {
        #[serde(rename = "chatId")]
        chat_id: Uuid,
        token: String,
    },
    Done {
        #[serde(rename = "chatId")]
        chat_id: Uuid,
        text: String,
    },
}
