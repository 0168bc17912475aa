//! Conversation endpoints: list/create chats, list messages, post a turn.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use planeja_types::chat::{ChatMessage, Conversation, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::extractors::auth::AuthSubject;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct PostMessageRequest {
    #[serde(default, rename = "chatId", alias = "chat_id")]
    pub chat_id: Option<Uuid>,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    id: Uuid,
    title: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&Conversation> for ChatBody {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            created_at: conversation.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageBody {
    id: Uuid,
    chat_id: Uuid,
    role: MessageRole,
    content: String,
    author_subject_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for MessageBody {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            chat_id: message.conversation_id,
            role: message.role,
            content: message.content.clone(),
            author_subject_id: message.author_subject_id,
            created_at: message.created_at,
        }
    }
}

pub async fn list_chats(
    State(state): State<AppState>,
    auth: AuthSubject,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chats: Vec<ChatBody> = state
        .chat_service
        .list_chats(&auth.subject_id())
        .await?
        .iter()
        .map(ChatBody::from)
        .collect();

    Ok(Json(json!({ "success": true, "chats": chats })))
}

pub async fn create_chat(
    State(state): State<AppState>,
    auth: AuthSubject,
    Json(body): Json<CreateChatRequest>,
) -> Result<Response, ApiError> {
    let title = body.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let conversation = state
        .chat_service
        .create_chat(auth.subject_id(), title)
        .await?;

    let body = json!({ "success": true, "chat": ChatBody::from(&conversation) });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthSubject,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let messages: Vec<MessageBody> = state
        .chat_service
        .messages(&auth.subject_id(), &chat_id)
        .await?
        .iter()
        .map(MessageBody::from)
        .collect();

    Ok(Json(json!({ "success": true, "messages": messages })))
}

pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthSubject,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }

    let outcome = state
        .chat_service
        .publish_turn(auth.subject_id(), body.chat_id, message)
        .await?;

    Ok(Json(json!({
        "success": true,
        "chatId": outcome.conversation.id,
        "userMessage": MessageBody::from(&outcome.user_message),
        "aiMessage": MessageBody::from(&outcome.assistant_message),
    })))
}
