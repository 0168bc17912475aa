//! SQLite conversation repository.
//!
//! Same shape as the credential store: raw queries, private Row structs,
//! reads on the reader pool, mutations on the writer pool. Every
//! conversation read is ownership-filtered in SQL.

use planeja_core::chat::store::ConversationStore;
use planeja_types::chat::{ChatMessage, Conversation, MessageRole};
use planeja_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{classify_error, format_datetime, parse_datetime};

pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConversationRow {
    id: String,
    subject_id: String,
    title: Option<String>,
    created_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat id: {e}")))?;
        let subject_id = Uuid::parse_str(&self.subject_id)
            .map_err(|e| RepositoryError::Query(format!("invalid subject_id: {e}")))?;

        Ok(Conversation {
            id,
            subject_id,
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    content: String,
    author_subject_id: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            author_subject_id: row.try_get("author_subject_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let conversation_id = Uuid::parse_str(&self.chat_id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let author_subject_id = self
            .author_subject_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid author_subject_id: {e}")))?;

        Ok(ChatMessage {
            id,
            conversation_id,
            role,
            content: self.content,
            author_subject_id,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    async fn list_conversations(
        &self,
        subject_id: &Uuid,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM chats WHERE subject_id = ? ORDER BY created_at DESC")
            .bind(subject_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation_row = ConversationRow::from_row(row).map_err(classify_error)?;
            conversations.push(conversation_row.into_conversation()?);
        }
        Ok(conversations)
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chats (id, subject_id, title, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.subject_id.to_string())
        .bind(&conversation.title)
        .bind(format_datetime(&conversation.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(classify_error)?;

        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        id: &Uuid,
        subject_id: &Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ? AND subject_id = ?")
            .bind(id.to_string())
            .bind(subject_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(classify_error)?;

        match row {
            Some(row) => {
                let conversation_row = ConversationRow::from_row(&row).map_err(classify_error)?;
                Ok(Some(conversation_row.into_conversation()?))
            }
            None => Ok(None),
        }
    }

    async fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // id is a time-sortable UUIDv7, so it breaks created_at ties in
        // append order.
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(classify_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row = MessageRow::from_row(row).map_err(classify_error)?;
            messages.push(message_row.into_message()?);
        }
        Ok(messages)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<ChatMessage, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_messages (id, chat_id, role, content, author_subject_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.author_subject_id.map(|id| id.to_string()))
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(classify_error)?;

        Ok(message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::subject::SqliteSubjectStore;
    use chrono::Utc;
    use planeja_core::auth::store::SubjectStore;
    use planeja_types::identity::NewSubject;

    async fn setup() -> (tempfile::TempDir, SqliteConversationStore, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let subjects = SqliteSubjectStore::new(pool.clone());
        let record = subjects
            .create(&NewSubject {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        (dir, SqliteConversationStore::new(pool), record.id)
    }

    fn conversation(subject_id: Uuid) -> Conversation {
        Conversation {
            id: Uuid::now_v7(),
            subject_id,
            title: Some("trip".to_string()),
            created_at: Utc::now(),
        }
    }

    fn message(conversation_id: Uuid, role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.to_string(),
            author_subject_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_conversation_crud_and_ownership() {
        let (_dir, store, subject) = setup().await;
        let c = conversation(subject);
        store.create_conversation(&c).await.unwrap();

        let fetched = store.get_conversation(&c.id, &subject).await.unwrap();
        assert_eq!(fetched.unwrap().title.as_deref(), Some("trip"));

        // A different subject sees nothing.
        let stranger = Uuid::now_v7();
        assert!(store.get_conversation(&c.id, &stranger).await.unwrap().is_none());

        let list = store.list_conversations(&subject).await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_messages_come_back_in_append_order() {
        let (_dir, store, subject) = setup().await;
        let c = conversation(subject);
        store.create_conversation(&c).await.unwrap();

        for content in ["first", "second", "third"] {
            store
                .append_message(&message(c.id, MessageRole::User, content))
                .await
                .unwrap();
        }

        let contents: Vec<String> = store
            .list_messages(&c.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_message_roles_and_author_roundtrip() {
        let (_dir, store, subject) = setup().await;
        let c = conversation(subject);
        store.create_conversation(&c).await.unwrap();

        let mut user_msg = message(c.id, MessageRole::User, "hi");
        user_msg.author_subject_id = Some(subject);
        store.append_message(&user_msg).await.unwrap();
        store
            .append_message(&message(c.id, MessageRole::Assistant, "hello"))
            .await
            .unwrap();

        let messages = store.list_messages(&c.id).await.unwrap();
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].author_subject_id, Some(subject));
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].author_subject_id, None);
    }

    #[tokio::test]
    async fn test_append_to_missing_conversation_fails() {
        let (_dir, store, _subject) = setup().await;
        let err = store
            .append_message(&message(Uuid::now_v7(), MessageRole::User, "orphan"))
            .await
            .unwrap_err();
        // Foreign key violation is a data error, not an outage.
        assert!(matches!(err, RepositoryError::Query(_)));
    }
}
