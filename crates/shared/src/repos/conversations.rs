use sqlx::Row;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{Conversation, StoredMessage, TurnRole};

use super::{Store, StoreError};

impl Store {
    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let row = sqlx::query(
            "INSERT INTO conversations (id, user_id, title)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        row_to_conversation(&row)
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, created_at, updated_at
             FROM conversations
             WHERE user_id = $1
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_conversation).collect()
    }

    /// Ownership-checked read: absent result means the conversation does not
    /// exist or belongs to another user.
    pub async fn get_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, title, created_at, updated_at
             FROM conversations
             WHERE id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, images, visual_prompts, created_at
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    /// The latest `limit` turns in chronological order, for the model's
    /// context window.
    pub async fn recent_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, images, visual_prompts, created_at
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<StoredMessage> = rows
            .iter()
            .map(row_to_message)
            .collect::<Result<_, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Append-only insert; also bumps the conversation's recency stamp.
    pub async fn append_message(
        &self,
        conversation_id: Uuid,
        role: TurnRole,
        content: &str,
        images: &[String],
        visual_prompts: &[String],
    ) -> Result<StoredMessage, StoreError> {
        let row = sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, images, visual_prompts)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, conversation_id, role, content, images, visual_prompts, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(Json(images))
        .bind(Json(visual_prompts))
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        row_to_message(&row)
    }
}

fn row_to_conversation(row: &sqlx::postgres::PgRow) -> Result<Conversation, StoreError> {
    Ok(Conversation {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<StoredMessage, StoreError> {
    let role: String = row.try_get("role")?;
    let role = match role.as_str() {
        "user" => TurnRole::User,
        "assistant" => TurnRole::Assistant,
        other => {
            return Err(StoreError::InvalidData(format!(
                "unknown turn role persisted: {other}"
            )));
        }
    };

    let Json(images): Json<Vec<String>> = row.try_get("images")?;
    let Json(visual_prompts): Json<Vec<String>> = row.try_get("visual_prompts")?;

    Ok(StoredMessage {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role,
        content: row.try_get("content")?,
        images,
        visual_prompts,
        created_at: row.try_get("created_at")?,
    })
}
