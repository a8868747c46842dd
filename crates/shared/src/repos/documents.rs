use sqlx::Row;
use uuid::Uuid;

use crate::models::UserDocument;

use super::{Store, StoreError};

const RECENT_DOCUMENTS_LIMIT: i64 = 10;

impl Store {
    pub async fn record_document(
        &self,
        user_id: Uuid,
        file_name: &str,
        file_type: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_documents (id, user_id, file_name, file_type)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(file_name)
        .bind(file_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_recent_documents(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserDocument>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, file_name, file_type, created_at
             FROM user_documents
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(RECENT_DOCUMENTS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(UserDocument {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    file_name: row.try_get("file_name")?,
                    file_type: row.try_get("file_type")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
