use sqlx::Row;
use uuid::Uuid;

use crate::models::{Profile, UserMemory};

use super::{Store, StoreError};

impl Store {
    /// Guarantees a profile row exists for an authenticated subject. Called
    /// from the auth middleware on every request; the insert is a no-op once
    /// the row is present.
    pub async fn ensure_profile(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO profiles (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, display_name, created_at FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Profile {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                display_name: row.try_get("display_name")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    pub async fn get_user_memory(&self, user_id: Uuid) -> Result<Option<UserMemory>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, learning_style, difficulty_level, preferred_format,
                    topics_studied, strengths, weaknesses, last_active
             FROM user_memory
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(UserMemory {
                user_id: row.try_get("user_id")?,
                learning_style: row.try_get("learning_style")?,
                difficulty_level: row.try_get("difficulty_level")?,
                preferred_format: row.try_get("preferred_format")?,
                topics_studied: row.try_get("topics_studied")?,
                strengths: row.try_get("strengths")?,
                weaknesses: row.try_get("weaknesses")?,
                last_active: row.try_get("last_active")?,
            })
        })
        .transpose()
    }

    /// Overwrite-only bookkeeping upsert of `last_active`. Last writer wins;
    /// concurrent requests for the same user need no version check since
    /// every writer stores the current timestamp.
    pub async fn touch_user_memory(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_memory (user_id, last_active)
             VALUES ($1, NOW())
             ON CONFLICT (user_id)
             DO UPDATE SET last_active = NOW()",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
