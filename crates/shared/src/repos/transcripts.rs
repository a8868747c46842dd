use sqlx::Row;

use crate::models::TranscriptCacheEntry;

use super::{Store, StoreError};

impl Store {
    /// Cache read by video id; absent on miss. Validity against the TTL is
    /// the caller's check (`TranscriptCacheEntry::is_valid_at`).
    pub async fn get_transcript(
        &self,
        video_id: &str,
    ) -> Result<Option<TranscriptCacheEntry>, StoreError> {
        let row = sqlx::query(
            "SELECT video_id, video_url, transcript, source, fetched_at, expires_at, created_by
             FROM transcripts
             WHERE video_id = $1",
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(TranscriptCacheEntry {
                video_id: row.try_get("video_id")?,
                video_url: row.try_get("video_url")?,
                transcript: row.try_get("transcript")?,
                source: row.try_get("source")?,
                fetched_at: row.try_get("fetched_at")?,
                expires_at: row.try_get("expires_at")?,
                created_by: row.try_get("created_by")?,
            })
        })
        .transpose()
    }

    /// Upsert keyed by video id. Concurrent writers for the same video are
    /// last-write-wins; transcript content is idempotent per video.
    pub async fn upsert_transcript(&self, entry: &TranscriptCacheEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transcripts
                (video_id, video_url, transcript, source, fetched_at, expires_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (video_id)
             DO UPDATE SET
               video_url = EXCLUDED.video_url,
               transcript = EXCLUDED.transcript,
               source = EXCLUDED.source,
               fetched_at = EXCLUDED.fetched_at,
               expires_at = EXCLUDED.expires_at,
               created_by = EXCLUDED.created_by",
        )
        .bind(&entry.video_id)
        .bind(&entry.video_url)
        .bind(&entry.transcript)
        .bind(&entry.source)
        .bind(entry.fetched_at)
        .bind(entry.expires_at)
        .bind(entry.created_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
