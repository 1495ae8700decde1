use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// One upload attempt, successful or not. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub profile_id: String,
    pub path: String,
    pub size: Option<i64>,
    /// Epoch milliseconds at the start of the upload.
    pub date: i64,
    pub url: Option<String>,
    pub error_message: Option<String>,
}

impl UploadedFileRecord {
    pub fn is_success(&self) -> bool {
        self.error_message.is_none() && self.url.is_some()
    }
}

/// Append-only record of upload attempts. Readers always get the full
/// current set, newest first.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, records: &[UploadedFileRecord]) -> AppResult<Vec<UploadedFileRecord>>;
    async fn get_all(&self) -> AppResult<Vec<UploadedFileRecord>>;
}

pub struct SqliteHistory {
    pool: Pool<Sqlite>,
}

fn default_history_path() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::Config("Could not find data directory".to_string()))?
        .join("droplift");

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("history.db"))
}

impl SqliteHistory {
    pub async fn open_default() -> AppResult<Self> {
        let db_path = default_history_path()?;
        log::info!("History database path: {}", db_path.display());

        if !db_path.exists() {
            std::fs::File::create(&db_path)?;
        }

        Self::connect(&format!("sqlite:{}", db_path.display())).await
    }

    /// `sqlite::memory:` works here for tests.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uploaded_files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                local_path TEXT NOT NULL,
                file_size INTEGER,
                uploaded_at INTEGER NOT NULL,
                url TEXT,
                error_message TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uploaded_files_date ON uploaded_files(uploaded_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uploaded_files_profile ON uploaded_files(profile_id)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Prune records older than the given number of days. Returns how many
    /// rows were removed.
    pub async fn cleanup_older_than(&self, days: i64) -> AppResult<u64> {
        let cutoff = chrono::Utc::now().timestamp_millis() - days * 24 * 60 * 60 * 1000;
        let result = sqlx::query("DELETE FROM uploaded_files WHERE uploaded_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            log::info!("History cleanup removed {} records", removed);
        }
        Ok(removed)
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> UploadedFileRecord {
    UploadedFileRecord {
        id: row.get("id"),
        name: row.get("name"),
        mime_type: row.get("mime_type"),
        profile_id: row.get("profile_id"),
        path: row.get("local_path"),
        size: row.get("file_size"),
        date: row.get("uploaded_at"),
        url: row.get("url"),
        error_message: row.get("error_message"),
    }
}

#[async_trait]
impl HistorySink for SqliteHistory {
    async fn append(&self, records: &[UploadedFileRecord]) -> AppResult<Vec<UploadedFileRecord>> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO uploaded_files
                    (id, name, mime_type, profile_id, local_path, file_size,
                     uploaded_at, url, error_message)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.name)
            .bind(&record.mime_type)
            .bind(&record.profile_id)
            .bind(&record.path)
            .bind(record.size)
            .bind(record.date)
            .bind(&record.url)
            .bind(&record.error_message)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_all().await
    }

    async fn get_all(&self) -> AppResult<Vec<UploadedFileRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, mime_type, profile_id, local_path, file_size, \
             uploaded_at, url, error_message \
             FROM uploaded_files ORDER BY uploaded_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, date: i64, url: Option<&str>) -> UploadedFileRecord {
        UploadedFileRecord {
            id: id.to_string(),
            name: format!("{}.png", id),
            mime_type: "image/png".to_string(),
            profile_id: "p1".to_string(),
            path: format!("/tmp/{}.png", id),
            size: Some(42),
            date,
            url: url.map(str::to_string),
            error_message: if url.is_none() {
                Some("connection reset".to_string())
            } else {
                None
            },
        }
    }

    #[tokio::test]
    async fn append_returns_full_history_newest_first() {
        let history = SqliteHistory::connect("sqlite::memory:").await.unwrap();

        let first = history
            .append(&[record("a", 1000, Some("https://x/a.png"))])
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = history
            .append(&[record("b", 2000, None), record("c", 3000, Some("https://x/c.png"))])
            .await
            .unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].id, "c");
        assert_eq!(second[2].id, "a");
    }

    #[tokio::test]
    async fn failed_records_keep_their_error_message() {
        let history = SqliteHistory::connect("sqlite::memory:").await.unwrap();
        let all = history.append(&[record("a", 1000, None)]).await.unwrap();

        assert!(!all[0].is_success());
        assert_eq!(all[0].error_message.as_deref(), Some("connection reset"));
        assert_eq!(all[0].url, None);
    }

    #[tokio::test]
    async fn cleanup_prunes_only_old_records() {
        let history = SqliteHistory::connect("sqlite::memory:").await.unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        let stale = now - 40 * 24 * 60 * 60 * 1000;

        history
            .append(&[record("old", stale, Some("https://x/old.png"))])
            .await
            .unwrap();
        history
            .append(&[record("new", now, Some("https://x/new.png"))])
            .await
            .unwrap();

        let removed = history.cleanup_older_than(30).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = history.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "new");
    }
}
