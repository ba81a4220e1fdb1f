use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use plaint_core::error::{PlaintError, Result};
use plaint_core::traits::ComplaintStore;
use plaint_core::types::{ComplaintRecord, StoredComplaint, Urgency};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS complaints (
        id TEXT PRIMARY KEY,
        original_text TEXT NOT NULL,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        urgency TEXT NOT NULL,
        status TEXT NOT NULL,
        location_description TEXT NOT NULL,
        planning_area TEXT NOT NULL,
        conversation_history TEXT NOT NULL,
        tags TEXT NOT NULL,
        keywords TEXT NOT NULL,
        sentiment_score REAL NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_complaints_category ON complaints(category);";

fn db_err(e: impl std::fmt::Display) -> PlaintError {
    PlaintError::Database(e.to_string())
}

/// SQLite-backed complaint store.
pub struct SqliteComplaintStore {
    conn: Mutex<Connection>,
}

impl SqliteComplaintStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlaintError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(path = %path.display(), "Complaint store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert(&self, id: &str, record: &ComplaintRecord, created_at: DateTime<Utc>) -> Result<()> {
        let history = serde_json::to_string(&record.conversation_history)?;
        let tags = serde_json::to_string(&record.tags)?;
        let keywords = serde_json::to_string(&record.keywords)?;

        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT INTO complaints (
                id, original_text, title, category, subcategory, urgency, status,
                location_description, planning_area, conversation_history, tags,
                keywords, sentiment_score, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                record.original_text,
                record.title,
                record.category,
                record.subcategory,
                record.urgency.as_str(),
                record.status,
                record.location_description,
                record.planning_area,
                history,
                tags,
                keywords,
                record.sentiment_score,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

type Row = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    f64,
    String,
);

fn decode(row: Row) -> Result<StoredComplaint> {
    let (
        id,
        original_text,
        title,
        category,
        subcategory,
        urgency,
        status,
        location_description,
        planning_area,
        history,
        tags,
        keywords,
        sentiment_score,
        created_at,
    ) = row;

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(StoredComplaint {
        id,
        created_at,
        record: ComplaintRecord {
            original_text,
            title,
            category,
            subcategory,
            urgency: Urgency::parse(&urgency),
            status,
            location_description,
            planning_area,
            conversation_history: serde_json::from_str(&history)?,
            tags: serde_json::from_str(&tags)?,
            keywords: serde_json::from_str(&keywords)?,
            sentiment_score,
        },
    })
}

impl ComplaintStore for SqliteComplaintStore {
    fn save_complaint(&self, record: ComplaintRecord) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            self.insert(&id, &record, Utc::now())?;
            debug!(complaint_id = %id, category = %record.category, "Complaint saved");
            Ok(id)
        })
    }

    fn existing_categories(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let conn = self.conn.lock().map_err(db_err)?;

            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT category FROM complaints
                     WHERE category <> ''
                     ORDER BY category",
                )
                .map_err(db_err)?;

            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;

            let mut categories = Vec::new();
            for row in rows {
                categories.push(row.map_err(db_err)?);
            }
            Ok(categories)
        })
    }

    fn get_complaint(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredComplaint>>> {
        let id = id.to_string();

        Box::pin(async move {
            let conn = self.conn.lock().map_err(db_err)?;
            let row: Option<Row> = conn
                .query_row(
                    "SELECT id, original_text, title, category, subcategory, urgency, status,
                            location_description, planning_area, conversation_history, tags,
                            keywords, sentiment_score, created_at
                     FROM complaints WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                            row.get(9)?,
                            row.get(10)?,
                            row.get(11)?,
                            row.get(12)?,
                            row.get(13)?,
                        ))
                    },
                )
                .optional()
                .map_err(db_err)?;
            drop(conn);

            row.map(decode).transpose()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaint_core::types::HistoryEntry;

    fn record(category: &str) -> ComplaintRecord {
        ComplaintRecord {
            original_text: "Lift broken for a week".into(),
            title: "Lift breakdown".into(),
            category: category.into(),
            subcategory: "general".into(),
            urgency: Urgency::Medium,
            status: "open".into(),
            location_description: "Toa Payoh".into(),
            planning_area: "Toa Payoh".into(),
            conversation_history: vec![
                HistoryEntry::user("Lift broken for a week"),
                HistoryEntry::assistant("Which block?"),
            ],
            tags: vec!["lift breakdown".into()],
            keywords: vec!["lift breakdown".into(), "toa payoh".into()],
            sentiment_score: 0.0,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = SqliteComplaintStore::in_memory().unwrap();
        let id = store.save_complaint(record("housing")).await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let stored = store.get_complaint(&id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.record, record("housing"));
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = SqliteComplaintStore::in_memory().unwrap();
        assert!(store.get_complaint("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_distinct_categories() {
        let store = SqliteComplaintStore::in_memory().unwrap();
        assert!(store.existing_categories().await.unwrap().is_empty());

        for category in ["transport", "housing", "transport", ""] {
            store.save_complaint(record(category)).await.unwrap();
        }
        assert_eq!(
            store.existing_categories().await.unwrap(),
            vec!["housing", "transport"]
        );
    }

    #[tokio::test]
    async fn test_open_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plaint.db");

        let id = {
            let store = SqliteComplaintStore::open(&path).unwrap();
            store.save_complaint(record("security")).await.unwrap()
        };

        let reopened = SqliteComplaintStore::open(&path).unwrap();
        let stored = reopened.get_complaint(&id).await.unwrap().unwrap();
        assert_eq!(stored.record.category, "security");
    }
}
