//! Embedded row-oriented store
//!
//! Each object owns one SQLite database, either in memory or as a file
//! named after the object id inside the configured storage directory.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::error::StorageError;
use super::id::ObjectId;

/// Where object stores live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    Directory(PathBuf),
}

impl StorageLocation {
    pub fn from_config(storage_dir: Option<&str>) -> Self {
        match storage_dir {
            Some(dir) if !dir.is_empty() => Self::Directory(PathBuf::from(dir)),
            _ => Self::Memory,
        }
    }
}

pub struct SqlStorage {
    pool: SqlitePool,
}

impl SqlStorage {
    /// Open (or create) the store for `id`.
    pub async fn open(location: &StorageLocation, id: &ObjectId) -> Result<Self, StorageError> {
        let options = match location {
            StorageLocation::Memory => {
                SqliteConnectOptions::from_str("sqlite::memory:").map_err(StorageError::Open)?
            }
            StorageLocation::Directory(dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|source| StorageError::Directory {
                        path: dir.clone(),
                        source,
                    })?;
                SqliteConnectOptions::new()
                    .filename(dir.join(format!("{id}.sqlite")))
                    .create_if_missing(true)
            }
        };

        // One long-lived connection: an in-memory database disappears with
        // its connection, and the owning actor never issues concurrent queries.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(StorageError::Open)?;

        Ok(Self { pool })
    }

    /// Execute `sql` and return its only row.
    pub async fn query_one(&self, sql: &str) -> Result<SqliteRow, StorageError> {
        let mut rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Query)?;

        if rows.len() != 1 {
            return Err(StorageError::RowCount { found: rows.len() });
        }
        Ok(rows.swap_remove(0))
    }

    /// Read a text column from a row
    pub fn text_column(row: &SqliteRow, column: &str) -> Result<String, StorageError> {
        row.try_get::<String, _>(column)
            .map_err(|source| StorageError::Column {
                column: column.to_string(),
                source,
            })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_one_memory() {
        let id = ObjectId::from_name("/store");
        let storage = SqlStorage::open(&StorageLocation::Memory, &id).await.unwrap();
        let row = storage
            .query_one("SELECT 'Hello, World!' as greeting")
            .await
            .unwrap();
        assert_eq!(
            SqlStorage::text_column(&row, "greeting").unwrap(),
            "Hello, World!"
        );
        storage.close().await;
    }

    #[tokio::test]
    async fn test_query_one_rejects_row_counts() {
        let id = ObjectId::from_name("/rows");
        let storage = SqlStorage::open(&StorageLocation::Memory, &id).await.unwrap();

        let err = storage
            .query_one("SELECT 1 AS n UNION ALL SELECT 2")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::RowCount { found: 2 }));

        let err = storage
            .query_one("SELECT 1 AS n WHERE 0")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::RowCount { found: 0 }));
    }

    #[tokio::test]
    async fn test_missing_column() {
        let id = ObjectId::from_name("/column");
        let storage = SqlStorage::open(&StorageLocation::Memory, &id).await.unwrap();
        let row = storage.query_one("SELECT 'x' AS a").await.unwrap();
        let err = SqlStorage::text_column(&row, "b").unwrap_err();
        assert!(matches!(err, StorageError::Column { ref column, .. } if column == "b"));
    }

    #[tokio::test]
    async fn test_invalid_sql() {
        let id = ObjectId::from_name("/bad");
        let storage = SqlStorage::open(&StorageLocation::Memory, &id).await.unwrap();
        let err = storage.query_one("SELEC nothing").await.err().unwrap();
        assert!(matches!(err, StorageError::Query(_)));
    }

    #[tokio::test]
    async fn test_directory_store_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("objects");
        let id = ObjectId::from_name("/greet");
        let storage = SqlStorage::open(&StorageLocation::Directory(root.clone()), &id)
            .await
            .unwrap();
        storage.query_one("SELECT 1 AS n").await.unwrap();
        storage.close().await;

        assert!(root.join(format!("{id}.sqlite")).exists());
    }

    #[test]
    fn test_location_from_config() {
        assert_eq!(StorageLocation::from_config(None), StorageLocation::Memory);
        assert_eq!(StorageLocation::from_config(Some("")), StorageLocation::Memory);
        assert_eq!(
            StorageLocation::from_config(Some("data/objects")),
            StorageLocation::Directory(PathBuf::from("data/objects"))
        );
    }
}
