//! This module provides a concrete implementation of the state store using
//! SQLite.

use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

pub mod key_value_store;

use crate::persistence::error::PersistenceError;

/// A SQLite-backed state repository. Implements [`KeyValueStore`] for the
/// notification log and any other durable state.
///
/// [`KeyValueStore`]: crate::persistence::traits::KeyValueStore
pub struct SqliteStateRepository {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Creates a new instance of SqliteStateRepository with the provided
    /// database URL. This will create the database file if it does not
    /// exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("Failed to connect to database: {}", e))
        })?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Gets access to the underlying connection pool for advanced operations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ensures all pending writes are flushed to disk.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        // Force a checkpoint to flush WAL contents to the main database file.
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to checkpoint WAL.");
            PersistenceError::OperationFailed(e.to_string())
        })?;
        tracing::debug!("Pending writes flushed successfully.");
        Ok(())
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }

    /// Helper to execute database queries with consistent error handling
    async fn execute_query_with_error_handling<F, T, E>(
        &self,
        operation: &str,
        query_fn: F,
    ) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        query_fn.await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Database operation failed.");
            PersistenceError::OperationFailed(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::persistence::traits::KeyValueStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestState {
        counter: u64,
        note: String,
    }

    async fn setup_test_db() -> SqliteStateRepository {
        let repo = SqliteStateRepository::new("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory db");
        repo.run_migrations().await.expect("Failed to run migrations");
        repo
    }

    #[tokio::test]
    async fn test_get_set_roundtrip() {
        let repo = setup_test_db().await;

        let missing: Option<TestState> = repo.get_json_state("absent").await.unwrap();
        assert!(missing.is_none());

        let state = TestState { counter: 7, note: "hello".to_string() };
        repo.set_json_state("some:key", &state).await.unwrap();

        let loaded: Option<TestState> = repo.get_json_state("some:key").await.unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn test_set_replaces_existing_value() {
        let repo = setup_test_db().await;

        let first = TestState { counter: 1, note: "first".to_string() };
        let second = TestState { counter: 2, note: "second".to_string() };
        repo.set_json_state("k", &first).await.unwrap();
        repo.set_json_state("k", &second).await.unwrap();

        let loaded: Option<TestState> = repo.get_json_state("k").await.unwrap();
        assert_eq!(loaded, Some(second));
    }

    #[tokio::test]
    async fn test_delete_state() {
        let repo = setup_test_db().await;

        let state = TestState { counter: 3, note: "gone soon".to_string() };
        repo.set_json_state("doomed", &state).await.unwrap();
        repo.delete_state("doomed").await.unwrap();

        let loaded: Option<TestState> = repo.get_json_state("doomed").await.unwrap();
        assert!(loaded.is_none());

        // Deleting an absent key is a no-op.
        repo.delete_state("doomed").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_all_by_prefix() {
        let repo = setup_test_db().await;

        for i in 0..3u64 {
            let state = TestState { counter: i, note: format!("entry {i}") };
            repo.set_json_state(&format!("nflog:ops:{i}"), &state).await.unwrap();
        }
        let other = TestState { counter: 99, note: "other".to_string() };
        repo.set_json_state("cursor:evaluation", &other).await.unwrap();

        let entries: Vec<(String, TestState)> =
            repo.get_all_json_states_by_prefix("nflog:").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|(k, _)| k.starts_with("nflog:ops:")));
    }

    #[tokio::test]
    async fn test_prefix_scan_skips_undecodable_rows() {
        let repo = setup_test_db().await;

        repo.set_json_state("nflog:good", &TestState { counter: 1, note: "ok".to_string() })
            .await
            .unwrap();
        // A row under the same prefix with an incompatible shape.
        repo.set_json_state("nflog:bad", &vec![1, 2, 3]).await.unwrap();

        let entries: Vec<(String, TestState)> =
            repo.get_all_json_states_by_prefix("nflog:").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "nflog:good");
    }
}
