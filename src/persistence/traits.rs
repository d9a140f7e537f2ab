//! Storage interfaces consumed by the notification log and related services.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Serialize, de::DeserializeOwned};

use crate::persistence::error::PersistenceError;

/// A typed key-value view over the application state store.
///
/// Values are stored as JSON. Writes to a single key are atomic; callers that
/// need read-modify-write semantics across a key must serialize access
/// themselves (the dispatcher holds a per-group lock across its pipeline run
/// for exactly this reason).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a JSON-serializable state object by its key.
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError>;

    /// Sets or updates a JSON-serializable state object by its key.
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError>;

    /// Deletes the state stored under a key. Deleting an absent key is not an
    /// error.
    async fn delete_state(&self, key: &str) -> Result<(), PersistenceError>;

    /// Retrieves all states whose key starts with the given prefix, together
    /// with their keys.
    async fn get_all_json_states_by_prefix<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, PersistenceError>;
}
