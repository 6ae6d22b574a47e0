use crate::{domain::BoardIndexer, error::Result};
use async_trait::async_trait;

pub mod file_storage;

/// Storage trait for persisting board index snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Saves the current board index snapshot
    async fn save_snapshot(&self, indexer: &BoardIndexer) -> Result<()>;

    /// Loads the persisted board index snapshot
    async fn load_snapshot(&self) -> Result<BoardIndexer>;

    /// Checks if a snapshot has been initialized
    async fn is_initialized(&self) -> bool;
}
