use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskboardError>;

#[derive(Debug, Error)]
pub enum TaskboardError {
    #[error("Parent already indexed: {0}")]
    DuplicateParentId(String),

    #[error("Child already indexed: {0}")]
    DuplicateChildId(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Child not found: {0}")]
    ChildNotFound(String),

    #[error("Child is not attached to any parent: {0}")]
    ChildDetached(String),

    #[error("Parent id list not initialized")]
    ParentIdListMissing,

    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Index integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Board snapshot not initialized")]
    SnapshotNotInitialized,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
