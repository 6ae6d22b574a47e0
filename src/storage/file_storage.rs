use crate::{
    domain::{new_board_indexer, BoardIndexer},
    error::{Result, TaskboardError},
    storage::SnapshotStore,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based snapshot storage implementation
pub struct FileSnapshotStore {
    root_path: PathBuf,
}

impl FileSnapshotStore {
    const TASKBOARD_DIR: &'static str = ".taskboard";
    const SNAPSHOT_FILE: &'static str = "board.json";

    /// Creates a new FileSnapshotStore instance for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::TASKBOARD_DIR),
        }
    }

    fn snapshot_file(&self) -> PathBuf {
        self.root_path.join(Self::SNAPSHOT_FILE)
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        // Seed an empty board if no snapshot exists yet
        if !self.snapshot_file().exists() {
            let indexer = new_board_indexer();
            self.save_snapshot(&indexer).await?;
        }

        Ok(())
    }

    async fn save_snapshot(&self, indexer: &BoardIndexer) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let json = serde_json::to_string_pretty(indexer)?;
        fs::write(self.snapshot_file(), json).await?;

        Ok(())
    }

    async fn load_snapshot(&self) -> Result<BoardIndexer> {
        let snapshot_file = self.snapshot_file();

        if !snapshot_file.exists() {
            return Err(TaskboardError::SnapshotNotInitialized);
        }

        let contents = fs::read_to_string(&snapshot_file).await?;
        let indexer: BoardIndexer = serde_json::from_str(&contents)?;

        Ok(indexer)
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.snapshot_file().exists()
    }
}
