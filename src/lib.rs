//! # Taskboard Core
//!
//! Core index structures for Taskboard kanban state management.
//!
//! This crate provides the nested parent/child indexer that backs a
//! drag-and-drop kanban board: an ordered collection of categories, an
//! ordered card list per category, and the derived lookup and
//! back-reference indexes, kept consistent under create/update/move/remove
//! operations. It has no dependency on specific UI implementations.

pub mod domain;
pub mod error;
pub mod index;
pub mod storage;

// Re-export commonly used types
pub use domain::{new_board_indexer, BoardIndexer, Card, Category};
pub use error::{Result, TaskboardError};
pub use index::{
    CompositeKey, Identifiable, IndexEntry, IndexKey, Indexer, KeySchema, MultiMap, Placement,
};
pub use storage::SnapshotStore;
