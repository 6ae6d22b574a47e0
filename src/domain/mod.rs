pub mod card;
pub mod category;

pub use card::Card;
pub use category::Category;

use crate::index::Indexer;

/// Key name parameterizing the parent half of the board's key namespace.
pub const CATEGORY_KEY_NAME: &str = "Category";
/// Key name parameterizing the child half of the board's key namespace.
pub const TASK_KEY_NAME: &str = "Task";

/// The indexer instantiation the board UI works against.
pub type BoardIndexer = Indexer<Category, Card>;

/// Creates an empty board index with the standard key namespace.
pub fn new_board_indexer() -> BoardIndexer {
    Indexer::new(CATEGORY_KEY_NAME, TASK_KEY_NAME)
}
