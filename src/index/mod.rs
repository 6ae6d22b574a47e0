pub mod indexer;
pub mod key;
pub mod multimap;

pub use indexer::{Identifiable, IndexEntry, Indexer, Placement};
pub use key::{CompositeKey, IndexKey, KeySchema};
pub use multimap::MultiMap;
