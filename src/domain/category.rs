use crate::index::Identifiable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A board column grouping cards, e.g. "To Do" or "Doing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates a new category with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title)
    }

    /// Creates a category with a caller-supplied id.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }
}

impl Identifiable for Category {
    fn id(&self) -> &str {
        &self.id
    }
}
