use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of string segments used as a single logical lookup key.
///
/// Two keys are equal iff they hold the same segments, in the same order,
/// with the same content. The segment sequence itself is the physical lookup
/// token (via the derived `Ord`/`Hash`), so no join-and-escape scheme is
/// needed for collision freedom; [`fmt::Display`] renders a joined form for
/// diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for CompositeKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Typed description of one slot in the indexer's key space.
///
/// The indexer never assembles composite keys from raw strings; every lookup
/// goes through one of these variants rendered by [`KeySchema::key`], which
/// rules out segment-order and tag typos at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKey<'a> {
    /// Ordered list of all parent ids (display order). Exactly one exists.
    ParentIdList,
    /// Singleton list wrapping one parent record.
    Parent(&'a str),
    /// Ordered list of the child ids owned by one parent.
    ChildIdList(&'a str),
    /// Singleton list wrapping one child record.
    Child(&'a str),
    /// Singleton list wrapping the owning parent's id (back-reference).
    ParentRef(&'a str),
}

/// Naming context that renders [`IndexKey`] variants into composite keys.
///
/// The two key names parameterize the namespace, e.g. `"Category"`/`"Task"`
/// produce `CategoryIdList`, `CategoryId` and `TaskIdList` tags. The names
/// must differ, otherwise parent and child record keys collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    parent_key_name: String,
    child_key_name: String,
}

impl KeySchema {
    pub fn new(parent_key_name: impl Into<String>, child_key_name: impl Into<String>) -> Self {
        Self {
            parent_key_name: parent_key_name.into(),
            child_key_name: child_key_name.into(),
        }
    }

    pub fn parent_key_name(&self) -> &str {
        &self.parent_key_name
    }

    pub fn child_key_name(&self) -> &str {
        &self.child_key_name
    }

    fn parent_id_tag(&self) -> String {
        format!("{}Id", self.parent_key_name)
    }

    fn parent_id_list_tag(&self) -> String {
        format!("{}IdList", self.parent_key_name)
    }

    fn child_id_tag(&self) -> String {
        format!("{}Id", self.child_key_name)
    }

    fn child_id_list_tag(&self) -> String {
        format!("{}IdList", self.child_key_name)
    }

    /// Renders a typed key into the composite key stored in the multimap.
    pub fn key(&self, key: IndexKey<'_>) -> CompositeKey {
        match key {
            IndexKey::ParentIdList => CompositeKey::new([self.parent_id_list_tag()]),
            IndexKey::Parent(id) => CompositeKey::new([self.parent_id_tag(), id.to_owned()]),
            IndexKey::ChildIdList(parent_id) => CompositeKey::new([
                self.parent_id_tag(),
                parent_id.to_owned(),
                self.child_id_list_tag(),
            ]),
            IndexKey::Child(id) => CompositeKey::new([self.child_id_tag(), id.to_owned()]),
            IndexKey::ParentRef(child_id) => CompositeKey::new([
                self.child_id_tag(),
                child_id.to_owned(),
                self.parent_id_tag(),
            ]),
        }
    }

    /// Returns the parent id if `key` is a parent record key.
    pub(crate) fn as_parent_record<'k>(&self, key: &'k CompositeKey) -> Option<&'k str> {
        match key.segments() {
            [tag, id] if *tag == self.parent_id_tag() => Some(id.as_str()),
            _ => None,
        }
    }

    /// Returns the child id if `key` is a child record key.
    pub(crate) fn as_child_record<'k>(&self, key: &'k CompositeKey) -> Option<&'k str> {
        match key.segments() {
            [tag, id] if *tag == self.child_id_tag() => Some(id.as_str()),
            _ => None,
        }
    }

    /// Returns the child id if `key` is a back-reference key.
    pub(crate) fn as_parent_ref<'k>(&self, key: &'k CompositeKey) -> Option<&'k str> {
        match key.segments() {
            [tag, id, ref_tag] if *tag == self.child_id_tag() && *ref_tag == self.parent_id_tag() => {
                Some(id.as_str())
            }
            _ => None,
        }
    }
}
