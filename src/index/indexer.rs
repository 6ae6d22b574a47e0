use crate::error::{Result, TaskboardError};
use crate::index::key::{CompositeKey, IndexKey, KeySchema};
use crate::index::multimap::MultiMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Capability bound for the records the indexer manages: anything with a
/// stable string id. Callers attach whatever payload fields they need.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Which end of an ordered id list a newly created record lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Front,
    Back,
}

/// One stored value in the indexer's multimap: a parent record, a child
/// record, or a bare id (used by the ordered id lists and back-references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexEntry<P, C> {
    Parent(P),
    Child(C),
    Id(String),
}

impl<P, C> IndexEntry<P, C> {
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_parent(&self) -> Option<&P> {
        match self {
            Self::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn as_parent_mut(&mut self) -> Option<&mut P> {
        match self {
            Self::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn as_child(&self) -> Option<&C> {
        match self {
            Self::Child(child) => Some(child),
            _ => None,
        }
    }

    pub fn as_child_mut(&mut self) -> Option<&mut C> {
        match self {
            Self::Child(child) => Some(child),
            _ => None,
        }
    }

    pub fn into_parent(self) -> Option<P> {
        match self {
            Self::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn into_child(self) -> Option<C> {
        match self {
            Self::Child(child) => Some(child),
            _ => None,
        }
    }
}

/// Splice-move: remove the element at `idx_from` and reinsert it at `idx_to`.
/// A target index past the shortened list clamps to the end.
fn splice_move<T>(list: &mut Vec<T>, idx_from: usize, idx_to: usize) -> Result<()> {
    if idx_from >= list.len() {
        return Err(TaskboardError::IndexOutOfBounds {
            index: idx_from,
            len: list.len(),
        });
    }
    let entry = list.remove(idx_from);
    let idx_to = idx_to.min(list.len());
    list.insert(idx_to, entry);
    Ok(())
}

/// Two-level parent/child hierarchy index.
///
/// Maintains, in one underlying [`MultiMap`]:
/// - the ordered parent-id list (display order),
/// - a singleton record entry per parent and per child,
/// - an ordered child-id list per parent,
/// - a back-reference from each attached child to its owning parent.
///
/// All five key shapes are rendered through the typed [`IndexKey`] schema.
/// Mutations are the sole legal way to modify the hierarchy and keep every
/// cross-index consistent; multi-step mutations check all their
/// preconditions before the first write, so a failed call never commits
/// partial state.
///
/// The structure is synchronous and single-owner; `&mut self` receivers make
/// concurrent mutation a compile error. Snapshot-style state integration is
/// `let mut next = current.clone()` (a deep copy), mutate `next`, publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indexer<P, C> {
    schema: KeySchema,
    entries: MultiMap<IndexEntry<P, C>>,
}

impl<P: Identifiable, C: Identifiable> Indexer<P, C> {
    /// Creates an empty index: the parent-id list exists and nothing else.
    pub fn new(parent_key_name: impl Into<String>, child_key_name: impl Into<String>) -> Self {
        let schema = KeySchema::new(parent_key_name, child_key_name);
        let mut entries = MultiMap::new();
        entries.insert(schema.key(IndexKey::ParentIdList), Vec::new());
        Self { schema, entries }
    }

    /// Builds an index over an explicit entry list. The parent-id list is
    /// installed if the entries do not carry one. No integrity checking is
    /// performed here; callers with untrusted entries should follow up with
    /// [`Indexer::verify_integrity`].
    pub fn from_entries<I>(
        parent_key_name: impl Into<String>,
        child_key_name: impl Into<String>,
        entries: I,
    ) -> Self
    where
        I: IntoIterator<Item = (CompositeKey, Vec<IndexEntry<P, C>>)>,
    {
        let schema = KeySchema::new(parent_key_name, child_key_name);
        let mut entries: MultiMap<IndexEntry<P, C>> = entries.into_iter().collect();
        let root = schema.key(IndexKey::ParentIdList);
        if !entries.contains_key(&root) {
            entries.insert(root, Vec::new());
        }
        Self { schema, entries }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Read access to the raw key space, mainly for tests and snapshots.
    pub fn entries(&self) -> &MultiMap<IndexEntry<P, C>> {
        &self.entries
    }

    fn key(&self, key: IndexKey<'_>) -> CompositeKey {
        self.schema.key(key)
    }

    fn ids_at(&self, key: &CompositeKey) -> Option<Vec<String>> {
        let entries = self.entries.get(key)?;
        Some(
            entries
                .iter()
                .filter_map(IndexEntry::as_id)
                .map(str::to_owned)
                .collect(),
        )
    }

    // ---- queries -------------------------------------------------------

    /// The ordered list of parent ids, or `None` if the index was built from
    /// entries that lost the root list.
    pub fn parent_id_list(&self) -> Option<Vec<String>> {
        let key = self.key(IndexKey::ParentIdList);
        self.ids_at(&key)
    }

    pub fn parent_count(&self) -> usize {
        self.parent_id_list().map_or(0, |list| list.len())
    }

    /// Resolves the parent-id list to the stored records, in display order.
    /// Ids without a record are skipped with a warning rather than aborting
    /// the whole query.
    pub fn parents(&self) -> Vec<&P> {
        let Some(ids) = self.parent_id_list() else {
            warn!("parent id list is missing; no parents to resolve");
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                let parent = self.get_parent(id);
                if parent.is_none() {
                    warn!(parent_id = %id, "parent id in display order has no record; skipping");
                }
                parent
            })
            .collect()
    }

    pub fn get_parent(&self, parent_id: &str) -> Option<&P> {
        let key = self.key(IndexKey::Parent(parent_id));
        self.entries.get(&key)?.first()?.as_parent()
    }

    /// Mutable borrow of a stored parent record, for in-place edits.
    pub fn get_parent_mut(&mut self, parent_id: &str) -> Option<&mut P> {
        let key = self.key(IndexKey::Parent(parent_id));
        self.entries.get_mut(&key)?.first_mut()?.as_parent_mut()
    }

    /// The ordered child-id list of one parent, or `None` if the parent does
    /// not exist.
    pub fn child_id_list(&self, parent_id: &str) -> Option<Vec<String>> {
        let key = self.key(IndexKey::ChildIdList(parent_id));
        self.ids_at(&key)
    }

    pub fn child_count_of(&self, parent_id: &str) -> Option<usize> {
        self.child_id_list(parent_id).map(|list| list.len())
    }

    /// Resolves one parent's child-id list to the stored records, in display
    /// order; `None` if the parent does not exist. Dangling ids are skipped
    /// with a warning.
    pub fn children_of(&self, parent_id: &str) -> Option<Vec<&C>> {
        let ids = self.child_id_list(parent_id)?;
        Some(
            ids.iter()
                .filter_map(|id| {
                    let child = self.get_child(id);
                    if child.is_none() {
                        warn!(
                            child_id = %id,
                            parent_id = %parent_id,
                            "child id in display order has no record; skipping"
                        );
                    }
                    child
                })
                .collect(),
        )
    }

    pub fn get_child(&self, child_id: &str) -> Option<&C> {
        let key = self.key(IndexKey::Child(child_id));
        self.entries.get(&key)?.first()?.as_child()
    }

    /// Mutable borrow of a stored child record, for in-place edits.
    pub fn get_child_mut(&mut self, child_id: &str) -> Option<&mut C> {
        let key = self.key(IndexKey::Child(child_id));
        self.entries.get_mut(&key)?.first_mut()?.as_child_mut()
    }

    /// The id of the parent owning `child_id`, or `None` if the child does
    /// not exist or is detached.
    pub fn parent_id_of(&self, child_id: &str) -> Option<&str> {
        let key = self.key(IndexKey::ParentRef(child_id));
        self.entries.get(&key)?.first()?.as_id()
    }

    /// Ids of child records left behind without a back-reference, e.g. after
    /// [`Indexer::remove_parent`].
    pub fn orphan_child_ids(&self) -> Vec<String> {
        self.entries
            .keys()
            .filter_map(|key| self.schema.as_child_record(key))
            .filter(|id| self.parent_id_of(id).is_none())
            .map(str::to_owned)
            .collect()
    }

    // ---- mutations -----------------------------------------------------

    /// Indexes a new parent: record entry, a slot at the chosen end of the
    /// parent-id list, and an empty child-id list.
    pub fn create_parent(&mut self, parent: P, placement: Placement) -> Result<()> {
        let id = parent.id().to_owned();
        let record_key = self.key(IndexKey::Parent(&id));
        if self.entries.contains_key(&record_key) {
            return Err(TaskboardError::DuplicateParentId(id));
        }

        let list_key = self.key(IndexKey::ParentIdList);
        match placement {
            Placement::Front => self.entries.push_front(&list_key, [IndexEntry::Id(id.clone())]),
            Placement::Back => self.entries.push_back(&list_key, [IndexEntry::Id(id.clone())]),
        }
        let child_list_key = self.key(IndexKey::ChildIdList(&id));
        self.entries.insert(child_list_key, Vec::new());
        self.entries.insert(record_key, vec![IndexEntry::Parent(parent)]);
        Ok(())
    }

    /// Indexes a new child under `parent_id`: record entry, a slot at the
    /// chosen end of the parent's child-id list, and the back-reference.
    pub fn create_child(&mut self, parent_id: &str, child: C, placement: Placement) -> Result<()> {
        let id = child.id().to_owned();
        let record_key = self.key(IndexKey::Child(&id));
        if self.entries.contains_key(&record_key) {
            return Err(TaskboardError::DuplicateChildId(id));
        }

        let list_key = self.key(IndexKey::ChildIdList(parent_id));
        if !self.entries.contains_key(&list_key) {
            return Err(TaskboardError::ParentNotFound(parent_id.to_owned()));
        }
        match placement {
            Placement::Front => self.entries.push_front(&list_key, [IndexEntry::Id(id.clone())]),
            Placement::Back => self.entries.push_back(&list_key, [IndexEntry::Id(id.clone())]),
        }
        let ref_key = self.key(IndexKey::ParentRef(&id));
        self.entries
            .insert(ref_key, vec![IndexEntry::Id(parent_id.to_owned())]);
        self.entries.insert(record_key, vec![IndexEntry::Child(child)]);
        Ok(())
    }

    /// Replaces the record stored under `parent_id` with `parent`.
    ///
    /// When the record keeps its id this is a pure content swap. When the id
    /// changes, the parent's identity migrates: its display-order slot keeps
    /// its position under the new id, its child-id list is rekeyed, and every
    /// owned child's back-reference is repointed. All preconditions are
    /// checked before the first write.
    pub fn update_parent(&mut self, parent_id: &str, parent: P) -> Result<()> {
        let old_record_key = self.key(IndexKey::Parent(parent_id));
        if !self.entries.contains_key(&old_record_key) {
            return Err(TaskboardError::ParentNotFound(parent_id.to_owned()));
        }

        let new_id = parent.id().to_owned();
        if new_id == parent_id {
            self.entries
                .insert(old_record_key, vec![IndexEntry::Parent(parent)]);
            return Ok(());
        }

        let new_record_key = self.key(IndexKey::Parent(&new_id));
        if self.entries.contains_key(&new_record_key) {
            return Err(TaskboardError::DuplicateParentId(new_id));
        }
        let list_key = self.key(IndexKey::ParentIdList);
        let slot = self
            .entries
            .get(&list_key)
            .ok_or(TaskboardError::ParentIdListMissing)?
            .iter()
            .position(|entry| entry.as_id() == Some(parent_id))
            .ok_or_else(|| TaskboardError::ParentNotFound(parent_id.to_owned()))?;
        let old_child_list_key = self.key(IndexKey::ChildIdList(parent_id));
        let child_ids = self
            .ids_at(&old_child_list_key)
            .ok_or_else(|| TaskboardError::ParentNotFound(parent_id.to_owned()))?;

        // Checks done; apply the migration.
        if let Some(list) = self.entries.get_mut(&list_key) {
            list[slot] = IndexEntry::Id(new_id.clone());
        }
        let children = self.entries.remove(&old_child_list_key).unwrap_or_default();
        let new_child_list_key = self.key(IndexKey::ChildIdList(&new_id));
        self.entries.insert(new_child_list_key, children);
        for child_id in &child_ids {
            let ref_key = self.key(IndexKey::ParentRef(child_id));
            self.entries
                .insert(ref_key, vec![IndexEntry::Id(new_id.clone())]);
        }
        self.entries.remove(&old_record_key);
        self.entries
            .insert(new_record_key, vec![IndexEntry::Parent(parent)]);
        Ok(())
    }

    /// Replaces the record stored under `child_id` with `child`.
    ///
    /// Symmetric to [`Indexer::update_parent`]: content swap when the id is
    /// unchanged, otherwise an identity migration that keeps the child's
    /// position in its owner's child-id list and rekeys the back-reference
    /// and record. All preconditions are checked before the first write.
    pub fn update_child(&mut self, child_id: &str, child: C) -> Result<()> {
        let old_record_key = self.key(IndexKey::Child(child_id));
        if !self.entries.contains_key(&old_record_key) {
            return Err(TaskboardError::ChildNotFound(child_id.to_owned()));
        }

        let new_id = child.id().to_owned();
        if new_id == child_id {
            self.entries
                .insert(old_record_key, vec![IndexEntry::Child(child)]);
            return Ok(());
        }

        let new_record_key = self.key(IndexKey::Child(&new_id));
        if self.entries.contains_key(&new_record_key) {
            return Err(TaskboardError::DuplicateChildId(new_id));
        }
        let owner = self
            .parent_id_of(child_id)
            .ok_or_else(|| TaskboardError::ChildDetached(child_id.to_owned()))?
            .to_owned();
        let owner_list_key = self.key(IndexKey::ChildIdList(&owner));
        let slot = self
            .entries
            .get(&owner_list_key)
            .ok_or_else(|| TaskboardError::ParentNotFound(owner.clone()))?
            .iter()
            .position(|entry| entry.as_id() == Some(child_id))
            .ok_or_else(|| TaskboardError::ChildNotFound(child_id.to_owned()))?;

        // Checks done; apply the migration.
        if let Some(list) = self.entries.get_mut(&owner_list_key) {
            list[slot] = IndexEntry::Id(new_id.clone());
        }
        let old_ref_key = self.key(IndexKey::ParentRef(child_id));
        self.entries.remove(&old_ref_key);
        let new_ref_key = self.key(IndexKey::ParentRef(&new_id));
        self.entries.insert(new_ref_key, vec![IndexEntry::Id(owner)]);
        self.entries.remove(&old_record_key);
        self.entries
            .insert(new_record_key, vec![IndexEntry::Child(child)]);
        Ok(())
    }

    /// Unindexes a parent: display-order slot, child-id list, record entry,
    /// and every owned child's back-reference. The child records themselves
    /// are kept as detached orphans — [`Indexer::orphan_child_ids`] finds
    /// them and [`Indexer::remove_orphans`] reclaims them.
    pub fn remove_parent(&mut self, parent_id: &str) -> Result<P> {
        if self.get_parent(parent_id).is_none() {
            return Err(TaskboardError::ParentNotFound(parent_id.to_owned()));
        }

        let list_key = self.key(IndexKey::ParentIdList);
        if let Some(list) = self.entries.get_mut(&list_key) {
            if let Some(slot) = list.iter().position(|entry| entry.as_id() == Some(parent_id)) {
                list.remove(slot);
            }
        }

        let child_list_key = self.key(IndexKey::ChildIdList(parent_id));
        let child_entries = self.entries.remove(&child_list_key).unwrap_or_default();
        for entry in &child_entries {
            if let Some(child_id) = entry.as_id() {
                let ref_key = self.key(IndexKey::ParentRef(child_id));
                self.entries.remove(&ref_key);
            }
        }

        let record_key = self.key(IndexKey::Parent(parent_id));
        let mut record = self.entries.remove(&record_key).unwrap_or_default();
        record
            .pop()
            .and_then(IndexEntry::into_parent)
            .ok_or_else(|| TaskboardError::ParentNotFound(parent_id.to_owned()))
    }

    /// Unindexes a child: its slot in the owner's child-id list, the
    /// back-reference, and the record entry. Also accepts detached orphans.
    pub fn remove_child(&mut self, child_id: &str) -> Result<C> {
        if self.get_child(child_id).is_none() {
            return Err(TaskboardError::ChildNotFound(child_id.to_owned()));
        }

        if let Some(owner) = self.parent_id_of(child_id).map(str::to_owned) {
            let owner_list_key = self.key(IndexKey::ChildIdList(&owner));
            if let Some(list) = self.entries.get_mut(&owner_list_key) {
                if let Some(slot) = list.iter().position(|entry| entry.as_id() == Some(child_id)) {
                    list.remove(slot);
                }
            }
            let ref_key = self.key(IndexKey::ParentRef(child_id));
            self.entries.remove(&ref_key);
        }

        let record_key = self.key(IndexKey::Child(child_id));
        let mut record = self.entries.remove(&record_key).unwrap_or_default();
        record
            .pop()
            .and_then(IndexEntry::into_child)
            .ok_or_else(|| TaskboardError::ChildNotFound(child_id.to_owned()))
    }

    /// Removes every detached child record, returning the reclaimed records.
    pub fn remove_orphans(&mut self) -> Vec<C> {
        let ids = self.orphan_child_ids();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(child) = self.remove_child(&id) {
                removed.push(child);
            }
        }
        removed
    }

    /// Splice-moves one parent within the display order. `idx_from` must be
    /// in range; an out-of-range `idx_to` lands at the end.
    pub fn move_parent(&mut self, idx_from: usize, idx_to: usize) -> Result<()> {
        let list_key = self.key(IndexKey::ParentIdList);
        let list = self
            .entries
            .get_mut(&list_key)
            .ok_or(TaskboardError::ParentIdListMissing)?;
        splice_move(list, idx_from, idx_to)
    }

    /// Moves one child between (or within) child-id lists.
    ///
    /// Within one parent this is the splice-move of [`Indexer::move_parent`].
    /// Across parents the child leaves `parent_id_from` at `idx_from`,
    /// enters `parent_id_to` at `idx_to` (clamped), and its back-reference
    /// is repointed. Both lists are validated before the first write.
    pub fn move_child(
        &mut self,
        parent_id_from: &str,
        parent_id_to: &str,
        idx_from: usize,
        idx_to: usize,
    ) -> Result<()> {
        let from_key = self.key(IndexKey::ChildIdList(parent_id_from));
        if parent_id_from == parent_id_to {
            let list = self
                .entries
                .get_mut(&from_key)
                .ok_or_else(|| TaskboardError::ParentNotFound(parent_id_from.to_owned()))?;
            return splice_move(list, idx_from, idx_to);
        }

        let to_key = self.key(IndexKey::ChildIdList(parent_id_to));
        let from_len = self
            .entries
            .get(&from_key)
            .ok_or_else(|| TaskboardError::ParentNotFound(parent_id_from.to_owned()))?
            .len();
        if !self.entries.contains_key(&to_key) {
            return Err(TaskboardError::ParentNotFound(parent_id_to.to_owned()));
        }
        if idx_from >= from_len {
            return Err(TaskboardError::IndexOutOfBounds {
                index: idx_from,
                len: from_len,
            });
        }

        // Checks done; apply the move.
        let entry = match self.entries.get_mut(&from_key) {
            Some(list) => list.remove(idx_from),
            None => return Err(TaskboardError::ParentNotFound(parent_id_from.to_owned())),
        };
        let child_id = entry.as_id().map(str::to_owned);
        if let Some(list) = self.entries.get_mut(&to_key) {
            let idx_to = idx_to.min(list.len());
            list.insert(idx_to, entry);
        }
        if let Some(child_id) = child_id {
            let ref_key = self.key(IndexKey::ParentRef(&child_id));
            self.entries
                .insert(ref_key, vec![IndexEntry::Id(parent_id_to.to_owned())]);
        }
        Ok(())
    }

    // ---- integrity -----------------------------------------------------

    /// Checks every structural invariant of the key space: the parent-id
    /// list and parent records mirror each other, every listed child
    /// resolves and back-references its owner, no id is listed twice, each
    /// child is owned by at most one parent, and record/back-reference
    /// entries are singletons. Detached child records are legal.
    pub fn verify_integrity(&self) -> Result<()> {
        use std::collections::{BTreeMap, BTreeSet};

        let violation = |message: String| Err(TaskboardError::IntegrityViolation(message));

        let parent_ids = self
            .parent_id_list()
            .ok_or(TaskboardError::ParentIdListMissing)?;

        let mut seen_parents: BTreeSet<String> = BTreeSet::new();
        for id in &parent_ids {
            if !seen_parents.insert(id.clone()) {
                return violation(format!("parent id {id} listed twice in display order"));
            }
            if self.get_parent(id).is_none() {
                return violation(format!("parent id {id} in display order has no record"));
            }
            let child_list_key = self.key(IndexKey::ChildIdList(id));
            if !self.entries.contains_key(&child_list_key) {
                return violation(format!("parent {id} has no child id list"));
            }
        }

        let mut owner_of: BTreeMap<String, String> = BTreeMap::new();
        for parent_id in &parent_ids {
            let child_ids = self.child_id_list(parent_id).unwrap_or_default();
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            for child_id in &child_ids {
                if !seen.insert(child_id) {
                    return violation(format!(
                        "child id {child_id} listed twice under parent {parent_id}"
                    ));
                }
                if let Some(previous) = owner_of.insert(child_id.clone(), parent_id.clone()) {
                    return violation(format!(
                        "child {child_id} listed under both {previous} and {parent_id}"
                    ));
                }
                if self.get_child(child_id).is_none() {
                    return violation(format!(
                        "child id {child_id} under parent {parent_id} has no record"
                    ));
                }
                match self.parent_id_of(child_id) {
                    Some(owner) if owner == parent_id.as_str() => {}
                    Some(owner) => {
                        return violation(format!(
                            "child {child_id} back-references {owner}, expected {parent_id}"
                        ));
                    }
                    None => {
                        return violation(format!(
                            "child {child_id} under parent {parent_id} has no back-reference"
                        ));
                    }
                }
            }
        }

        for (key, list) in self.entries.iter() {
            if let Some(id) = self.schema.as_parent_record(key) {
                if list.len() != 1 {
                    return violation(format!("parent record {id} is not a singleton"));
                }
                if !seen_parents.contains(id) {
                    return violation(format!("parent record {id} is not in the display order"));
                }
            } else if let Some(id) = self.schema.as_child_record(key) {
                if list.len() != 1 {
                    return violation(format!("child record {id} is not a singleton"));
                }
            } else if let Some(id) = self.schema.as_parent_ref(key) {
                if list.len() != 1 {
                    return violation(format!("back-reference for {id} is not a singleton"));
                }
                if self.get_child(id).is_none() {
                    return violation(format!("back-reference for missing child {id}"));
                }
                if !owner_of.contains_key(id) {
                    return violation(format!(
                        "back-reference for {id} exists but no parent lists it"
                    ));
                }
            }
        }

        Ok(())
    }
}

impl<P: Identifiable + Serialize, C: Identifiable + Serialize> Indexer<P, C> {
    /// JSON snapshot of the whole index, for external persistence.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<P: Identifiable + DeserializeOwned, C: Identifiable + DeserializeOwned> Indexer<P, C> {
    /// Parses a snapshot produced by [`Indexer::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
