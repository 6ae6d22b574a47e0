use crate::index::key::CompositeKey;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A generic ordered multi-valued store addressed by composite keys.
///
/// Every present key maps to a list of values, never to a bare scalar; the
/// list may be empty. The map has no domain knowledge — it is the foundation
/// the [`Indexer`](crate::index::Indexer) builds its key space on.
///
/// Cloning is a deep copy: nested lists are cloned along with the outer map,
/// so two clones never alias the same list. Callers that want copy-on-write
/// snapshots clone the whole map and mutate the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMap<V> {
    entries: BTreeMap<CompositeKey, Vec<V>>,
}

impl<V> MultiMap<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the list stored at `key`, or `None` if the key is absent.
    pub fn get(&self, key: &CompositeKey) -> Option<&[V]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, key: &CompositeKey) -> Option<&mut Vec<V>> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &CompositeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Replaces (or creates) the entry for `key` with exactly `values`.
    /// Overwrites silently.
    pub fn insert(&mut self, key: CompositeKey, values: Vec<V>) {
        self.entries.insert(key, values);
    }

    /// Removes the entry entirely. Returns `None` (not an error) if absent.
    pub fn remove(&mut self, key: &CompositeKey) -> Option<Vec<V>> {
        self.entries.remove(key)
    }

    /// Appends all elements of `values` to the list at `key`, creating an
    /// empty list first if the key is absent. Never fails.
    pub fn push_back<I>(&mut self, key: &CompositeKey, values: I)
    where
        I: IntoIterator<Item = V>,
    {
        match self.entries.get_mut(key) {
            Some(list) => list.extend(values),
            None => {
                self.entries.insert(key.clone(), values.into_iter().collect());
            }
        }
    }

    /// Prepends all elements of `values` (in their given order) to the list
    /// at `key`, creating an empty list first if the key is absent.
    pub fn push_front<I>(&mut self, key: &CompositeKey, values: I)
    where
        I: IntoIterator<Item = V>,
    {
        let mut incoming: Vec<V> = values.into_iter().collect();
        match self.entries.get_mut(key) {
            Some(list) => {
                incoming.append(list);
                *list = incoming;
            }
            None => {
                self.entries.insert(key.clone(), incoming);
            }
        }
    }

    /// Removes and returns the last element of the list at `key`; `None` if
    /// the key is absent or the list is empty.
    pub fn pop_back(&mut self, key: &CompositeKey) -> Option<V> {
        self.entries.get_mut(key)?.pop()
    }

    /// Removes and returns the first element of the list at `key`; `None` if
    /// the key is absent or the list is empty.
    pub fn pop_front(&mut self, key: &CompositeKey) -> Option<V> {
        let list = self.entries.get_mut(key)?;
        if list.is_empty() {
            None
        } else {
            Some(list.remove(0))
        }
    }

    /// Resets the entry at `key` to an empty list; the key remains present
    /// (it is created if absent).
    pub fn reset(&mut self, key: &CompositeKey) {
        match self.entries.get_mut(key) {
            Some(list) => list.clear(),
            None => {
                self.entries.insert(key.clone(), Vec::new());
            }
        }
    }

    /// Resets every existing entry to an empty list; keys remain.
    pub fn reset_all(&mut self) {
        for list in self.entries.values_mut() {
            list.clear();
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A fresh traversal over the current entries; restartable by calling
    /// again.
    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &[V])> {
        self.entries.iter().map(|(key, list)| (key, list.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CompositeKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &[V]> {
        self.entries.values().map(Vec::as_slice)
    }
}

impl<V> Default for MultiMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(CompositeKey, Vec<V>)> for MultiMap<V> {
    fn from_iter<I: IntoIterator<Item = (CompositeKey, Vec<V>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V> Extend<(CompositeKey, Vec<V>)> for MultiMap<V> {
    fn extend<I: IntoIterator<Item = (CompositeKey, Vec<V>)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

// Serialized as a sequence of [key, values] pairs rather than a JSON object:
// composite keys are segment arrays, not strings, and this keeps arbitrary
// segment content round-trippable.
impl<V: Serialize> Serialize for MultiMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for MultiMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(CompositeKey, Vec<V>)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(segments: &[&str]) -> CompositeKey {
        CompositeKey::new(segments.iter().copied())
    }

    #[test]
    fn test_get_and_contains_on_missing_key() {
        let map: MultiMap<u32> = MultiMap::new();
        assert!(map.get(&key(&["a"])).is_none());
        assert!(!map.contains_key(&key(&["a"])));
        assert!(map.is_empty());
    }

    #[test]
    fn test_insert_replaces_silently() {
        let mut map = MultiMap::new();
        map.insert(key(&["a"]), vec![1, 2]);
        map.insert(key(&["a"]), vec![3]);
        assert_eq!(map.get(&key(&["a"])), Some([3].as_slice()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_push_back_creates_and_extends() {
        let mut map = MultiMap::new();
        map.push_back(&key(&["a"]), [1, 2]);
        map.push_back(&key(&["a"]), [3]);
        assert_eq!(map.get(&key(&["a"])), Some([1, 2, 3].as_slice()));
    }

    #[test]
    fn test_push_front_creates_and_prepends() {
        let mut map = MultiMap::new();
        map.push_front(&key(&["a"]), [3]);
        map.push_front(&key(&["a"]), [1, 2]);
        assert_eq!(map.get(&key(&["a"])), Some([1, 2, 3].as_slice()));
    }

    #[test]
    fn test_pop_on_missing_or_empty() {
        let mut map: MultiMap<u32> = MultiMap::new();
        assert_eq!(map.pop_back(&key(&["a"])), None);
        assert_eq!(map.pop_front(&key(&["a"])), None);

        map.insert(key(&["a"]), Vec::new());
        assert_eq!(map.pop_back(&key(&["a"])), None);
        assert_eq!(map.pop_front(&key(&["a"])), None);
        // The key stays present with its empty list.
        assert!(map.contains_key(&key(&["a"])));
    }

    #[test]
    fn test_pop_back_and_front_order() {
        let mut map = MultiMap::new();
        map.push_back(&key(&["a"]), [1, 2, 3]);
        assert_eq!(map.pop_front(&key(&["a"])), Some(1));
        assert_eq!(map.pop_back(&key(&["a"])), Some(3));
        assert_eq!(map.get(&key(&["a"])), Some([2].as_slice()));
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut map: MultiMap<u32> = MultiMap::new();
        assert_eq!(map.remove(&key(&["a"])), None);

        map.insert(key(&["a"]), vec![1]);
        assert_eq!(map.remove(&key(&["a"])), Some(vec![1]));
        assert!(!map.contains_key(&key(&["a"])));
    }

    #[test]
    fn test_reset_keeps_key_present() {
        let mut map = MultiMap::new();
        map.insert(key(&["a"]), vec![1, 2]);
        map.reset(&key(&["a"]));
        assert_eq!(map.get(&key(&["a"])), Some([].as_slice()));
        assert!(map.contains_key(&key(&["a"])));
    }

    #[test]
    fn test_reset_all_and_clear() {
        let mut map = MultiMap::new();
        map.insert(key(&["a"]), vec![1]);
        map.insert(key(&["b"]), vec![2, 3]);

        map.reset_all();
        assert_eq!(map.len(), 2);
        assert!(map.values().all(|list| list.is_empty()));

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut map = MultiMap::new();
        map.insert(key(&["a"]), vec![1]);
        map.insert(key(&["b"]), vec![2]);

        let first: Vec<_> = map.keys().cloned().collect();
        let second: Vec<_> = map.keys().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(map.iter().count(), 2);
        assert_eq!(map.values().count(), 2);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = MultiMap::new();
        original.insert(key(&["a"]), vec![1, 2]);

        let mut copy = original.clone();
        copy.push_back(&key(&["a"]), [3]);

        // The source list is untouched by mutations of the clone.
        assert_eq!(original.get(&key(&["a"])), Some([1, 2].as_slice()));
        assert_eq!(copy.get(&key(&["a"])), Some([1, 2, 3].as_slice()));
    }

    #[test]
    fn test_from_entries() {
        let map: MultiMap<u32> =
            [(key(&["a"]), vec![1]), (key(&["b", "c"]), vec![2, 3])].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key(&["b", "c"])), Some([2, 3].as_slice()));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut map = MultiMap::new();
        map.insert(key(&["a", "b/c"]), vec![1, 2]);
        map.insert(key(&["d"]), Vec::new());

        let json = serde_json::to_string(&map).unwrap();
        let back: MultiMap<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
