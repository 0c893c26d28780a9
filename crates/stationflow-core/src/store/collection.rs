// ── Generic ordered reactive collection ──
//
// `DashMap` storage with an insertion sequence per entry, so snapshots
// keep a stable order: replacing a value keeps its slot, new keys go to
// the end. Every mutation rebuilds the snapshot that subscribers receive.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;

struct Slot<T> {
    seq: u64,
    value: Arc<T>,
}

pub(crate) struct EntityCollection<K, T>
where
    K: Eq + Hash + Clone,
    T: Send + Sync + 'static,
{
    entries: DashMap<K, Slot<T>>,
    next_seq: AtomicU64,
    /// Bumped on every mutation.
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Eq + Hash + Clone,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            version,
            snapshot,
        }
    }

    /// Insert or replace a value. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, value: T) -> bool {
        let is_new = self.put(key, Arc::new(value));
        self.publish();
        is_new
    }

    /// Remove a value by key, returning it if present.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.entries.remove(key).map(|(_, slot)| slot.value);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Replace the whole collection; the iteration order becomes the
    /// snapshot order. Subscribers see a single change.
    pub(crate) fn replace_all<I>(&self, items: I)
    where
        I: IntoIterator<Item = (K, Arc<T>)>,
    {
        self.entries.clear();
        for (key, value) in items {
            self.put(key, value);
        }
        self.publish();
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.entries.get(key).map(|r| Arc::clone(&r.value().value))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn put(&self, key: K, value: Arc<T>) -> bool {
        if let Some(mut slot) = self.entries.get_mut(&key) {
            slot.value = value;
            return false;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, Slot { seq, value });
        true
    }

    fn publish(&self) {
        let mut ordered: Vec<(u64, Arc<T>)> = self
            .entries
            .iter()
            .map(|r| (r.value().seq, Arc::clone(&r.value().value)))
            .collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        let values: Vec<Arc<T>> = ordered.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn values(col: &EntityCollection<&'static str, String>) -> Vec<String> {
        col.snapshot().iter().map(|v| (**v).clone()).collect()
    }

    #[test]
    fn upsert_reports_new_keys_and_keeps_slot_on_replace() {
        let col = EntityCollection::new();
        assert!(col.upsert("a", "a1".to_owned()));
        assert!(col.upsert("b", "b1".to_owned()));
        assert!(!col.upsert("a", "a2".to_owned()));
        assert_eq!(values(&col), vec!["a2", "b1"]);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn remove_and_version_tracking() {
        let col = EntityCollection::new();
        col.upsert("a", "x".to_owned());
        let before = col.version();
        assert_eq!(*col.remove(&"a").unwrap(), "x");
        assert!(col.remove(&"a").is_none());
        assert_eq!(col.version(), before + 1);
        assert!(col.snapshot().is_empty());
    }

    #[test]
    fn replace_all_uses_iteration_order() {
        let col = EntityCollection::new();
        col.upsert("a", "a".to_owned());
        col.replace_all([("c", Arc::new("c".to_owned())), ("a", Arc::new("a".to_owned()))]);
        assert_eq!(values(&col), vec!["c", "a"]);
        assert!(col.contains(&"c"));
        assert_eq!(*col.get(&"a").unwrap(), "a");
    }
}
