// ── Generic reactive entity collection ──
//
// Copy-on-write keyed storage published through `watch` channels. Every
// mutation swaps the whole map in one step, so readers always see a
// complete snapshot, and a bulk replace is a single publish.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;

type Entries<K, T> = Arc<BTreeMap<K, Arc<T>>>;

/// A reactive, atomically replaceable collection for one entity type.
///
/// `entries` is the source of truth; `snapshot` is the key-ordered `Vec`
/// that subscribers receive, rebuilt after every mutation.
pub(crate) struct EntityCollection<K, T>
where
    K: Ord + Copy + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    entries: watch::Sender<Entries<K, T>>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Ord + Copy + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(BTreeMap::new()));
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { entries, snapshot }
    }

    /// Swap the full contents. Subscribers observe one change.
    pub(crate) fn replace_all(&self, items: impl IntoIterator<Item = (K, T)>) {
        let map: BTreeMap<K, Arc<T>> = items
            .into_iter()
            .map(|(key, entity)| (key, Arc::new(entity)))
            .collect();
        self.entries.send_replace(Arc::new(map));
        self.rebuild_snapshot();
    }

    /// Insert or update an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let mut is_new = false;
        self.entries.send_modify(|map| {
            is_new = Arc::make_mut(map).insert(key, Arc::new(entity)).is_none();
        });
        self.rebuild_snapshot();
        is_new
    }

    /// Apply `f` to every entity; each `Some` replaces that entity. All
    /// replacements land in one publish. Returns the keys that changed.
    pub(crate) fn update_each(&self, mut f: impl FnMut(K, &T) -> Option<T>) -> Vec<K> {
        let mut changed = Vec::new();
        self.entries.send_if_modified(|map| {
            let updates: Vec<(K, T)> = map
                .iter()
                .filter_map(|(key, current)| f(*key, current).map(|next| (*key, next)))
                .collect();
            if updates.is_empty() {
                return false;
            }
            let map = Arc::make_mut(map);
            for (key, next) in updates {
                changed.push(key);
                map.insert(key, Arc::new(next));
            }
            true
        });
        if !changed.is_empty() {
            self.rebuild_snapshot();
        }
        changed
    }

    pub(crate) fn get(&self, key: K) -> Option<Arc<T>> {
        self.entries.borrow().get(&key).cloned()
    }

    pub(crate) fn contains(&self, key: K) -> bool {
        self.entries.borrow().contains_key(&key)
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn clear(&self) {
        self.entries.send_replace(Arc::new(BTreeMap::new()));
        self.rebuild_snapshot();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.entries.borrow().keys().copied().collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<T>> = self.entries.borrow().values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<u64, String> = EntityCollection::new();
        assert!(col.upsert(1, "front".into()));
        assert!(!col.upsert(1, "back".into()));
        assert_eq!(*col.get(1).unwrap(), "back");
    }

    #[test]
    fn replace_all_publishes_once() {
        let col: EntityCollection<u64, String> = EntityCollection::new();
        col.upsert(9, "stale".into());
        let mut rx = col.subscribe();
        rx.borrow_and_update();

        col.replace_all([(2, "b".to_owned()), (1, "a".to_owned())]);

        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(
            snap.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(!rx.has_changed().unwrap());
        assert!(!col.contains(9));
    }

    #[test]
    fn update_each_publishes_changed_keys() {
        let col: EntityCollection<u64, u32> = EntityCollection::new();
        assert!(col.update_each(|_, v| Some(v + 1)).is_empty());

        col.upsert(1, 10);
        col.upsert(2, 20);
        let changed = col.update_each(|key, v| (key == 2).then_some(v + 1));

        assert_eq!(changed, vec![2]);
        assert_eq!(*col.get(1).unwrap(), 10);
        assert_eq!(*col.get(2).unwrap(), 21);
    }

    #[test]
    fn keys_and_clear() {
        let col: EntityCollection<u64, u32> = EntityCollection::new();
        col.upsert(2, 2);
        col.upsert(1, 1);

        assert_eq!(col.keys(), vec![1, 2]);

        col.clear();
        assert_eq!(col.len(), 0);
        assert!(col.snapshot().is_empty());
    }
}
