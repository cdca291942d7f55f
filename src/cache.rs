use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// A remembered input/output pair.
pub(crate) struct Slot<V, T> {
    /// The dependency values the output was computed from.
    pub inputs: V,
    /// The combiner's output for `inputs`.
    pub output: T,
}

impl<V, T: Clone> Slot<V, T> {
    /// Return the output if the slot was computed from equal inputs.
    pub fn lookup(&self, inputs: &V, equal: impl Fn(&V, &V) -> bool) -> Option<T> {
        equal(&self.inputs, inputs).then(|| self.output.clone())
    }
}

/// A per-key cache, possibly shared by several selectors.
pub(crate) struct KeyedCache<V, T> {
    /// Maps from composite keys to remembered results and reference counts.
    entries: Mutex<FxHashMap<String, Entry<V, T>>>,
}

/// One key's share of a keyed cache.
struct Entry<V, T> {
    /// Absent until the first computation for this key.
    slot: Option<Arc<Slot<V, T>>>,
    /// How many live usages currently hold this key.
    refs: usize,
}

impl<V, T> Entry<V, T> {
    fn vacant() -> Self {
        Self { slot: None, refs: 0 }
    }
}

impl<V, T> KeyedCache<V, T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { entries: Mutex::new(FxHashMap::default()) }
    }

    /// Look for a result computed from equal inputs under `key`.
    pub fn lookup(
        &self,
        key: &str,
        inputs: &V,
        equal: impl Fn(&V, &V) -> bool,
    ) -> Option<T>
    where
        T: Clone,
    {
        // The comparator may reenter the cache, so it runs unlocked.
        let slot = self.entries.lock().get(key)?.slot.clone()?;
        slot.lookup(inputs, equal)
    }

    /// Remember a result under `key`, keeping the key's reference count.
    pub fn insert(&self, key: String, inputs: V, output: T) {
        self.entries
            .lock()
            .entry(key)
            .or_insert_with(Entry::vacant)
            .slot = Some(Arc::new(Slot { inputs, output }));
    }
}

/// Reference counting and inspection of a keyed cache, independent of the
/// value types stored in it.
pub trait Store: Send + Sync {
    /// Add one reference to `key`, creating its entry if needed.
    fn retain(&self, key: &str);

    /// Drop one reference from `key`, evicting the entry at zero.
    fn release(&self, key: &str);

    /// The number of entries.
    fn len(&self) -> usize;

    /// Whether there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry exists for `key`.
    fn contains_key(&self, key: &str) -> bool;

    /// The number of references held on `key`.
    fn ref_count(&self, key: &str) -> usize;

    /// All keys with an entry, in no particular order.
    fn keys(&self) -> Vec<String>;
}

impl<V: Send + Sync, T: Send + Sync> Store for KeyedCache<V, T> {
    fn retain(&self, key: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.refs += 1;
        } else {
            entries.insert(key.to_owned(), Entry { slot: None, refs: 1 });
        }
    }

    fn release(&self, key: &str) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key).filter(|entry| entry.refs > 0) else {
            debug_assert!(false, "keyed-select: released key {key:?} without references");
            return;
        };

        entry.refs -= 1;
        if entry.refs == 0 {
            entries.remove(key);
            tracing::debug!(key, "evicted keyed cache entry");
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    fn ref_count(&self, key: &str) -> usize {
        self.entries.lock().get(key).map_or(0, |entry| entry.refs)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

/// A view on the cache of a keyed selector.
///
/// Selectors produced by one [`KeyedSelectorFactory`](crate::KeyedSelectorFactory)
/// hand out views on the same cache; [`same`](Self::same) tells whether two
/// views share their storage.
#[derive(Clone)]
pub struct CacheHandle(Arc<dyn Store>);

impl CacheHandle {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self(store)
    }

    /// The number of keys with an entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the cache holds an entry for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// How many usages currently hold `key`.
    pub fn ref_count(&self, key: &str) -> usize {
        self.0.ref_count(key)
    }

    /// All keys with an entry, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.0.keys();
        keys.sort_unstable();
        keys
    }

    /// Whether both handles view the same cache.
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Debug for CacheHandle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("CacheHandle").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same(a: &u32, b: &u32) -> bool {
        a == b
    }

    #[test]
    fn test_lookup_requires_equal_inputs() {
        let cache = KeyedCache::new();
        cache.insert("a".into(), 1u32, "one");
        assert_eq!(cache.lookup("a", &1, same), Some("one"));
        assert_eq!(cache.lookup("a", &2, same), None);
        assert_eq!(cache.lookup("b", &1, same), None);
    }

    #[test]
    fn test_comparator_runs_unlocked() {
        let cache = KeyedCache::new();
        cache.insert("a".into(), 1u32, "one");
        let nested = |a: &u32, b: &u32| cache.contains_key("a") && a == b;
        assert_eq!(cache.lookup("a", &1, nested), Some("one"));
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_release_evicts_at_zero() {
        let cache = KeyedCache::new();
        cache.insert("a".into(), 1u32, "one");
        cache.retain("a");
        cache.retain("a");
        assert_eq!(cache.ref_count("a"), 2);
        cache.release("a");
        assert_eq!(Store::len(&cache), 1);
        cache.release("a");
        assert_eq!(Store::len(&cache), 0);
        assert_eq!(cache.lookup("a", &1, same), None);
    }

    #[test]
    fn test_retain_before_insert() {
        let cache = KeyedCache::<u32, &str>::new();
        cache.retain("a");
        assert!(cache.contains_key("a"));
        assert_eq!(cache.lookup("a", &1, same), None);
        cache.insert("a".into(), 1, "one");
        assert_eq!(cache.ref_count("a"), 1);
        assert_eq!(cache.lookup("a", &1, same), Some("one"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without references")]
    fn test_release_unreferenced_panics() {
        let cache = KeyedCache::new();
        cache.insert("a".into(), 1u32, "one");
        cache.release("a");
    }

    #[test]
    fn test_handles_compare_by_storage() {
        let store: Arc<dyn Store> = Arc::new(KeyedCache::<u32, u32>::new());
        let a = CacheHandle::new(store.clone());
        let b = CacheHandle::new(store);
        let c = CacheHandle::new(Arc::new(KeyedCache::<u32, u32>::new()));
        assert!(a.same(&b));
        assert!(!a.same(&c));
    }
}
