use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::key::KeyNode;

/// Declares that a consumer currently depends on one key of a keyed
/// selector.
///
/// A usage starts out holding no key. [`update`](Self::update) resolves the
/// selector's key for the consumer's current state and props and moves the
/// consumer's reference there. Keyed dependencies are updated alongside, each
/// at the key it resolves to. [`stop`](Self::stop) withdraws all references.
/// An entry whose last reference is withdrawn is evicted from its cache.
///
/// Dropping a usage stops it.
pub struct Usage<S, P> {
    root: Subscription<S, P>,
}

impl<S, P> Usage<S, P> {
    pub(crate) fn new(node: Arc<KeyNode<S, P>>) -> Self {
        Self { root: Subscription::new(node) }
    }

    /// Hold the key that `state` and `props` resolve to, releasing the
    /// previously held key if it differs.
    pub fn update(&mut self, state: &S, props: &P) {
        // A panicking lookup must leave the tree as it was.
        let mut keys = Vec::new();
        self.root.resolve(state, props, &mut keys);
        self.root.assign(&mut keys.into_iter());
        self.root.settle();
    }

    /// Release the held key. Does nothing if no key is held.
    pub fn stop(&mut self) {
        self.root.settle();
    }

    /// The currently held key.
    pub fn key(&self) -> Option<&str> {
        self.root.current.as_deref()
    }
}

impl<S, P> Drop for Usage<S, P> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S, P> Debug for Usage<S, P> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Usage").field("key", &self.key()).finish()
    }
}

/// One keyed selector's share of a usage, mirroring the graph of keyed
/// dependencies below it.
struct Subscription<S, P> {
    node: Arc<KeyNode<S, P>>,
    /// The key this subscription holds a reference on.
    current: Option<String>,
    /// The key to hold after the next settle.
    pending: Option<String>,
    upstream: Vec<Subscription<S, P>>,
}

impl<S, P> Subscription<S, P> {
    fn new(node: Arc<KeyNode<S, P>>) -> Self {
        // Bare lookups have no cache and need no subscription.
        let upstream = node
            .parts()
            .iter()
            .filter(|part| part.store().is_some())
            .cloned()
            .map(Subscription::new)
            .collect();
        Self { node, current: None, pending: None, upstream }
    }

    /// Compute the keys to hold throughout the tree, in pre-order.
    fn resolve(&self, state: &S, props: &P, keys: &mut Vec<String>) {
        keys.push(self.node.key(state, props));
        for sub in &self.upstream {
            sub.resolve(state, props, keys);
        }
    }

    /// Mark resolved keys as pending, in the order `resolve` produced them.
    fn assign<I>(&mut self, keys: &mut I)
    where
        I: Iterator<Item = String>,
    {
        self.pending = keys.next();
        for sub in &mut self.upstream {
            sub.assign(keys);
        }
    }

    /// Move every reference in the tree to its pending key.
    ///
    /// All stale keys in the tree are released, evicting entries that reach
    /// zero, before any pending key is retained.
    fn settle(&mut self) {
        self.release_stale();
        self.retain_pending();
    }

    fn release_stale(&self) {
        if self.current != self.pending {
            if let (Some(key), Some(store)) = (&self.current, self.node.store()) {
                store.release(key);
            }
        }
        for sub in &self.upstream {
            sub.release_stale();
        }
    }

    fn retain_pending(&mut self) {
        let pending = self.pending.take();
        if self.current != pending {
            if let (Some(key), Some(store)) = (&pending, self.node.store()) {
                store.retain(key);
            }
            self.current = pending;
        }
        for sub in &mut self.upstream {
            sub.retain_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::{KeySelector, Selector};

    fn keyed() -> Selector<(), u32, String> {
        let id = KeySelector::new(|_: &(), props: &u32| props.to_string());
        Selector::new((id,), |(key,): &(String,)| key.clone())
    }

    #[test]
    fn test_fresh_usage_holds_nothing() {
        let selector = keyed();
        let mut usage = selector.usage().unwrap();
        assert_eq!(usage.key(), None);
        usage.stop();
        assert_eq!(selector.cache().unwrap().len(), 0);
    }

    #[test]
    fn test_update_retains_before_first_select() {
        let selector = keyed();
        let cache = selector.cache().unwrap();
        let mut usage = selector.usage().unwrap();

        usage.update(&(), &4);
        assert_eq!(usage.key(), Some("4"));
        assert_eq!(cache.ref_count("4"), 1);

        assert_eq!(selector.select(&(), &4), "4");
        assert_eq!(cache.keys(), ["4"]);

        usage.update(&(), &5);
        assert_eq!(cache.keys(), ["5"]);
        assert_eq!(format!("{usage:?}"), r#"Usage { key: Some("5") }"#);
    }

    #[test]
    fn test_bare_key_selectors_get_no_subscription() {
        let selector = keyed();
        let usage = selector.usage().unwrap();
        assert!(usage.root.upstream.is_empty());
    }

    #[test]
    fn test_panicking_lookup_leaves_usage_intact() {
        // The lookup for 99 fails on its second evaluation, which happens
        // while resolving the upstream subscription.
        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = lookups.clone();
        let id = KeySelector::new(move |_: &(), props: &u32| {
            if *props == 99 && counter.fetch_add(1, Ordering::SeqCst) > 0 {
                panic!("lookup failed");
            }
            props.to_string()
        });
        let inner = Selector::new((id,), |(key,): &(String,)| key.clone());
        let outer = Selector::new((inner.clone(),), |(key,): &(String,)| key.clone());

        let mut usage = outer.usage().unwrap();
        usage.update(&(), &1);
        let result = catch_unwind(AssertUnwindSafe(|| usage.update(&(), &99)));
        assert!(result.is_err());
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(usage.key(), Some("1"));

        usage.stop();
        assert!(outer.cache().unwrap().is_empty());
        assert!(inner.cache().unwrap().is_empty());
    }
}
