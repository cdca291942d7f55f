use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::cache::{KeyedCache, Slot};
use crate::input::Dependencies;
use crate::key::KeyNode;

/// A combiner as stored by the engine.
///
/// `Err` carries an output that is handed to the caller without being
/// remembered, which is how fallible combiners keep failures out of the
/// cache.
pub(crate) type Combiner<V, T> = Box<dyn Fn(&V) -> Result<T, T> + Send + Sync>;

/// Decides whether two dependency value lists are the same.
pub(crate) type Equality<V> = Box<dyn Fn(&V, &V) -> bool + Send + Sync>;

/// The type-erased computation behind a selector.
pub(crate) trait Compute<S, P, T>: Send + Sync {
    /// Return the remembered output or recompute it.
    fn compute(&self, state: &S, props: &P) -> T;

    /// How often the combiner produced a remembered output.
    fn recomputations(&self) -> usize;

    /// Reset the recomputation counter to zero.
    fn reset_recomputations(&self);
}

/// Where a selector remembers its results.
pub(crate) enum Memo<S, P, V, T> {
    /// A single slot holding the last computation.
    Plain(Mutex<Option<Arc<Slot<V, T>>>>),
    /// One slot per composite key.
    Keyed {
        node: Arc<KeyNode<S, P>>,
        cache: Arc<KeyedCache<V, T>>,
    },
}

/// Dependencies and a combiner, memoized.
pub(crate) struct Memoized<S, P, D, T>
where
    D: Dependencies<S, P>,
{
    pub deps: D,
    pub combiner: Combiner<D::Values, T>,
    pub equality: Equality<D::Values>,
    pub memo: Memo<S, P, D::Values, T>,
    pub recomputations: AtomicUsize,
}

impl<S, P, D, T> Memoized<S, P, D, T>
where
    D: Dependencies<S, P>,
    T: Clone + Send + Sync,
{
    /// Run the combiner on fresh inputs and let `store` remember the result.
    ///
    /// Nothing is remembered and the counter stays put if the combiner fails
    /// or unwinds.
    fn recompute(&self, inputs: D::Values, store: impl FnOnce(D::Values, T)) -> T {
        let output = match (self.combiner)(&inputs) {
            Ok(output) => output,
            Err(output) => {
                #[cfg(feature = "testing")]
                crate::testing::register_miss();
                return output;
            }
        };

        store(inputs, output.clone());
        self.recomputations.fetch_add(1, Ordering::SeqCst);

        #[cfg(feature = "testing")]
        crate::testing::register_miss();

        output
    }

    fn hit(&self, output: T) -> T {
        #[cfg(feature = "testing")]
        crate::testing::register_hit();

        output
    }
}

impl<S, P, D, T> Compute<S, P, T> for Memoized<S, P, D, T>
where
    D: Dependencies<S, P>,
    T: Clone + Send + Sync,
{
    fn compute(&self, state: &S, props: &P) -> T {
        match &self.memo {
            Memo::Plain(slot) => {
                let inputs = self.deps.resolve(state, props);

                // The comparator and the combiner may reenter this selector,
                // so neither runs under the lock.
                let last = slot.lock().clone();
                let cached = last.and_then(|last| last.lookup(&inputs, &self.equality));
                if let Some(output) = cached {
                    tracing::trace!("selector hit");
                    return self.hit(output);
                }

                tracing::trace!("selector miss");
                self.recompute(inputs, |inputs, output| {
                    *slot.lock() = Some(Arc::new(Slot { inputs, output }));
                })
            }
            Memo::Keyed { node, cache } => {
                let key = node.key(state, props);
                let inputs = self.deps.resolve(state, props);

                if let Some(output) = cache.lookup(&key, &inputs, &self.equality) {
                    tracing::trace!(key, "keyed selector hit");
                    return self.hit(output);
                }

                tracing::trace!(key, "keyed selector miss");
                self.recompute(inputs, |inputs, output| cache.insert(key, inputs, output))
            }
        }
    }

    fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::SeqCst)
    }

    fn reset_recomputations(&self) {
        self.recomputations.store(0, Ordering::SeqCst);
    }
}
