use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use parking_lot::Mutex;

use crate::cache::{CacheHandle, KeyedCache};
use crate::data::Data;
use crate::input::Dependencies;
use crate::key::KeyNode;
use crate::memoize::{Combiner, Compute, Equality, Memo, Memoized};
use crate::usage::Usage;

/// A memoized derivation of a value from the state and call-time props.
///
/// A selector evaluates its dependencies on every call and compares their
/// values with the ones its remembered output was computed from. Only when
/// one of them changed does it run the combiner again; otherwise it returns
/// the remembered output.
///
/// If none of the dependencies carries a key, the selector is _plain_ and
/// remembers only its last computation. If at least one is a
/// [`KeySelector`](crate::KeySelector) or a keyed selector, the selector is
/// _keyed_: it remembers one computation per composite key, and
/// [`usage`](Self::usage) handles decide when a key's entry is dropped.
///
/// Selectors are cheap to clone; clones share their cache.
///
/// ```
/// # use std::sync::Arc;
/// # use keyed_select::Selector;
/// struct State { a: u32, b: u32 }
///
/// let sum = Selector::new(
///     (|s: &State, _: &()| s.a, |s: &State, _: &()| s.b),
///     |(a, b): &(u32, u32)| Arc::new(a + b),
/// );
///
/// let state = State { a: 3, b: 4 };
/// let first = sum.select(&state, &());
/// let second = sum.select(&state, &());
/// assert_eq!(*first, 7);
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(sum.recomputations(), 1);
/// ```
pub struct Selector<S, P, T> {
    compute: Arc<dyn Compute<S, P, T>>,
    node: Option<Arc<KeyNode<S, P>>>,
}

impl<S, P, T> Selector<S, P, T>
where
    S: 'static,
    P: 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create a selector from dependencies and a combiner.
    ///
    /// The dependencies are a tuple or a `Vec`; the combiner receives their
    /// values in the same shape. Values are compared with [`Data::same`].
    pub fn new<D, F>(deps: D, combiner: F) -> Self
    where
        D: Dependencies<S, P>,
        D::Values: Data,
        F: Fn(&D::Values) -> T + Send + Sync + 'static,
    {
        Self::with_equality(deps, <D::Values as Data>::same, combiner)
    }

    /// Create a selector that compares dependency values with `equality`
    /// instead of [`Data::same`].
    pub fn with_equality<D, E, F>(deps: D, equality: E, combiner: F) -> Self
    where
        D: Dependencies<S, P>,
        E: Fn(&D::Values, &D::Values) -> bool + Send + Sync + 'static,
        F: Fn(&D::Values) -> T + Send + Sync + 'static,
    {
        let combiner: Combiner<D::Values, T> =
            Box::new(move |values: &D::Values| Ok(combiner(values)));
        Self::build(deps, Box::new(equality), combiner, None)
    }

    /// Assemble a selector, deciding between plain and keyed memoization.
    ///
    /// Keyed selectors use `shared` as their cache if given.
    pub(crate) fn build<D>(
        deps: D,
        equality: Equality<D::Values>,
        combiner: Combiner<D::Values, T>,
        shared: Option<Arc<KeyedCache<D::Values, T>>>,
    ) -> Self
    where
        D: Dependencies<S, P>,
    {
        let parts = deps.key_nodes();
        let (memo, node) = if parts.is_empty() {
            (Memo::Plain(Mutex::new(None)), None)
        } else {
            let cache = shared.unwrap_or_else(|| Arc::new(KeyedCache::new()));
            let node = Arc::new(KeyNode::Composite { parts, store: cache.clone() });
            (Memo::Keyed { node: node.clone(), cache }, Some(node))
        };

        let memoized = Memoized {
            deps,
            combiner,
            equality,
            memo,
            recomputations: AtomicUsize::new(0),
        };

        Self { compute: Arc::new(memoized), node }
    }

    /// Compute the selector's value, reusing the remembered output if the
    /// dependency values did not change.
    pub fn select(&self, state: &S, props: &P) -> T {
        self.compute.compute(state, props)
    }
}

impl<S, P, T, E> Selector<S, P, Result<T, E>>
where
    S: 'static,
    P: 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a selector with a fallible combiner.
    ///
    /// Successful outputs are memoized like those of [`new`](Self::new).
    /// Errors are returned to the caller but never remembered, so the next
    /// call retries, and they do not count as recomputations.
    pub fn try_new<D, F>(deps: D, combiner: F) -> Self
    where
        D: Dependencies<S, P>,
        D::Values: Data,
        F: Fn(&D::Values) -> Result<T, E> + Send + Sync + 'static,
    {
        let combiner: Combiner<D::Values, Result<T, E>> =
            Box::new(move |values: &D::Values| match combiner(values) {
                Ok(output) => Ok(Ok(output)),
                Err(err) => Err(Err(err)),
            });
        Self::build(deps, Box::new(<D::Values as Data>::same), combiner, None)
    }
}

impl<S, P, T> Selector<S, P, T> {
    /// How often the combiner ran since creation or the last reset.
    pub fn recomputations(&self) -> usize {
        self.compute.recomputations()
    }

    /// Reset the recomputation counter.
    pub fn reset_recomputations(&self) {
        self.compute.reset_recomputations();
    }

    /// Whether the selector remembers one result per key.
    pub fn is_keyed(&self) -> bool {
        self.node.is_some()
    }

    /// The composite key a call with `state` and `props` resolves to, if the
    /// selector is keyed.
    pub fn key(&self, state: &S, props: &P) -> Option<String> {
        self.node.as_ref().map(|node| node.key(state, props))
    }

    /// A view on the selector's per-key cache, if the selector is keyed.
    pub fn cache(&self) -> Option<CacheHandle> {
        self.node
            .as_ref()
            .and_then(|node| node.store())
            .map(|store| CacheHandle::new(store.clone()))
    }

    /// A fresh usage handle, if the selector is keyed.
    ///
    /// The handle holds no key until its first
    /// [`update`](crate::Usage::update).
    pub fn usage(&self) -> Option<Usage<S, P>> {
        self.node.clone().map(Usage::new)
    }

    pub(crate) fn node(&self) -> Option<&Arc<KeyNode<S, P>>> {
        self.node.as_ref()
    }
}

impl<S, P, T> Clone for Selector<S, P, T> {
    fn clone(&self) -> Self {
        Self {
            compute: Arc::clone(&self.compute),
            node: self.node.clone(),
        }
    }
}

impl<S, P, T> Debug for Selector<S, P, T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Selector")
            .field("keyed", &self.is_keyed())
            .field("recomputations", &self.recomputations())
            .finish_non_exhaustive()
    }
}

/// Create a selector from positional dependencies and a combiner.
///
/// `selector!(a, b => f)` is the same as `Selector::new((a, b), f)`.
///
/// ```
/// # use keyed_select::selector;
/// let double = selector!(|n: &u32, _: &()| *n => |(n,): &(u32,)| n * 2);
/// assert_eq!(double.select(&21, &()), 42);
/// ```
#[macro_export]
macro_rules! selector {
    ($($dep:expr),+ => $combiner:expr) => {
        $crate::Selector::new(($($dep,)+), $combiner)
    };
}
