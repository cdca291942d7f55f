use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::cache::Store;

/// Separates the parts of a composite key.
const SEPARATOR: char = ':';

/// Escapes separators and itself inside the parts of a composite key.
const ESCAPE: char = '\\';

/// The lookup function of a key selector.
type Lookup<S, P> = dyn Fn(&S, &P) -> String + Send + Sync;

/// Derives a cache key from the state and the call-time props.
///
/// A key selector has no cache of its own. Used as a dependency, it yields
/// its key as a `String` and makes the depending selector keyed: that
/// selector then remembers one result per key instead of only the last one.
///
/// ```
/// # use keyed_select::KeySelector;
/// struct Props { id: u32 }
///
/// let by_id = KeySelector::new(|_: &(), props: &Props| props.id.to_string());
/// assert_eq!(by_id.key(&(), &Props { id: 7 }), "7");
/// ```
pub struct KeySelector<S, P> {
    node: Arc<KeyNode<S, P>>,
}

impl<S, P> KeySelector<S, P> {
    /// Wrap a lookup function.
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn(&S, &P) -> String + Send + Sync + 'static,
    {
        Self { node: Arc::new(KeyNode::Lookup(Box::new(lookup))) }
    }

    /// Compute the key for a state and props.
    pub fn key(&self, state: &S, props: &P) -> String {
        self.node.key(state, props)
    }

    pub(crate) fn node(&self) -> &Arc<KeyNode<S, P>> {
        &self.node
    }
}

impl<S, P, F> From<F> for KeySelector<S, P>
where
    F: Fn(&S, &P) -> String + Send + Sync + 'static,
{
    fn from(lookup: F) -> Self {
        Self::new(lookup)
    }
}

impl<S, P> Clone for KeySelector<S, P> {
    fn clone(&self) -> Self {
        Self { node: Arc::clone(&self.node) }
    }
}

impl<S, P> Debug for KeySelector<S, P> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad("KeySelector(..)")
    }
}

/// A key-bearing node of a composition graph.
pub enum KeyNode<S, P> {
    /// A bare lookup. Carries no cache.
    Lookup(Box<Lookup<S, P>>),
    /// A keyed selector: its key joins the keys of its key-bearing
    /// dependencies, and its cache counts references per key.
    Composite {
        parts: Vec<Arc<KeyNode<S, P>>>,
        store: Arc<dyn Store>,
    },
}

impl<S, P> KeyNode<S, P> {
    /// Resolve the node's key.
    pub fn key(&self, state: &S, props: &P) -> String {
        match self {
            Self::Lookup(lookup) => lookup(state, props),
            Self::Composite { parts, .. } => {
                compose(parts.iter().map(|part| part.key(state, props)))
            }
        }
    }

    /// The reference-counted cache behind the node, if any.
    pub(crate) fn store(&self) -> Option<&Arc<dyn Store>> {
        match self {
            Self::Lookup(_) => None,
            Self::Composite { store, .. } => Some(store),
        }
    }

    /// The key-bearing dependencies the node's key is composed of.
    pub(crate) fn parts(&self) -> &[Arc<KeyNode<S, P>>] {
        match self {
            Self::Lookup(_) => &[],
            Self::Composite { parts, .. } => parts,
        }
    }
}

/// Join resolved keys into one composite key.
///
/// A single part is its own composite key. Several parts are escaped and
/// joined, so distinct part lists of the same length never collide.
pub(crate) fn compose<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
    I::IntoIter: ExactSizeIterator,
{
    let mut parts = parts.into_iter();
    if parts.len() == 1 {
        return parts.next().unwrap_or_default();
    }

    let mut key = String::new();
    for (i, part) in parts.enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        for c in part.chars() {
            if c == SEPARATOR || c == ESCAPE {
                key.push(ESCAPE);
            }
            key.push(c);
        }
    }
    key
}
