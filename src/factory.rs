use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::{CacheHandle, KeyedCache};
use crate::data::Data;
use crate::input::{Dependency, Shared};
use crate::key::KeySelector;
use crate::memoize::Combiner;
use crate::selector::Selector;

/// The values a factory-made selector depends on: the collection and the key.
type Inputs<C> = (C, String);

/// The item accessor of a factory.
type Accessor<C, T> = dyn Fn(&C, &str) -> T + Send + Sync;

/// Produces keyed selectors that pick one item out of a collection and share
/// a single cache.
///
/// Every selector made by [`create`](Self::create) depends on the factory's
/// collection and on the given key selector. Because they share one cache,
/// two selectors reading the key from differently shaped props reuse each
/// other's results whenever their keys agree.
///
/// ```
/// # use std::collections::HashMap;
/// # use std::sync::Arc;
/// # use keyed_select::KeyedSelectorFactory;
/// type Users = Arc<HashMap<String, Arc<str>>>;
/// struct Props { from: String, to: String }
///
/// let users = KeyedSelectorFactory::new(
///     |users: &Users, _: &Props| users.clone(),
///     |users: &Users, key: &str| users.get(key).cloned(),
/// );
/// let from = users.create(|_: &Users, p: &Props| p.from.clone());
/// let to = users.create(|_: &Users, p: &Props| p.to.clone());
///
/// let state: Users = Arc::new(HashMap::from([("1".to_string(), Arc::from("ann"))]));
/// let props = Props { from: "1".into(), to: "1".into() };
/// assert_eq!(from.select(&state, &props).as_deref(), Some("ann"));
/// assert_eq!(to.select(&state, &props).as_deref(), Some("ann"));
/// assert_eq!(to.recomputations(), 0);
/// ```
pub struct KeyedSelectorFactory<S, P, C, T>
where
    C: Dependency<S, P>,
{
    collection: Arc<C>,
    accessor: Arc<Accessor<C::Output, T>>,
    cache: Arc<KeyedCache<Inputs<C::Output>, T>>,
    marker: PhantomData<fn(&S, &P)>,
}

impl<S, P, C, T> KeyedSelectorFactory<S, P, C, T>
where
    S: 'static,
    P: 'static,
    C: Dependency<S, P>,
    C::Output: Data,
    T: Clone + Send + Sync + 'static,
{
    /// Create a factory over a collection and an accessor that picks the item
    /// for a key out of it.
    pub fn new<A>(collection: C, accessor: A) -> Self
    where
        A: Fn(&C::Output, &str) -> T + Send + Sync + 'static,
    {
        Self {
            collection: Arc::new(collection),
            accessor: Arc::new(accessor),
            cache: Arc::new(KeyedCache::new()),
            marker: PhantomData,
        }
    }

    /// Create a keyed selector for the item that `lookup` names.
    pub fn create(&self, lookup: impl Into<KeySelector<S, P>>) -> Selector<S, P, T> {
        let accessor = Arc::clone(&self.accessor);
        let combiner: Combiner<Inputs<C::Output>, T> =
            Box::new(move |(collection, key): &Inputs<C::Output>| {
                Ok(accessor(collection, key.as_str()))
            });
        Selector::build(
            (Shared(Arc::clone(&self.collection)), lookup.into()),
            Box::new(<Inputs<C::Output> as Data>::same),
            combiner,
            Some(Arc::clone(&self.cache)),
        )
    }

    /// A view on the cache shared by all selectors of this factory.
    pub fn cache(&self) -> CacheHandle {
        CacheHandle::new(self.cache.clone())
    }
}

impl<S, P, C, T> Debug for KeyedSelectorFactory<S, P, C, T>
where
    C: Dependency<S, P>,
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("KeyedSelectorFactory")
            .field("cache", &CacheHandle::new(self.cache.clone()))
            .finish_non_exhaustive()
    }
}
