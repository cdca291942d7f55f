//! Memoized selectors with per-key caches.
//!
//! A [`Selector`] derives a value from a state tree and call-time props by
//! feeding the values of its dependencies into a combiner. It reruns the
//! combiner only when a dependency value changed, compared shallowly by
//! [`Data::same`].
//!
//! Some derived values only make sense per key, like "the user with id X".
//! Depending on a [`KeySelector`] makes a selector keyed: it remembers one
//! result per key, and keyedness carries over to every selector built on top
//! of it. A [`KeyedSelectorFactory`] hands out keyed selectors that share one
//! cache, and [`Usage`] handles tell the caches which keys are still needed.
//!
//! ```
//! # use std::collections::HashMap;
//! # use std::sync::Arc;
//! # use keyed_select::{KeySelector, Selector};
//! type Users = Arc<HashMap<u32, Arc<str>>>;
//!
//! let id = KeySelector::new(|_: &Users, id: &u32| id.to_string());
//! let user = Selector::new(
//!     (id, |users: &Users, _: &u32| users.clone()),
//!     |(key, users): &(String, Users)| users.get(&key.parse::<u32>().unwrap()).cloned(),
//! );
//!
//! let users: Users =
//!     Arc::new(HashMap::from([(1, Arc::from("ann")), (2, Arc::from("bob"))]));
//! let mut usage = user.usage().unwrap();
//!
//! assert_eq!(user.select(&users, &1).as_deref(), Some("ann"));
//! usage.update(&users, &1);
//! assert_eq!(user.select(&users, &2).as_deref(), Some("bob"));
//! assert_eq!(user.cache().unwrap().len(), 2);
//!
//! usage.stop();
//! assert_eq!(user.cache().unwrap().keys(), ["2"]);
//! ```

mod cache;
mod data;
mod factory;
mod input;
mod key;
mod memoize;
mod selector;
mod structured;
mod usage;

#[cfg(feature = "testing")]
pub mod testing;

pub use crate::cache::CacheHandle;
pub use crate::data::Data;
pub use crate::factory::KeyedSelectorFactory;
pub use crate::input::{Dependencies, Dependency};
pub use crate::key::KeySelector;
pub use crate::selector::Selector;
pub use crate::structured::{structured, Record};
pub use crate::usage::Usage;

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    pub use crate::cache::Store;
    pub use crate::key::KeyNode;
}
