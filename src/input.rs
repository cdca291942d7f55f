use std::sync::Arc;

use crate::key::{KeyNode, KeySelector};
use crate::selector::Selector;

/// A function of the state and the call-time props that a selector depends
/// on.
///
/// This is implemented for closures of the form `Fn(&S, &P) -> T`, for
/// [`Selector`]s and for [`KeySelector`]s.
pub trait Dependency<S, P>: Send + Sync + 'static {
    /// The value handed to the depending selector's combiner.
    type Output: Send + Sync + 'static;

    /// Evaluate the dependency.
    fn resolve(&self, state: &S, props: &P) -> Self::Output;

    /// The key-bearing node behind the dependency, if it carries a key.
    #[doc(hidden)]
    fn key_node(&self) -> Option<Arc<KeyNode<S, P>>> {
        None
    }
}

impl<S, P, T, F> Dependency<S, P> for F
where
    F: Fn(&S, &P) -> T + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    #[inline]
    fn resolve(&self, state: &S, props: &P) -> T {
        self(state, props)
    }
}

impl<S, P, T> Dependency<S, P> for Selector<S, P, T>
where
    S: 'static,
    P: 'static,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    #[inline]
    fn resolve(&self, state: &S, props: &P) -> T {
        self.select(state, props)
    }

    fn key_node(&self) -> Option<Arc<KeyNode<S, P>>> {
        self.node().cloned()
    }
}

impl<S, P> Dependency<S, P> for KeySelector<S, P>
where
    S: 'static,
    P: 'static,
{
    type Output = String;

    #[inline]
    fn resolve(&self, state: &S, props: &P) -> String {
        self.key(state, props)
    }

    fn key_node(&self) -> Option<Arc<KeyNode<S, P>>> {
        Some(Arc::clone(self.node()))
    }
}

/// A dependency shared by every selector a factory produces.
pub(crate) struct Shared<D>(pub Arc<D>);

impl<S, P, D> Dependency<S, P> for Shared<D>
where
    D: Dependency<S, P>,
{
    type Output = D::Output;

    #[inline]
    fn resolve(&self, state: &S, props: &P) -> D::Output {
        self.0.resolve(state, props)
    }

    fn key_node(&self) -> Option<Arc<KeyNode<S, P>>> {
        self.0.key_node()
    }
}

/// The ordered dependency list of a selector.
///
/// This is implemented for tuples of up to twelve [`Dependency`]s, whose
/// values reach the combiner as a tuple, and for a `Vec` of dependencies of
/// one type, whose values reach the combiner as a `Vec`.
pub trait Dependencies<S, P>: Send + Sync + 'static {
    /// The dependency values, in declaration order.
    type Values: Send + Sync + 'static;

    /// Evaluate all dependencies in declaration order.
    fn resolve(&self, state: &S, props: &P) -> Self::Values;

    /// The key-bearing dependencies, in declaration order.
    #[doc(hidden)]
    fn key_nodes(&self) -> Vec<Arc<KeyNode<S, P>>>;
}

impl<S, P, D> Dependencies<S, P> for Vec<D>
where
    D: Dependency<S, P>,
{
    type Values = Vec<D::Output>;

    fn resolve(&self, state: &S, props: &P) -> Self::Values {
        self.iter().map(|dep| dep.resolve(state, props)).collect()
    }

    fn key_nodes(&self) -> Vec<Arc<KeyNode<S, P>>> {
        self.iter().filter_map(|dep| dep.key_node()).collect()
    }
}

macro_rules! dependencies {
    ($($param:ident $idx:tt),+) => {
        impl<S, P, $($param: Dependency<S, P>),+> Dependencies<S, P> for ($($param,)+) {
            type Values = ($(<$param as Dependency<S, P>>::Output,)+);

            #[inline]
            fn resolve(&self, state: &S, props: &P) -> Self::Values {
                ($(self.$idx.resolve(state, props),)+)
            }

            fn key_nodes(&self) -> Vec<Arc<KeyNode<S, P>>> {
                [$(self.$idx.key_node()),+].into_iter().flatten().collect()
            }
        }
    };
}

dependencies! { A 0 }
dependencies! { A 0, B 1 }
dependencies! { A 0, B 1, C 2 }
dependencies! { A 0, B 1, C 2, D 3 }
dependencies! { A 0, B 1, C 2, D 3, E 4 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10 }
dependencies! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_resolves_in_order() {
        let deps = (
            |state: &u32, _: &()| *state,
            |state: &u32, _: &()| state * 2,
            |_: &u32, _: &()| "three",
        );
        assert_eq!(Dependencies::resolve(&deps, &1u32, &()), (1, 2, "three"));
        assert!(deps.key_nodes().is_empty());
    }

    #[test]
    fn test_key_selectors_bear_keys() {
        let key = KeySelector::new(|state: &u32, _: &()| state.to_string());
        let deps = (|state: &u32, _: &()| *state, key.clone(), key);
        assert_eq!(
            Dependencies::resolve(&deps, &5u32, &()),
            (5, "5".to_string(), "5".to_string())
        );
        assert_eq!(deps.key_nodes().len(), 2);
    }
}
