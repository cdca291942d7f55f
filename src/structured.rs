use std::sync::Arc;

use crate::data::Data;
use crate::input::Dependency;
use crate::selector::Selector;

/// Named outputs of several selectors, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    fields: Vec<(&'static str, T)>,
}

impl<T> Record<T> {
    /// The value of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Iterate over the fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Combine named dependencies into one selector producing a [`Record`].
///
/// The record is rebuilt only when one of the fields changed; otherwise the
/// previous `Arc` is returned. If any field is keyed, so is the result.
///
/// ```
/// # use keyed_select::{structured, Selector};
/// struct State { width: u32, height: u32 }
///
/// let size = structured([
///     ("width", Selector::new((|s: &State, _: &()| s.width,), |(w,): &(u32,)| *w)),
///     ("height", Selector::new((|s: &State, _: &()| s.height,), |(h,): &(u32,)| *h)),
/// ]);
///
/// let record = size.select(&State { width: 3, height: 4 }, &());
/// assert_eq!(record.get("height"), Some(&4));
/// ```
pub fn structured<S, P, D, I>(fields: I) -> Selector<S, P, Arc<Record<D::Output>>>
where
    S: 'static,
    P: 'static,
    D: Dependency<S, P>,
    D::Output: Data + Clone,
    I: IntoIterator<Item = (&'static str, D)>,
{
    let (names, deps): (Vec<_>, Vec<_>) = fields.into_iter().unzip();
    Selector::new(deps, move |values: &Vec<D::Output>| {
        Arc::new(Record {
            fields: names.iter().copied().zip(values.iter().cloned()).collect(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeySelector;

    #[test]
    fn test_record_is_reused_while_fields_stay() {
        let record = structured([
            ("a", Selector::new((|s: &(u32, u32), _: &()| s.0,), |(a,): &(u32,)| *a)),
            ("b", Selector::new((|s: &(u32, u32), _: &()| s.1,), |(b,): &(u32,)| *b)),
        ]);

        let first = record.select(&(1, 2), &());
        let second = record.select(&(1, 2), &());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.iter().collect::<Vec<_>>(), [("a", &1), ("b", &2)]);

        let third = record.select(&(1, 3), &());
        assert_eq!(third.get("b"), Some(&3));
        assert_eq!(third.get("c"), None);
        assert_eq!(record.recomputations(), 2);
    }

    #[test]
    fn test_keyed_field_makes_record_keyed() {
        let id = KeySelector::new(|_: &(), props: &u32| props.to_string());
        let keyed = Selector::new((id,), |(key,): &(String,)| key.clone());
        let x = |_: &(), _: &u32| String::from("x");
        let plain = Selector::new((x,), |(x,): &(String,)| x.clone());
        let record = structured([("keyed", keyed), ("plain", plain)]);
        assert!(record.is_keyed());
        assert_eq!(record.select(&(), &7).get("keyed").map(String::as_str), Some("7"));
    }
}
