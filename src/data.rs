use std::rc::Rc;
use std::sync::Arc;

/// Shallow identity comparison for selector inputs.
///
/// Selectors never look inside a value to decide whether it changed. Shared
/// pointers compare by address, small copyable values compare by value, and
/// composite types such as tuples compare their parts with `same` again,
/// stopping at the first mismatch.
pub trait Data {
    /// Whether `other` is the same value as `self`.
    fn same(&self, other: &Self) -> bool;
}

/// Implements `Data` through `PartialEq` for types without identity.
macro_rules! data_by_value {
    ($($t:ty),* $(,)?) => {
        $(impl Data for $t {
            #[inline]
            fn same(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

data_by_value! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    char, bool, String,
}

impl Data for f32 {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Data for f64 {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Data for () {
    #[inline]
    fn same(&self, _: &Self) -> bool {
        true
    }
}

impl<T: ?Sized> Data for &T {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other)
    }
}

impl<T: ?Sized> Data for Arc<T> {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Data for Rc<T> {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Data> Data for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Data, E: Data> Data for Result<T, E> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.same(b),
            (Err(a), Err(b)) => a.same(b),
            _ => false,
        }
    }
}

/// Homogeneous dependency lists produce a `Vec` of values.
impl<T: Data> Data for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same(b))
    }
}

macro_rules! data_tuple {
    ($($param:ident $idx:tt),+) => {
        impl<$($param: Data),+> Data for ($($param,)+) {
            #[inline]
            fn same(&self, other: &Self) -> bool {
                true $(&& self.$idx.same(&other.$idx))+
            }
        }
    };
}

data_tuple! { A 0 }
data_tuple! { A 0, B 1 }
data_tuple! { A 0, B 1, C 2 }
data_tuple! { A 0, B 1, C 2, D 3 }
data_tuple! { A 0, B 1, C 2, D 3, E 4 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10 }
data_tuple! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11 }
