//! Same-value equality.
//!
//! A write is only propagated when the new value differs from the old one.
//! "Differs" follows same-value semantics rather than `PartialEq`:
//!
//! - floats: `NaN` equals `NaN`, and `+0.0` is distinct from `-0.0`;
//! - `Rc` / `Arc`: identity of the allocation, not equality of the contents;
//! - plain data: `==`.

use std::rc::Rc;
use std::sync::Arc;

/// Equality used to decide whether a write is a change.
pub trait SameValue {
    /// Whether `self` and `other` are the same value.
    fn same_value(&self, other: &Self) -> bool;
}

/// Implement [`SameValue`] for types whose `PartialEq` already has the right
/// meaning.
///
/// ```rust
/// use rivulet_core::{same_value_by_eq, signal};
///
/// #[derive(Clone, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// same_value_by_eq!(Point);
///
/// let p = signal(Point { x: 1, y: 2 });
/// p.set(Point { x: 1, y: 2 });
/// ```
#[macro_export]
macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
);

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Box<T> {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(&**other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue, E: SameValue> SameValue for Result<T, E> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.same_value(b),
            (Err(a), Err(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

macro_rules! same_value_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: SameValue),+> SameValue for ($($name,)+) {
            fn same_value(&self, other: &Self) -> bool {
                $(self.$idx.same_value(&other.$idx))&&+
            }
        }
    };
}

same_value_tuple!(A: 0);
same_value_tuple!(A: 0, B: 1);
same_value_tuple!(A: 0, B: 1, C: 2);
same_value_tuple!(A: 0, B: 1, C: 2, D: 3);
