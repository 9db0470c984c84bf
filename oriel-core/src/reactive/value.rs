//! Dynamic Node Values
//!
//! Reactive nodes of every value type share one graph, so node storage is
//! type-erased. A [`Value`] is a boxed `Any` paired with an equality function
//! captured at construction time, which is what lets the engine ask "did this
//! memo produce the same value as last time?" without knowing the type.
//!
//! Values built with [`Value::new`] compare with the type's `PartialEq`.
//! Values built with [`Value::opaque`] (effect accumulators, which are never
//! diffed) compare as always-unequal, so if one ever does reach a comparison
//! it propagates rather than suppresses.

use std::any::Any;

/// A type-erased node value with dynamic equality.
pub struct Value {
    inner: Box<dyn Any + Send>,
    eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl Value {
    /// Wrap a value whose changes are detected with `PartialEq`.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + PartialEq,
    {
        Self {
            inner: Box::new(value),
            eq: |a, b| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Wrap a value that never compares equal to anything.
    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + Send,
    {
        Self {
            inner: Box::new(value),
            eq: |_, _| false,
        }
    }

    /// Compare against another value with the equality captured at
    /// construction.
    pub fn equals(&self, other: &Value) -> bool {
        (self.eq)(self.inner.as_ref(), other.inner.as_ref())
    }

    /// Borrow the value as `T`, if that is what it holds.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Take the value out as `T`, if that is what it holds.
    pub fn into_inner<T: Any>(self) -> Option<T> {
        self.inner.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value").finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_of_the_same_type_compare_equal() {
        let a = Value::new(42_i32);
        let b = Value::new(42_i32);
        let c = Value::new(7_i32);

        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }

    #[test]
    fn values_of_different_types_never_compare_equal() {
        let number = Value::new(1_i32);
        let text = Value::new(String::from("1"));

        assert!(!number.equals(&text));
        assert!(!text.equals(&number));
    }

    #[test]
    fn opaque_values_never_compare_equal() {
        let a = Value::opaque(42_i32);
        let b = Value::opaque(42_i32);

        assert!(!a.equals(&b));
        assert!(!a.equals(&Value::new(42_i32)));
    }

    #[test]
    fn downcasting_recovers_the_inner_value() {
        let value = Value::new(String::from("hello"));

        assert_eq!(value.downcast_ref::<String>().unwrap(), "hello");
        assert!(value.downcast_ref::<i32>().is_none());
        assert_eq!(value.into_inner::<String>().unwrap(), "hello");
    }
}
