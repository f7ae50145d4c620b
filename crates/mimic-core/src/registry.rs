//! Shape interning
//!
//! Shapes are built once per concrete type and leaked into a process-wide
//! table keyed by [`TypeId`]. Interning gives every type a single
//! `&'static Shape`, so shape identity checks are pointer comparisons.
//! The table is append-only and entries are immutable: after the first
//! registration of a type, all lookups are read-lock only.

use crate::reflect::Reflect;
use crate::shape::Shape;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::TypeId;

static SHAPES: Lazy<RwLock<FxHashMap<TypeId, &'static Shape>>> =
    Lazy::new(|| RwLock::new(FxHashMap::default()));

/// Get the interned shape descriptor for `T`.
///
/// Builds and registers the shape on first use. If two threads race on the
/// first registration, one of the freshly built shapes is discarded
/// (leaked) and both observe the winner.
pub fn shape_of<T: Reflect>() -> &'static Shape {
    let key = TypeId::of::<T>();
    if let Some(shape) = SHAPES.read().get(&key) {
        return shape;
    }

    // Build outside the write lock; build_shape never re-enters the
    // registry because descriptor cross-references are deferred fn pointers.
    let built: &'static Shape = Box::leak(Box::new(T::build_shape()));

    let mut shapes = SHAPES.write();
    *shapes.entry(key).or_insert(built)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_is_interned() {
        let a = shape_of::<i32>();
        let b = shape_of::<i32>();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_distinct_types_distinct_shapes() {
        let a = shape_of::<i32>();
        let b = shape_of::<u32>();
        assert!(!std::ptr::eq(a, b));
    }

    #[test]
    fn test_generic_instantiations_are_distinct() {
        let a = shape_of::<Vec<i32>>();
        let b = shape_of::<Vec<String>>();
        assert!(!std::ptr::eq(a, b));
    }
}
