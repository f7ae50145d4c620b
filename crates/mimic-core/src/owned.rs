//! Owned scratch allocations for destination values
//!
//! Every destination the copy engine produces starts as an [`OwnedValue`]:
//! a single heap allocation of the shape's layout, default-initialized
//! through the shape vtable. The engine owns it exclusively until the value
//! is either transferred into a parent slot or read back out as a concrete
//! Rust value.

use crate::registry::shape_of;
use crate::reflect::Reflect;
use crate::shape::Shape;
use crate::value::{Reflected, ValueFlags};
use std::alloc::{alloc, dealloc, handle_alloc_error};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// An exclusively owned, heap-allocated value described by a shape.
///
/// Dropping an `OwnedValue` drops the contained value in place (through the
/// shape's drop entry) and releases the allocation.
pub(crate) struct OwnedValue {
    shape: &'static Shape,
    data: NonNull<u8>,
}

impl OwnedValue {
    /// Allocate fresh storage for `shape` and default-initialize it.
    ///
    /// # Panics
    ///
    /// Aborts via `handle_alloc_error` if the allocation fails.
    pub(crate) fn new(shape: &'static Shape) -> OwnedValue {
        let data = Self::alloc_raw(shape);
        (shape.default_fn)(data.as_ptr());
        OwnedValue { shape, data }
    }

    /// Allocate storage for `shape` and move `value` into it.
    pub(crate) fn from_value<T: Reflect>(value: T) -> OwnedValue {
        let shape = shape_of::<T>();
        let data = Self::alloc_raw(shape);
        // Safety: freshly allocated storage of T's layout.
        unsafe { (data.as_ptr() as *mut T).write(value) };
        OwnedValue { shape, data }
    }

    /// Adopt an allocation previously released with [`OwnedValue::into_raw`].
    ///
    /// # Safety
    ///
    /// `data` must be an allocation of `shape`'s layout made by the global
    /// allocator, holding an initialized value of `shape`'s type, and not
    /// owned by anything else.
    pub(crate) unsafe fn from_raw(shape: &'static Shape, data: NonNull<u8>) -> OwnedValue {
        OwnedValue { shape, data }
    }

    fn alloc_raw(shape: &'static Shape) -> NonNull<u8> {
        if shape.layout.size() == 0 {
            return NonNull::dangling();
        }
        // Safety: layout has non-zero size.
        let ptr = unsafe { alloc(shape.layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(shape.layout),
        }
    }

    /// The shape of the contained value.
    pub(crate) fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// The value's storage.
    pub(crate) fn data(&self) -> NonNull<u8> {
        self.data
    }

    /// Reflective view of the contained value.
    ///
    /// Fresh destinations are always accessible and addressable, however
    /// they will later be embedded: the copy routine legitimately owns this
    /// storage.
    pub(crate) fn reflected(&self) -> Reflected {
        // Safety: data holds an initialized value of self.shape and is
        // exclusively owned by self.
        unsafe {
            Reflected::compose(
                self.shape,
                self.data,
                ValueFlags::ACCESSIBLE.with(ValueFlags::ADDRESSABLE),
            )
        }
    }

    /// Release ownership of the allocation and its contents.
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        let this = ManuallyDrop::new(self);
        this.data
    }

    /// Deallocate after the contents have been moved out by other means
    /// (e.g. read by a container's insert entry).
    ///
    /// # Safety
    ///
    /// The contained value must already have been moved out; it is not
    /// dropped here.
    pub(crate) unsafe fn release_after_move(self) {
        let this = ManuallyDrop::new(self);
        if this.shape.layout.size() != 0 {
            dealloc(this.data.as_ptr(), this.shape.layout);
        }
    }

    /// Move the contained value out as a concrete `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T`'s shape is not this value's shape.
    pub(crate) fn take<T: Reflect>(self) -> T {
        let expected = shape_of::<T>();
        if !std::ptr::eq(self.shape, expected) {
            panic!(
                "shape mismatch: expected {}, found {}",
                expected.name, self.shape.name
            );
        }
        let this = ManuallyDrop::new(self);
        // Safety: shape identity was just checked, so the storage holds a T.
        let value = unsafe { std::ptr::read(this.data.as_ptr() as *const T) };
        if this.shape.layout.size() != 0 {
            // Safety: allocation made by alloc_raw with this layout.
            unsafe { dealloc(this.data.as_ptr(), this.shape.layout) };
        }
        value
    }
}

impl Drop for OwnedValue {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.shape.drop_fn {
            drop_fn(self.data.as_ptr());
        }
        if self.shape.layout.size() != 0 {
            // Safety: allocation made by alloc_raw with this layout.
            unsafe { dealloc(self.data.as_ptr(), self.shape.layout) };
        }
    }
}

impl std::fmt::Debug for OwnedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedValue")
            .field("shape", &self.shape.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default_initializes() {
        let owned = OwnedValue::new(shape_of::<i64>());
        let read = unsafe { *(owned.data().as_ptr() as *const i64) };
        assert_eq!(read, 0);
    }

    #[test]
    fn test_from_value_take_round_trip() {
        let owned = OwnedValue::from_value(String::from("payload"));
        assert_eq!(owned.take::<String>(), "payload");
    }

    #[test]
    fn test_drop_runs_contained_destructor() {
        // Dropping an owned String must not leak; exercised under the
        // test allocator / miri rather than asserted directly.
        let owned = OwnedValue::from_value(String::from("dropped"));
        drop(owned);
    }

    #[test]
    fn test_reflected_view_is_writable() {
        let owned = OwnedValue::new(shape_of::<u32>());
        let view = owned.reflected();
        assert!(view.is_accessible());
        assert!(view.is_addressable());
        assert!(view.check_assignable().is_ok());
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_take_wrong_shape_panics() {
        let owned = OwnedValue::from_value(5i32);
        let _ = owned.take::<u32>();
    }

    #[test]
    fn test_zero_sized_values() {
        reflect_zst();
    }

    fn reflect_zst() {
        crate::reflect_struct! {
            struct Empty {}
        }
        let owned = OwnedValue::new(shape_of::<Empty>());
        let _empty = owned.take::<Empty>();
    }
}
