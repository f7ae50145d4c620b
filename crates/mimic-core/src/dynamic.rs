//! Polymorphic values
//!
//! [`DynValue`] is the crate's polymorphic container: a slot that holds a
//! concrete value of any reflectable type, or nothing. It is the dynamic
//! counterpart of a trait object — the shape pointer carried alongside the
//! allocation is the capability witness that lets the engine traverse and
//! rebuild the boxed value without knowing its static type.

use crate::owned::OwnedValue;
use crate::registry::shape_of;
use crate::reflect::{default_raw, drop_raw, Reflect};
use crate::shape::{PolyDef, Shape, ShapeFlags, ShapeKind};
use std::alloc::Layout;
use std::ptr::NonNull;

/// A polymorphic value: either empty or a boxed concrete value paired with
/// its shape.
#[derive(Default)]
pub struct DynValue {
    inner: Option<OwnedValue>,
}

impl DynValue {
    /// The empty (absent) polymorphic value.
    pub fn empty() -> DynValue {
        DynValue { inner: None }
    }

    /// Box a concrete value.
    pub fn new<T: Reflect>(value: T) -> DynValue {
        DynValue {
            inner: Some(OwnedValue::from_value(value)),
        }
    }

    /// Whether the slot holds no value at all.
    ///
    /// A slot holding a typed absent pointer (e.g. a boxed
    /// `Option<Box<T>>` that is `None`) is not empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Shape of the boxed value, if any.
    pub fn shape(&self) -> Option<&'static Shape> {
        self.inner.as_ref().map(|o| o.shape())
    }

    /// Borrow the boxed value as a `T`, if the shapes match.
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        let owned = self.inner.as_ref()?;
        if !std::ptr::eq(owned.shape(), shape_of::<T>()) {
            return None;
        }
        // Safety: shape identity implies the allocation holds a T.
        Some(unsafe { &*(owned.data().as_ptr() as *const T) })
    }

    /// Move the boxed value out as a `T`.
    ///
    /// Returns `self` unchanged when the slot is empty or holds a value of
    /// a different shape.
    pub fn downcast<T: Reflect>(mut self) -> Result<T, DynValue> {
        match self.inner.take() {
            Some(owned) if std::ptr::eq(owned.shape(), shape_of::<T>()) => Ok(owned.take()),
            other => {
                self.inner = other;
                Err(self)
            }
        }
    }

    /// View the boxed value's parts.
    pub(crate) fn parts(&self) -> Option<(&'static Shape, NonNull<u8>)> {
        self.inner.as_ref().map(|o| (o.shape(), o.data()))
    }

    /// Rebuild a slot around an existing allocation.
    ///
    /// # Safety
    ///
    /// Same contract as [`OwnedValue::from_raw`].
    pub(crate) unsafe fn from_parts(shape: &'static Shape, data: NonNull<u8>) -> DynValue {
        DynValue {
            inner: Some(OwnedValue::from_raw(shape, data)),
        }
    }
}

impl std::fmt::Debug for DynValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.shape() {
            Some(shape) => write!(f, "DynValue({})", shape.name),
            None => write!(f, "DynValue(empty)"),
        }
    }
}

fn dyn_peek(ptr: *const u8) -> Option<(&'static Shape, NonNull<u8>)> {
    // Safety: vtable contract — ptr points to a live DynValue.
    unsafe { (*(ptr as *const DynValue)).parts() }
}

fn dyn_put(dst: *mut u8, shape: &'static Shape, value: NonNull<u8>) {
    // Safety: vtable contract — dst points to an initialized DynValue and
    // `value` is a transferred allocation of `shape`'s layout. The old slot
    // content is dropped by the assignment.
    unsafe {
        *(dst as *mut DynValue) = DynValue::from_parts(shape, value);
    }
}

// Safety: the shape below describes DynValue exactly.
unsafe impl Reflect for DynValue {
    fn build_shape() -> Shape {
        Shape {
            name: "DynValue",
            layout: Layout::new::<DynValue>(),
            kind: ShapeKind::Polymorphic(PolyDef {
                peek_fn: dyn_peek,
                put_fn: dyn_put,
            }),
            flags: ShapeFlags::INDIRECT,
            default_fn: default_raw::<DynValue>,
            drop_fn: Some(drop_raw::<DynValue>),
            clone_fn: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let v = DynValue::empty();
        assert!(v.is_empty());
        assert!(v.shape().is_none());
        assert!(v.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_box_and_borrow() {
        let v = DynValue::new(41i32);
        assert!(!v.is_empty());
        assert_eq!(v.downcast_ref::<i32>(), Some(&41));
        assert!(v.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_downcast_moves_out() {
        let v = DynValue::new(String::from("boxed"));
        assert_eq!(v.downcast::<String>().unwrap(), "boxed");
    }

    #[test]
    fn test_downcast_wrong_shape_returns_slot() {
        let v = DynValue::new(1u8);
        let v = v.downcast::<u16>().unwrap_err();
        assert_eq!(v.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn test_typed_absent_pointer_is_not_empty() {
        let v = DynValue::new(Option::<Box<i32>>::None);
        assert!(!v.is_empty());
        assert_eq!(v.downcast_ref::<Option<Box<i32>>>(), Some(&None));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", DynValue::empty()), "DynValue(empty)");
        assert_eq!(format!("{:?}", DynValue::new(1i32)), "DynValue(i32)");
    }
}
