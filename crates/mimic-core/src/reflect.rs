//! The `Reflect` trait and shape implementations for std types
//!
//! A type opts into reflective copying by implementing [`Reflect`], whose
//! only job is to build the type's [`Shape`]. Implementations are provided
//! for the scalar primitives, `String`, `Vec<T>`, `HashMap<K, V>`,
//! `Option<Box<T>>` (nullable pointer) and `Box<T>` (never-null pointer).
//! Fixed aggregates use the [`crate::reflect_struct!`] macro.

use crate::registry::shape_of;
use crate::shape::{
    MapDef, PointerDef, SequenceDef, Shape, ShapeFlags, ShapeKind,
};
use std::alloc::Layout;
use std::any::type_name;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// A type with a runtime shape descriptor.
///
/// # Safety
///
/// `build_shape` must describe the implementing type exactly: the layout,
/// field offsets, and every vtable entry must operate on real values of
/// `Self`. The copy engine trusts the descriptor for raw memory operations.
pub unsafe trait Reflect: Sized + 'static {
    /// Build this type's shape descriptor. Called once per process; use
    /// [`crate::registry::shape_of`] to obtain the interned shape.
    fn build_shape() -> Shape;
}

// ============================================================================
// Vtable building blocks
// ============================================================================

/// Default-construct a `T` in uninitialized storage.
pub fn default_raw<T: Default>(ptr: *mut u8) {
    // Safety: vtable contract — ptr is uninitialized storage of T's layout.
    unsafe { (ptr as *mut T).write(T::default()) };
}

/// Drop a `T` in place.
pub fn drop_raw<T>(ptr: *mut u8) {
    // Safety: vtable contract — ptr holds an initialized T.
    unsafe { std::ptr::drop_in_place(ptr as *mut T) };
}

/// Clone the `T` at `src` into uninitialized storage at `dst`.
pub fn clone_raw<T: Clone>(src: *const u8, dst: *mut u8) {
    // Safety: vtable contract — src holds an initialized T, dst is
    // uninitialized storage of T's layout.
    unsafe { (dst as *mut T).write((*(src as *const T)).clone()) };
}

/// Construct a default `T` through its shape vtable.
///
/// Unlike `T::default()`, this requires only `T: Reflect`.
pub fn default_value<T: Reflect>() -> T {
    let mut slot = MaybeUninit::<T>::uninit();
    (shape_of::<T>().default_fn)(slot.as_mut_ptr() as *mut u8);
    // Safety: default_fn initialized the slot.
    unsafe { slot.assume_init() }
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            // Safety: plain-old-data scalar; the descriptor is exact.
            unsafe impl Reflect for $ty {
                fn build_shape() -> Shape {
                    Shape {
                        name: type_name::<$ty>(),
                        layout: Layout::new::<$ty>(),
                        kind: ShapeKind::Scalar,
                        flags: ShapeFlags::empty(),
                        default_fn: default_raw::<$ty>,
                        drop_fn: None,
                        clone_fn: Some(clone_raw::<$ty>),
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char,
}

// Safety: String's payload is out of line, so the shape is marked INDIRECT
// and carries a real clone entry; otherwise exact.
unsafe impl Reflect for String {
    fn build_shape() -> Shape {
        Shape {
            name: "String",
            layout: Layout::new::<String>(),
            kind: ShapeKind::Scalar,
            flags: ShapeFlags::INDIRECT,
            default_fn: default_raw::<String>,
            drop_fn: Some(drop_raw::<String>),
            clone_fn: Some(clone_raw::<String>),
        }
    }
}

// ============================================================================
// Sequences
// ============================================================================

fn vec_len<T>(ptr: *const u8) -> usize {
    // Safety: vtable contract — ptr points to a live Vec<T>.
    unsafe { (*(ptr as *const Vec<T>)).len() }
}

fn vec_capacity<T>(ptr: *const u8) -> usize {
    // Safety: vtable contract.
    unsafe { (*(ptr as *const Vec<T>)).capacity() }
}

fn vec_init<T: Reflect>(dst: *mut u8, len: usize, capacity: usize) {
    let mut fresh = Vec::<T>::with_capacity(capacity);
    for _ in 0..len {
        fresh.push(default_value::<T>());
    }
    // Safety: vtable contract — dst holds an initialized Vec<T>; the old
    // (empty default) vector is dropped by the assignment.
    unsafe { *(dst as *mut Vec<T>) = fresh };
}

fn vec_item<T>(ptr: *const u8, index: usize) -> NonNull<u8> {
    // Safety: vtable contract — ptr points to a live Vec<T>.
    let vec = unsafe { &*(ptr as *const Vec<T>) };
    NonNull::from(&vec[index]).cast()
}

// Safety: the sequence vtable operates on real Vec<T> values; layout exact.
unsafe impl<T: Reflect> Reflect for Vec<T> {
    fn build_shape() -> Shape {
        Shape {
            name: type_name::<Vec<T>>(),
            layout: Layout::new::<Vec<T>>(),
            kind: ShapeKind::Sequence(SequenceDef {
                elem: shape_of::<T>,
                is_absent_fn: |_| false,
                len_fn: vec_len::<T>,
                capacity_fn: vec_capacity::<T>,
                init_fn: vec_init::<T>,
                item_fn: vec_item::<T>,
            }),
            flags: ShapeFlags::INDIRECT,
            default_fn: default_raw::<Vec<T>>,
            drop_fn: Some(drop_raw::<Vec<T>>),
            clone_fn: None,
        }
    }
}

// ============================================================================
// Associative maps
// ============================================================================

fn map_len<K, V>(ptr: *const u8) -> usize {
    // Safety: vtable contract — ptr points to a live HashMap<K, V>.
    unsafe { (*(ptr as *const HashMap<K, V>)).len() }
}

fn map_visit<K, V>(ptr: *const u8, visit: &mut dyn FnMut(NonNull<u8>, NonNull<u8>)) {
    // Safety: vtable contract.
    let map = unsafe { &*(ptr as *const HashMap<K, V>) };
    for (key, value) in map.iter() {
        visit(NonNull::from(key).cast(), NonNull::from(value).cast());
    }
}

fn map_insert<K: Eq + Hash, V>(map: *mut u8, key: NonNull<u8>, value: NonNull<u8>) {
    // Safety: vtable contract — the map is live and the entry storage holds
    // initialized K/V values whose contents we take ownership of.
    unsafe {
        let map = &mut *(map as *mut HashMap<K, V>);
        let key = std::ptr::read(key.as_ptr() as *const K);
        let value = std::ptr::read(value.as_ptr() as *const V);
        map.insert(key, value);
    }
}

fn map_remove<K: Eq + Hash, V>(map: *mut u8, key: NonNull<u8>) {
    // Safety: vtable contract — the key is read by reference only.
    unsafe {
        let map = &mut *(map as *mut HashMap<K, V>);
        map.remove(&*(key.as_ptr() as *const K));
    }
}

// Safety: the map vtable operates on real HashMap<K, V> values; layout exact.
unsafe impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn build_shape() -> Shape {
        Shape {
            name: type_name::<HashMap<K, V>>(),
            layout: Layout::new::<HashMap<K, V>>(),
            kind: ShapeKind::Map(MapDef {
                key: shape_of::<K>,
                value: shape_of::<V>,
                is_absent_fn: |_| false,
                len_fn: map_len::<K, V>,
                visit_fn: map_visit::<K, V>,
                insert_fn: map_insert::<K, V>,
                remove_fn: map_remove::<K, V>,
            }),
            flags: ShapeFlags::INDIRECT,
            default_fn: default_raw::<HashMap<K, V>>,
            drop_fn: Some(drop_raw::<HashMap<K, V>>),
            clone_fn: None,
        }
    }
}

// ============================================================================
// Pointers
// ============================================================================

fn opt_box_deref<T>(ptr: *const u8) -> Option<NonNull<u8>> {
    // Safety: vtable contract — ptr points to a live Option<Box<T>>.
    let opt = unsafe { &*(ptr as *const Option<Box<T>>) };
    opt.as_deref().map(|pointee| NonNull::from(pointee).cast())
}

fn opt_box_set<T>(dst: *mut u8, pointee: NonNull<u8>) {
    // Safety: vtable contract — the pointee allocation was made with T's
    // layout by the global allocator, so it is a valid Box allocation.
    unsafe {
        *(dst as *mut Option<Box<T>>) = Some(Box::from_raw(pointee.as_ptr() as *mut T));
    }
}

// Safety: nullable pointer over Box; layout exact, vtable operates on real
// Option<Box<T>> values.
unsafe impl<T: Reflect> Reflect for Option<Box<T>> {
    fn build_shape() -> Shape {
        Shape {
            name: type_name::<Option<Box<T>>>(),
            layout: Layout::new::<Option<Box<T>>>(),
            kind: ShapeKind::Pointer(PointerDef {
                pointee: shape_of::<T>,
                deref_fn: opt_box_deref::<T>,
                set_fn: opt_box_set::<T>,
            }),
            flags: ShapeFlags::INDIRECT,
            default_fn: default_raw::<Option<Box<T>>>,
            drop_fn: Some(drop_raw::<Option<Box<T>>>),
            clone_fn: None,
        }
    }
}

fn box_deref<T>(ptr: *const u8) -> Option<NonNull<u8>> {
    // Safety: vtable contract — ptr points to a live Box<T>.
    let boxed = unsafe { &*(ptr as *const Box<T>) };
    Some(NonNull::from(&**boxed).cast())
}

fn box_set<T>(dst: *mut u8, pointee: NonNull<u8>) {
    // Safety: as opt_box_set; the previously held Box is dropped by the
    // assignment.
    unsafe {
        *(dst as *mut Box<T>) = Box::from_raw(pointee.as_ptr() as *mut T);
    }
}

fn box_default<T: Reflect>(ptr: *mut u8) {
    // Safety: vtable contract — ptr is uninitialized storage of Box<T>'s
    // layout.
    unsafe { (ptr as *mut Box<T>).write(Box::new(default_value::<T>())) };
}

// Safety: never-null pointer; its absence probe never fires. Layout exact.
unsafe impl<T: Reflect> Reflect for Box<T> {
    fn build_shape() -> Shape {
        Shape {
            name: type_name::<Box<T>>(),
            layout: Layout::new::<Box<T>>(),
            kind: ShapeKind::Pointer(PointerDef {
                pointee: shape_of::<T>,
                deref_fn: box_deref::<T>,
                set_fn: box_set::<T>,
            }),
            flags: ShapeFlags::INDIRECT,
            default_fn: box_default::<T>,
            drop_fn: Some(drop_raw::<Box<T>>),
            clone_fn: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value_through_vtable() {
        assert_eq!(default_value::<i32>(), 0);
        assert_eq!(default_value::<String>(), "");
        assert_eq!(default_value::<Vec<u8>>(), Vec::<u8>::new());
        assert_eq!(default_value::<Option<Box<i32>>>(), None);
    }

    #[test]
    fn test_vec_vtable_entries() {
        let shape = shape_of::<Vec<i32>>();
        let ShapeKind::Sequence(def) = &shape.kind else {
            panic!("Vec shape must be a sequence");
        };
        let v = vec![1i32, 2, 3];
        let ptr = &v as *const Vec<i32> as *const u8;
        assert_eq!((def.len_fn)(ptr), 3);
        assert!((def.capacity_fn)(ptr) >= 3);
        assert!(!(def.is_absent_fn)(ptr));
        let item = (def.item_fn)(ptr, 2);
        assert_eq!(unsafe { *(item.as_ptr() as *const i32) }, 3);
    }

    #[test]
    fn test_map_vtable_visit_covers_all_entries() {
        let shape = shape_of::<HashMap<String, i32>>();
        let ShapeKind::Map(def) = &shape.kind else {
            panic!("HashMap shape must be a map");
        };
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        let ptr = &map as *const HashMap<String, i32> as *const u8;
        assert_eq!((def.len_fn)(ptr), 2);

        let mut seen = 0usize;
        (def.visit_fn)(ptr, &mut |_, value| {
            seen += unsafe { *(value.as_ptr() as *const i32) } as usize;
        });
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_pointer_vtable_deref() {
        let shape = shape_of::<Option<Box<u16>>>();
        let ShapeKind::Pointer(def) = &shape.kind else {
            panic!("Option<Box<T>> shape must be a pointer");
        };

        let absent: Option<Box<u16>> = None;
        assert!((def.deref_fn)(&absent as *const _ as *const u8).is_none());

        let present: Option<Box<u16>> = Some(Box::new(77));
        let pointee = (def.deref_fn)(&present as *const _ as *const u8).unwrap();
        assert_eq!(unsafe { *(pointee.as_ptr() as *const u16) }, 77);
    }

    #[test]
    fn test_box_deref_never_absent() {
        let shape = shape_of::<Box<i64>>();
        let ShapeKind::Pointer(def) = &shape.kind else {
            panic!("Box<T> shape must be a pointer");
        };
        let boxed = Box::new(5i64);
        assert!((def.deref_fn)(&boxed as *const _ as *const u8).is_some());
    }
}
