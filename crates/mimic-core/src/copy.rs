//! Traversal engine
//!
//! Recursive dispatcher over the six structural shapes. Each level of the
//! recursion allocates a fresh destination, asks the source's shape which
//! rule applies, and terminates every branch through the raw assignment
//! primitive in [`crate::assign`].
//!
//! The traversal only ever reads the source tree and only ever writes
//! freshly allocated destination storage, so concurrent copies of a shared
//! source are race-free as long as nothing else mutates it.

use crate::assign;
use crate::dynamic::DynValue;
use crate::owned::OwnedValue;
use crate::registry::shape_of;
use crate::reflect::Reflect;
use crate::shape::ShapeKind;
use crate::value::Reflected;

/// Structurally deep copy a value.
///
/// The result is a new value of the same type, equal in content and
/// sharing no mutable storage with the source at any depth — including
/// storage reached only through private fields.
///
/// Recursion depth is bounded by the call stack; cyclic value graphs are
/// not detected and will overflow it.
pub fn deep_copy<T: Reflect>(value: &T) -> T {
    let original = Reflected::from_ref(value);
    let cpy = OwnedValue::new(shape_of::<T>());
    copy_recursive(&original, &cpy.reflected());
    cpy.take()
}

/// Deep copy a polymorphic value.
///
/// An empty slot returns an empty slot without allocating. A slot boxing a
/// typed absent pointer copies to a slot boxing an equally typed absent
/// pointer.
pub fn copy_dyn(value: &DynValue) -> DynValue {
    if value.is_empty() {
        return DynValue::empty();
    }
    deep_copy(value)
}

/// One recursion step: copy `original` into the destination slot `cpy`.
///
/// Both views must have the same shape; the engine guarantees this by
/// construction at every call site.
fn copy_recursive(original: &Reflected, cpy: &Reflected) {
    match &original.shape().kind {
        ShapeKind::Pointer(def) => {
            // Absent pointer: the destination's default is already absent.
            let Some(pointee) = (def.deref_fn)(original.data().as_ptr()) else {
                return;
            };
            let pointee_shape = (def.pointee)();
            // Safety: deref_fn returned live storage of the pointee shape.
            let original_pointee =
                unsafe { Reflected::compose(pointee_shape, pointee, original.flags()) };

            let fresh = OwnedValue::new(pointee_shape);
            copy_recursive(&original_pointee, &fresh.reflected());

            // Rebuild the pointer around the copied pointee, then move it
            // into the destination slot.
            let rebuilt = OwnedValue::new(original.shape());
            (def.set_fn)(rebuilt.data().as_ptr(), fresh.into_raw());
            assign::assign_owned(cpy, rebuilt);
        }

        ShapeKind::Polymorphic(def) => {
            // Empty slot: leave the destination empty.
            let Some((inner_shape, inner_data)) = (def.peek_fn)(original.data().as_ptr()) else {
                return;
            };
            // Safety: peek_fn returned live storage of the boxed shape.
            let original_inner =
                unsafe { Reflected::compose(inner_shape, inner_data, original.flags()) };

            let fresh = OwnedValue::new(inner_shape);
            copy_recursive(&original_inner, &fresh.reflected());

            // The assignment primitive boxes the concrete copy back into
            // the polymorphic destination.
            assign::assign_owned(cpy, fresh);
        }

        ShapeKind::Struct(def) => {
            // Member by member, in declaration order. Members are
            // independent; order only pins down the sequence of writes.
            for index in 0..def.fields.len() {
                copy_recursive(&original.field(index), &cpy.field(index));
            }
        }

        ShapeKind::Sequence(def) => {
            if (def.is_absent_fn)(original.data().as_ptr()) {
                return;
            }
            let len = (def.len_fn)(original.data().as_ptr());
            let capacity = (def.capacity_fn)(original.data().as_ptr());

            // Sized destination first (preserving length and capacity),
            // then element-by-element into its slots.
            let rebuilt = OwnedValue::new(original.shape());
            (def.init_fn)(rebuilt.data().as_ptr(), len, capacity);
            assign::assign_owned(cpy, rebuilt);

            for index in 0..len {
                copy_recursive(&original.index(index), &cpy.index(index));
            }
        }

        ShapeKind::Map(def) => {
            if (def.is_absent_fn)(original.data().as_ptr()) {
                return;
            }
            // Fresh empty map into the destination, then one insert per
            // source entry; iteration order is irrelevant.
            assign::assign_owned(cpy, OwnedValue::new(original.shape()));

            let key_shape = (def.key)();
            let value_shape = (def.value)();
            (def.visit_fn)(original.data().as_ptr(), &mut |key_data, value_data| {
                // Safety: visit_fn hands out live entry storage.
                let (original_key, original_value) = unsafe {
                    (
                        Reflected::compose(key_shape, key_data, original.flags()),
                        Reflected::compose(value_shape, value_data, original.flags()),
                    )
                };

                let key_cpy = OwnedValue::new(key_shape);
                copy_recursive(&original_key, &key_cpy.reflected());
                let value_cpy = OwnedValue::new(value_shape);
                copy_recursive(&original_value, &value_cpy.reflected());

                assign::insert_map(cpy, key_cpy, Some(value_cpy));
            });
        }

        ShapeKind::Scalar => {
            assign::assign_cloned(cpy, original);
        }
    }
}
