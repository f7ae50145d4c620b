//! Raw assignment primitive
//!
//! Terminal writes of the copy engine all funnel through this module. For
//! an accessible destination the write is exactly the checked assignment
//! any caller could perform. For a destination reached through a private
//! field, the primitive clears the accessibility bit on a *local copy* of
//! the destination descriptor and then performs the identical low-level
//! transfer. The caller's descriptor and the field's declared visibility
//! are never altered; the bypass is one bounded write.
//!
//! This module is crate-private on purpose: the unchecked twin of the
//! assignment operation exists only for the copy routine, which always
//! legitimately owns the destination storage it writes to.

use crate::owned::OwnedValue;
use crate::shape::{ShapeFlags, ShapeKind};
use crate::value::Reflected;
use crate::ReflectError;

/// Resolve a destination descriptor for writing.
///
/// Accessible destinations pass the normal capability check unchanged;
/// inaccessible ones are relaxed on a local copy. Anything else (a
/// non-addressable destination) is a violated engine precondition.
fn writable(dst: &Reflected) -> Reflected {
    match dst.check_assignable() {
        Ok(()) => *dst,
        Err(ReflectError::NotAccessible) => dst.with_accessible(),
        Err(err) => panic!("deep copy: destination slot rejected write: {err}"),
    }
}

/// Coerce an owned value to `target`'s shape.
///
/// Identical shapes pass through. A polymorphic target boxes the concrete
/// value through its witness. Any other combination is a fatal
/// assignability failure — unreachable from the engine's own orchestration.
fn coerce_owned(src: OwnedValue, target: &'static crate::shape::Shape) -> OwnedValue {
    if std::ptr::eq(src.shape(), target) {
        return src;
    }
    if let ShapeKind::Polymorphic(def) = &target.kind {
        let boxed = OwnedValue::new(target);
        let shape = src.shape();
        (def.put_fn)(boxed.data().as_ptr(), shape, src.into_raw());
        return boxed;
    }
    panic!(
        "deep copy: {} is not assignable to {}",
        src.shape().name,
        target.name
    );
}

/// Move a fully built value into a destination slot, which may be
/// accessible or not.
///
/// The old destination content is dropped, then the source's bytes are
/// transferred and its allocation released without dropping.
pub(crate) fn assign_owned(dst: &Reflected, src: OwnedValue) {
    let dst = writable(dst);
    let src = coerce_owned(src, dst.shape());
    let shape = dst.shape();
    // Safety: dst denotes exclusively owned storage of `shape` (engine
    // invariant for every destination), src was coerced to the same shape.
    unsafe {
        if let Some(drop_fn) = shape.drop_fn {
            drop_fn(dst.data().as_ptr());
        }
        std::ptr::copy_nonoverlapping(
            src.data().as_ptr() as *const u8,
            dst.data().as_ptr(),
            shape.layout.size(),
        );
        src.release_after_move();
    }
}

/// Clone a leaf value from `src` into a destination slot.
///
/// The transfer mode follows the value's representation: out-of-line
/// (`INDIRECT`) payloads go through the shape's clone entry so the backing
/// data is duplicated; inline representations are a direct bitwise
/// overwrite.
pub(crate) fn assign_cloned(dst: &Reflected, src: &Reflected) {
    let dst = writable(dst);
    if !std::ptr::eq(dst.shape(), src.shape()) {
        // Shape adaptation is the owned primitive's job.
        return assign_owned(&dst, clone_to_owned(src));
    }
    let shape = dst.shape();
    // Safety: same invariants as assign_owned; src is only read.
    unsafe {
        if let Some(drop_fn) = shape.drop_fn {
            drop_fn(dst.data().as_ptr());
        }
        if shape.flags.contains(ShapeFlags::INDIRECT) {
            let clone_fn = shape.clone_fn.unwrap_or_else(|| {
                panic!(
                    "deep copy: shape {} has out-of-line payload but no clone entry",
                    shape.name
                )
            });
            clone_fn(src.data().as_ptr() as *const u8, dst.data().as_ptr());
        } else {
            std::ptr::copy_nonoverlapping(
                src.data().as_ptr() as *const u8,
                dst.data().as_ptr(),
                shape.layout.size(),
            );
        }
    }
}

/// Clone a leaf value into fresh owned storage.
fn clone_to_owned(src: &Reflected) -> OwnedValue {
    let owned = OwnedValue::new(src.shape());
    assign_cloned(&owned.reflected(), src);
    owned
}

/// Insert one key into a map slot, bypassing accessibility the same way
/// plain assignment does.
///
/// `value: None` deletes `key` from the map instead. Key and value are
/// coerced to the map's declared shapes; an impossible coercion is fatal.
///
/// # Panics
///
/// Panics if `map` is not an associative map shape.
pub(crate) fn insert_map(map: &Reflected, key: OwnedValue, value: Option<OwnedValue>) {
    let map = writable(map);
    let ShapeKind::Map(def) = &map.shape().kind else {
        panic!("deep copy: insert into non-map shape {}", map.shape().name);
    };
    let key = coerce_owned(key, (def.key)());
    match value {
        Some(value) => {
            let value = coerce_owned(value, (def.value)());
            (def.insert_fn)(map.data().as_ptr(), key.data(), value.data());
            // Safety: insert_fn read both entries out of their storage.
            unsafe {
                key.release_after_move();
                value.release_after_move();
            }
        }
        None => {
            (def.remove_fn)(map.data().as_ptr(), key.data());
            // remove_fn reads the key by reference; drop it normally.
        }
    }
}
