//! Shape descriptors: runtime type information driving the copy engine
//!
//! A [`Shape`] describes one concrete Rust type: its layout, its structural
//! category (the [`ShapeKind`] tag), and a small vtable of function pointers
//! for the operations the engine needs without knowing the type statically
//! (default-construct in place, drop in place, clone).
//!
//! Shapes are interned once per type (see [`crate::registry`]) and never
//! mutated afterwards, so shape identity is pointer identity.

use std::alloc::Layout;
use std::ptr::NonNull;

/// Default-construction function: writes a fresh default value into `ptr`.
///
/// Contract: `ptr` points to uninitialized storage of the shape's layout.
pub type DefaultFn = fn(*mut u8);

/// Drop function: drops the value at `ptr` in place without deallocating.
///
/// Contract: `ptr` points to an initialized value of the shape's type.
pub type DropFn = fn(*mut u8);

/// Clone function: writes a clone of the value at `src` into `dst`.
///
/// Contract: `src` is initialized, `dst` is uninitialized storage of the
/// same shape.
pub type CloneFn = fn(src: *const u8, dst: *mut u8);

/// Deferred shape accessor, used wherever a descriptor references another
/// descriptor. Deferral keeps shape construction non-recursive even for
/// self-referential types (`Option<Box<Node>>` inside `Node`).
pub type ShapeFn = fn() -> &'static Shape;

/// Shape-level attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeFlags(u8);

impl ShapeFlags {
    /// The value's payload lives out of line (behind its own allocation),
    /// so a bitwise copy would alias mutable storage. Terminal assignment
    /// of such a value must go through the clone vtable entry instead of a
    /// plain memory copy.
    pub const INDIRECT: ShapeFlags = ShapeFlags(1 << 0);

    /// No flags set.
    pub const fn empty() -> Self {
        ShapeFlags(0)
    }

    /// Check whether all bits of `other` are set in `self`.
    pub const fn contains(self, other: ShapeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    pub const fn with(self, other: ShapeFlags) -> Self {
        ShapeFlags(self.0 | other.0)
    }
}

/// Per-field attribute bits for fixed aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFlags(u8);

impl FieldFlags {
    /// Field readable/writable by any holder of the aggregate's descriptor.
    pub const PUBLIC: FieldFlags = FieldFlags(0);

    /// Field is private to the declaring module. Values reached through it
    /// lose their `ACCESSIBLE` bit and the checked assignment path refuses
    /// to write them.
    pub const PRIVATE: FieldFlags = FieldFlags(1 << 0);

    /// Check whether all bits of `other` are set in `self`.
    pub const fn contains(self, other: FieldFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One named member of a fixed aggregate.
pub struct FieldDef {
    /// Field name, as declared.
    pub name: &'static str,

    /// Byte offset from the start of the aggregate.
    pub offset: usize,

    /// Shape of the field's type.
    pub shape: ShapeFn,

    /// Field attributes (visibility).
    pub flags: FieldFlags,
}

/// Fixed aggregate: statically known, ordered set of named members.
pub struct StructDef {
    /// Members in declaration order.
    pub fields: &'static [FieldDef],
}

impl StructDef {
    /// Look up a field's index by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Pointer-like indirection (`Option<Box<T>>`, `Box<T>`).
pub struct PointerDef {
    /// Shape of the pointed-to value.
    pub pointee: ShapeFn,

    /// Resolve the pointee's storage, or `None` when the pointer is absent.
    pub deref_fn: fn(*const u8) -> Option<NonNull<u8>>,

    /// Rebuild the pointer around `pointee`, overwriting the initialized
    /// pointer value at `dst`. Takes ownership of the pointee allocation,
    /// which must have been made with the pointee shape's layout via the
    /// global allocator.
    pub set_fn: fn(dst: *mut u8, pointee: NonNull<u8>),
}

/// Polymorphic slot holding a concrete value of runtime-determined shape.
pub struct PolyDef {
    /// View the boxed concrete value, or `None` when the slot is empty.
    pub peek_fn: fn(*const u8) -> Option<(&'static Shape, NonNull<u8>)>,

    /// Box `value` (an allocation of `shape`'s layout, ownership
    /// transferred) into the initialized polymorphic value at `dst`,
    /// dropping whatever the slot held before.
    pub put_fn: fn(dst: *mut u8, shape: &'static Shape, value: NonNull<u8>),
}

/// Ordered, dynamically sized, indexable sequence (`Vec<T>`).
pub struct SequenceDef {
    /// Element shape.
    pub elem: ShapeFn,

    /// Whether the sequence is in its absent state (distinct from empty).
    /// Always false for the std containers, which have no absent state.
    pub is_absent_fn: fn(*const u8) -> bool,

    /// Current length.
    pub len_fn: fn(*const u8) -> usize,

    /// Current reserved capacity.
    pub capacity_fn: fn(*const u8) -> usize,

    /// Overwrite the initialized sequence at `dst` with a fresh sequence of
    /// `len` default elements and at least `capacity` reserved slots.
    pub init_fn: fn(dst: *mut u8, len: usize, capacity: usize),

    /// Storage of the element at `index`. Panics when out of bounds.
    pub item_fn: fn(*const u8, index: usize) -> NonNull<u8>,
}

/// Unordered key-value container with unique keys (`HashMap<K, V>`).
pub struct MapDef {
    /// Key shape.
    pub key: ShapeFn,

    /// Value shape.
    pub value: ShapeFn,

    /// Whether the map is in its absent state. Always false for std maps.
    pub is_absent_fn: fn(*const u8) -> bool,

    /// Number of entries.
    pub len_fn: fn(*const u8) -> usize,

    /// Visit every entry; iteration order is undefined.
    pub visit_fn: fn(*const u8, visit: &mut dyn FnMut(NonNull<u8>, NonNull<u8>)),

    /// Insert one entry, reading the key and value out of the given
    /// storage. The caller keeps ownership of the allocations themselves
    /// but must treat their contents as moved.
    pub insert_fn: fn(map: *mut u8, key: NonNull<u8>, value: NonNull<u8>),

    /// Remove the entry for the key at `key` (read by reference).
    pub remove_fn: fn(map: *mut u8, key: NonNull<u8>),
}

/// Structural category of a shape. Exactly one traversal rule applies per
/// kind; the set is closed.
pub enum ShapeKind {
    /// Leaf value with no internal mutable sub-structure.
    Scalar,

    /// Pointer-like indirection.
    Pointer(PointerDef),

    /// Polymorphic container ([`crate::DynValue`]).
    Polymorphic(PolyDef),

    /// Fixed aggregate with named members.
    Struct(StructDef),

    /// Dynamically sized ordered sequence.
    Sequence(SequenceDef),

    /// Associative key-value container.
    Map(MapDef),
}

impl ShapeKind {
    /// Short tag name for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            ShapeKind::Scalar => "scalar",
            ShapeKind::Pointer(_) => "pointer",
            ShapeKind::Polymorphic(_) => "polymorphic",
            ShapeKind::Struct(_) => "struct",
            ShapeKind::Sequence(_) => "sequence",
            ShapeKind::Map(_) => "map",
        }
    }
}

/// Runtime type descriptor.
///
/// One `Shape` exists per concrete type, interned for the lifetime of the
/// process. All engine decisions — which traversal rule applies, how much
/// storage to allocate, how to drop or clone — are made from this
/// descriptor alone.
pub struct Shape {
    /// Type name (diagnostics only).
    pub name: &'static str,

    /// Size and alignment of the type.
    pub layout: Layout,

    /// Structural category plus kind-specific vtable.
    pub kind: ShapeKind,

    /// Shape-level attribute bits.
    pub flags: ShapeFlags,

    /// Default-construct a value of this type in place.
    pub default_fn: DefaultFn,

    /// Drop a value of this type in place. `None` for trivially droppable
    /// types.
    pub drop_fn: Option<DropFn>,

    /// Clone a value of this type. Required for scalar shapes whose payload
    /// is out of line (`INDIRECT`); optional elsewhere.
    pub clone_fn: Option<CloneFn>,
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("kind", &self.kind.tag())
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .field("has_drop", &self.drop_fn.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::shape_of;

    #[test]
    fn test_scalar_shape_metadata() {
        let shape = shape_of::<i32>();
        assert_eq!(shape.layout.size(), 4);
        assert!(matches!(shape.kind, ShapeKind::Scalar));
        assert!(!shape.flags.contains(ShapeFlags::INDIRECT));
        assert!(shape.drop_fn.is_none());
    }

    #[test]
    fn test_string_is_indirect_scalar() {
        let shape = shape_of::<String>();
        assert!(matches!(shape.kind, ShapeKind::Scalar));
        assert!(shape.flags.contains(ShapeFlags::INDIRECT));
        assert!(shape.drop_fn.is_some());
        assert!(shape.clone_fn.is_some());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(shape_of::<i64>().kind.tag(), "scalar");
        assert_eq!(shape_of::<Vec<i32>>().kind.tag(), "sequence");
        assert_eq!(
            shape_of::<std::collections::HashMap<String, i32>>().kind.tag(),
            "map"
        );
        assert_eq!(shape_of::<Option<Box<i32>>>().kind.tag(), "pointer");
    }

    #[test]
    fn test_flag_operations() {
        let flags = ShapeFlags::empty().with(ShapeFlags::INDIRECT);
        assert!(flags.contains(ShapeFlags::INDIRECT));
        assert!(!ShapeFlags::empty().contains(ShapeFlags::INDIRECT));
    }
}
