//! Reflective value representation
//!
//! The copy engine never operates on static Rust types directly. Every
//! value it touches is viewed through a [`Reflected`]: a three-word
//! descriptor of the value's shape, its storage location, and a small
//! attribute bitmask.
//!
//! ```text
//! ┌──────────────────┬──────────────────┬──────────────────┐
//! │ &'static Shape   │ NonNull<u8> data │ ValueFlags       │
//! │ (type descriptor)│ (storage)        │ (attribute bits) │
//! └──────────────────┴──────────────────┴──────────────────┘
//! ```
//!
//! A `Reflected` is a transient view: it is created for the duration of one
//! recursive copy step and never outlives the call that produced it.

use crate::registry::shape_of;
use crate::reflect::Reflect;
use crate::shape::{FieldFlags, Shape, ShapeFlags, ShapeKind};
use crate::ReflectError;
use std::ptr::NonNull;

/// Per-value attribute bits.
///
/// Accessibility is a property of how a value was *reached*, not of its
/// storage: the same storage viewed through a public path is accessible,
/// and through a private field is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFlags(u8);

impl ValueFlags {
    /// Generic code may normally read/write this value's storage.
    /// Cleared when a value is reached through a private field.
    pub const ACCESSIBLE: ValueFlags = ValueFlags(1 << 0);

    /// The descriptor denotes real backing storage that may be written in
    /// place (as opposed to a detached, read-only view).
    pub const ADDRESSABLE: ValueFlags = ValueFlags(1 << 1);

    /// The value's payload lives out of line; assignment must transfer the
    /// backing data, not just the inline words. Derived from the shape.
    pub const INDIRECT: ValueFlags = ValueFlags(1 << 2);

    /// No flags set.
    pub const fn empty() -> Self {
        ValueFlags(0)
    }

    /// Check whether all bits of `other` are set in `self`.
    pub const fn contains(self, other: ValueFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    pub const fn with(self, other: ValueFlags) -> Self {
        ValueFlags(self.0 | other.0)
    }

    /// `self` with the bits of `other` cleared.
    pub const fn without(self, other: ValueFlags) -> Self {
        ValueFlags(self.0 & !other.0)
    }
}

/// A reflective view of one value: shape descriptor, data location, and
/// attribute bits.
#[derive(Clone, Copy)]
pub struct Reflected {
    shape: &'static Shape,
    data: NonNull<u8>,
    flags: ValueFlags,
}

impl Reflected {
    /// View a borrowed value reflectively.
    ///
    /// The view is accessible but not addressable: it denotes shared
    /// storage that the engine may read but never write, mirroring that a
    /// copy source is only ever read.
    pub fn from_ref<T: Reflect>(value: &T) -> Reflected {
        let data = NonNull::from(value).cast::<u8>();
        // Safety: shape_of::<T>() describes T, and `data` points to a live T.
        unsafe { Reflected::compose(shape_of::<T>(), data, ValueFlags::ACCESSIBLE) }
    }

    /// Assemble a view from raw parts, re-deriving the `INDIRECT` bit from
    /// the shape.
    ///
    /// # Safety
    ///
    /// `data` must point to initialized storage of `shape`'s type, valid
    /// for the lifetime of the returned view. If `flags` claims
    /// `ADDRESSABLE`, the storage must be exclusively writable through this
    /// view.
    pub(crate) unsafe fn compose(
        shape: &'static Shape,
        data: NonNull<u8>,
        flags: ValueFlags,
    ) -> Reflected {
        let mut flags = flags.without(ValueFlags::INDIRECT);
        if shape.flags.contains(ShapeFlags::INDIRECT) {
            flags = flags.with(ValueFlags::INDIRECT);
        }
        Reflected { shape, data, flags }
    }

    /// The value's shape descriptor.
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// The value's storage location.
    pub fn data(&self) -> NonNull<u8> {
        self.data
    }

    /// The value's attribute bits.
    pub fn flags(&self) -> ValueFlags {
        self.flags
    }

    /// Whether generic code may normally write this value.
    pub fn is_accessible(&self) -> bool {
        self.flags.contains(ValueFlags::ACCESSIBLE)
    }

    /// Whether the view denotes writable backing storage.
    pub fn is_addressable(&self) -> bool {
        self.flags.contains(ValueFlags::ADDRESSABLE)
    }

    /// Whether the payload lives out of line.
    pub fn is_indirect(&self) -> bool {
        self.flags.contains(ValueFlags::INDIRECT)
    }

    /// Check that the normal (capability-checked) assignment path would
    /// accept a write to this value.
    pub fn check_assignable(&self) -> Result<(), ReflectError> {
        if !self.is_accessible() {
            return Err(ReflectError::NotAccessible);
        }
        if !self.is_addressable() {
            return Err(ReflectError::NotAddressable);
        }
        Ok(())
    }

    /// A copy of this descriptor with the accessibility bit forced on.
    ///
    /// This is the bit-level half of the raw assignment primitive: it only
    /// relaxes a local copy of the descriptor, never the caller's view, and
    /// never the field's declared visibility.
    pub(crate) fn with_accessible(&self) -> Reflected {
        Reflected {
            shape: self.shape,
            data: self.data,
            flags: self.flags.with(ValueFlags::ACCESSIBLE),
        }
    }

    /// Number of members of a fixed aggregate.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not a struct.
    pub fn field_count(&self) -> usize {
        match &self.shape.kind {
            ShapeKind::Struct(def) => def.fields.len(),
            _ => panic!("field_count() on non-struct shape {}", self.shape.name),
        }
    }

    /// Project the member at `index` of a fixed aggregate.
    ///
    /// The projection inherits this value's flags; reaching through a
    /// private field clears `ACCESSIBLE`.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not a struct or `index` is out of bounds.
    pub fn field(&self, index: usize) -> Reflected {
        let ShapeKind::Struct(def) = &self.shape.kind else {
            panic!("field() on non-struct shape {}", self.shape.name);
        };
        let field = &def.fields[index];
        let mut flags = self.flags;
        if field.flags.contains(FieldFlags::PRIVATE) {
            flags = flags.without(ValueFlags::ACCESSIBLE);
        }
        // Safety: the field offset is within the aggregate's storage and
        // the field shape describes the value stored there.
        unsafe {
            let data = NonNull::new_unchecked(self.data.as_ptr().add(field.offset));
            Reflected::compose((field.shape)(), data, flags)
        }
    }

    /// Project the element at `index` of a sequence.
    ///
    /// Elements inherit the sequence's flags unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not a sequence or `index` is out of bounds.
    pub fn index(&self, index: usize) -> Reflected {
        let ShapeKind::Sequence(def) = &self.shape.kind else {
            panic!("index() on non-sequence shape {}", self.shape.name);
        };
        let data = (def.item_fn)(self.data.as_ptr(), index);
        // Safety: item_fn returned live element storage of the elem shape.
        unsafe { Reflected::compose((def.elem)(), data, self.flags) }
    }
}

impl std::fmt::Debug for Reflected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflected")
            .field("shape", &self.shape.name)
            .field("kind", &self.shape.kind.tag())
            .field("accessible", &self.is_accessible())
            .field("addressable", &self.is_addressable())
            .field("indirect", &self.is_indirect())
            .finish()
    }
}
