//! Mimic core: reflective structural deep copy
//!
//! This crate produces an independent copy of an arbitrary reflectable
//! value: scalars, pointer-like indirections, fixed aggregates, sequences,
//! associative maps, and polymorphic slots. No mutable storage is shared
//! between the original and the copy — including storage reachable only
//! through fields a type keeps private.
//!
//! Two tightly coupled pieces form the core:
//!
//! - **Traversal engine** ([`deep_copy`], [`copy_dyn`]): a recursive
//!   dispatcher over shape descriptors.
//! - **Raw assignment primitive** (crate-private): the terminal write of
//!   every traversal branch, able to write through descriptor-level access
//!   protection by clearing the accessibility bit on a local copy of the
//!   destination descriptor.
//!
//! # Example
//!
//! ```
//! use mimic_core::deep_copy;
//!
//! mimic_core::reflect_struct! {
//!     pub struct Account {
//!         pub id: i64,
//!         secret: String,
//!         pub tags: Vec<String>,
//!     }
//! }
//!
//! let account = Account {
//!     id: 7,
//!     secret: "x".to_string(),
//!     tags: vec!["a".to_string(), "b".to_string()],
//! };
//!
//! let mut copy = deep_copy(&account);
//! copy.tags.push("c".to_string());
//!
//! assert_eq!(copy.id, 7);
//! assert_eq!(copy.secret, "x"); // private member copied too
//! assert_eq!(account.tags.len(), 2); // source unaffected
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod assign;
pub mod copy;
pub mod dynamic;
mod macros;
mod owned;
pub mod reflect;
pub mod registry;
pub mod shape;
pub mod value;

pub use copy::{copy_dyn, deep_copy};
pub use dynamic::DynValue;
pub use reflect::Reflect;
pub use registry::shape_of;
pub use shape::{Shape, ShapeKind};
pub use value::{Reflected, ValueFlags};

/// Errors reported by the checked reflection surfaces.
///
/// The copy engine itself never returns these: a benign absence is an
/// early return and a violated precondition is fatal. They surface from
/// the public capability checks ([`Reflected::check_assignable`]).
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// The value was reached through a private field and the normal
    /// assignment path refuses to write it.
    #[error("value is not accessible")]
    NotAccessible,

    /// The descriptor does not denote writable backing storage.
    #[error("value is not addressable")]
    NotAddressable,
}
