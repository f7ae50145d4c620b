//! Integration tests for copying through private fields
//!
//! Values reached through a private field lose their accessibility bit, so
//! the checked assignment surface refuses them. The copy engine still
//! reproduces them, and the caller-visible descriptors stay untouched.

use mimic_core::value::Reflected;
use mimic_core::{deep_copy, reflect_struct, ReflectError};

mod vault {
    mimic_core::reflect_struct! {
        #[derive(Debug, PartialEq)]
        pub struct Vault {
            pub label: String,
            combination: Vec<u8>,
            owner: String,
        }
    }

    impl Vault {
        pub fn new(label: &str, combination: Vec<u8>, owner: &str) -> Vault {
            Vault {
                label: label.to_string(),
                combination,
                owner: owner.to_string(),
            }
        }

        pub fn combination(&self) -> &[u8] {
            &self.combination
        }

        pub fn owner(&self) -> &str {
            &self.owner
        }
    }
}

use vault::Vault;

#[test]
fn test_private_members_are_copied() {
    let vault = Vault::new("main", vec![1, 2, 3], "alice");
    let copy = deep_copy(&vault);

    assert_eq!(copy.label, "main");
    assert_eq!(copy.combination(), [1, 2, 3]);
    assert_eq!(copy.owner(), "alice");
}

#[test]
fn test_private_member_storage_not_shared() {
    let vault = Vault::new("main", vec![9, 9], "bob");
    let copy = deep_copy(&vault);

    assert_ne!(copy.combination().as_ptr(), vault.combination().as_ptr());
    assert_ne!(copy.owner().as_ptr(), vault.owner().as_ptr());
}

#[test]
fn test_checked_surface_refuses_private_slot() {
    let vault = Vault::new("main", vec![], "carol");
    let view = Reflected::from_ref(&vault);

    // Field 1 is the private combination.
    let private_slot = view.field(1);
    assert!(!private_slot.is_accessible());
    assert!(matches!(
        private_slot.check_assignable(),
        Err(ReflectError::NotAccessible)
    ));
}

#[test]
fn test_copy_does_not_relax_source_descriptors() {
    let vault = Vault::new("main", vec![5], "dave");
    let view = Reflected::from_ref(&vault);
    let before = view.field(2).flags();

    let _ = deep_copy(&vault);

    assert_eq!(view.field(2).flags(), before);
    assert!(!view.field(2).is_accessible());
}

#[test]
fn test_deeply_nested_private_members() {
    reflect_struct! {
        #[derive(Debug, PartialEq)]
        pub struct Outer {
            pub id: u32,
            inner: Vault,
        }
    }

    impl Outer {
        fn inner(&self) -> &Vault {
            &self.inner
        }
    }

    let outer = Outer {
        id: 1,
        inner: Vault::new("nested", vec![4, 2], "erin"),
    };
    let copy = deep_copy(&outer);

    // Private inside private is still fully reproduced.
    assert_eq!(copy.inner().combination(), [4, 2]);
    assert_ne!(
        copy.inner().owner().as_ptr(),
        outer.inner().owner().as_ptr()
    );
}
