//! Struct reflection macro

/// Define a struct and implement [`crate::Reflect`] for it.
///
/// The macro records each field's offset and visibility in the shape
/// descriptor. Fields declared `pub` stay accessible through reflection;
/// all other fields are marked `PRIVATE` and values reached through them
/// lose their accessibility bit (restricted visibilities such as
/// `pub(crate)` are not supported — a field is either `pub` or private).
/// Generic structs are not supported.
///
/// ```
/// mimic_core::reflect_struct! {
///     pub struct Point {
///         pub x: i32,
///         pub y: i32,
///     }
/// }
///
/// let p = Point { x: 1, y: 2 };
/// let q = mimic_core::deep_copy(&p);
/// assert_eq!((q.x, q.y), (1, 2));
/// ```
#[macro_export]
macro_rules! reflect_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($body)*
        }

        $crate::reflect_struct!(@fields $name; [] $($body)*);
    };

    // Public field followed by more fields.
    (@fields $name:ident; [$($acc:tt)*]
        $(#[$fmeta:meta])* pub $fname:ident : $fty:ty , $($rest:tt)*
    ) => {
        $crate::reflect_struct!(@fields $name; [$($acc)* ($fname, $fty, PUBLIC)] $($rest)*);
    };

    // Trailing public field.
    (@fields $name:ident; [$($acc:tt)*]
        $(#[$fmeta:meta])* pub $fname:ident : $fty:ty
    ) => {
        $crate::reflect_struct!(@fields $name; [$($acc)* ($fname, $fty, PUBLIC)]);
    };

    // Private field followed by more fields.
    (@fields $name:ident; [$($acc:tt)*]
        $(#[$fmeta:meta])* $fname:ident : $fty:ty , $($rest:tt)*
    ) => {
        $crate::reflect_struct!(@fields $name; [$($acc)* ($fname, $fty, PRIVATE)] $($rest)*);
    };

    // Trailing private field.
    (@fields $name:ident; [$($acc:tt)*]
        $(#[$fmeta:meta])* $fname:ident : $fty:ty
    ) => {
        $crate::reflect_struct!(@fields $name; [$($acc)* ($fname, $fty, PRIVATE)]);
    };

    // All fields collected: emit the impl.
    (@fields $name:ident; [$(($fname:ident, $fty:ty, $fkind:ident))*]) => {
        // Safety: offsets come from offset_of! on the declared struct and
        // every vtable entry operates on real values of it.
        unsafe impl $crate::Reflect for $name {
            fn build_shape() -> $crate::Shape {
                fn default_in_place(ptr: *mut u8) {
                    let _ = ptr;
                    $(
                        ($crate::shape_of::<$fty>().default_fn)(
                            // Safety: field offset within the aggregate.
                            unsafe { ptr.add(::core::mem::offset_of!($name, $fname)) },
                        );
                    )*
                }

                let fields: &'static [$crate::shape::FieldDef] =
                    ::std::boxed::Box::leak(::std::vec![
                        $(
                            $crate::shape::FieldDef {
                                name: ::core::stringify!($fname),
                                offset: ::core::mem::offset_of!($name, $fname),
                                shape: $crate::shape_of::<$fty>,
                                flags: $crate::shape::FieldFlags::$fkind,
                            },
                        )*
                    ].into_boxed_slice());

                $crate::Shape {
                    name: ::core::stringify!($name),
                    layout: ::core::alloc::Layout::new::<$name>(),
                    kind: $crate::shape::ShapeKind::Struct(
                        $crate::shape::StructDef { fields },
                    ),
                    flags: $crate::shape::ShapeFlags::empty(),
                    default_fn: default_in_place,
                    drop_fn: ::core::option::Option::Some(
                        $crate::reflect::drop_raw::<$name>,
                    ),
                    clone_fn: ::core::option::Option::None,
                }
            }
        }
    };
}
