// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![no_std]

//! Provides the [`open_enum`] macro.

/// Defines a wire enum that can hold any value of its storage type.
///
/// The generated type is a `#[repr(transparent)]` newtype over the storage
/// integer with one associated `const` per named variant. Matching on it is
/// always sound, even for values that have no name, which makes it suitable
/// for fields read straight out of firmware structures.
///
/// The macro implements `Copy`, `Clone`, `Debug`, `Eq`, `PartialEq`, `Hash`,
/// `Ord`, `PartialOrd`, conversions to and from the storage type, and a
/// `name()` accessor returning the variant name for known values.
///
/// # Examples
///
/// ```
/// use open_enum::open_enum;
/// open_enum! {
///     pub enum NodeKind: u8 {
///         MEDIA = 4,
///         END = 0x7f,
///     }
/// }
///
/// assert_eq!(NodeKind::from(4u8), NodeKind::MEDIA);
/// assert_eq!(NodeKind::END.name(), Some("END"));
/// assert_eq!(NodeKind(9).name(), None);
/// assert_eq!(format!("{:?}", NodeKind(9)), "9");
/// ```
#[macro_export]
macro_rules! open_enum {
    (
        $(#[$a:meta])*
        $v:vis enum $name:ident : $storage:ty {
            $(#![$implattr:meta])*
            $(
                $(#[$vattr:meta])*
                $variant:ident = $value:expr,
            )*
        }
    ) => {
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        #[repr(transparent)]
        $(#[$a])*
        $v struct $name(pub $storage);
        $(#[$implattr])*
        impl $name {
            $(
                $(#[$vattr])*
                pub const $variant: $name = $name($value);
            )*
        }
        impl $name {
            /// Returns the name of the variant, or `None` for unnamed values.
            #[allow(unreachable_patterns)]
            pub fn name(&self) -> Option<&'static str> {
                match *self {
                    $( Self::$variant => Some(stringify!($variant)), )*
                    _ => None,
                }
            }
        }
        impl ::core::convert::From<$storage> for $name {
            fn from(value: $storage) -> Self {
                Self(value)
            }
        }
        impl ::core::convert::From<$name> for $storage {
            fn from(value: $name) -> Self {
                value.0
            }
        }
        impl ::core::fmt::Debug for $name {
            fn fmt(&self, fmt: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self.name() {
                    Some(s) => fmt.pad(s),
                    None => ::core::fmt::Debug::fmt(&self.0, fmt),
                }
            }
        }
    }
}
