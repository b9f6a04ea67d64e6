//! Declaration macros for records, unions and typed errors
//!
//! Generated bindings describe each business type once; these macros turn
//! that description into an [`FfiCodec`](crate::codec::FfiCodec) impl.
//! Field order and discriminants are part of the wire contract.
//!
//! ```
//! use ferry_runtime::{ffi_enum, ffi_record};
//!
//! #[derive(Debug, PartialEq)]
//! struct Fee {
//!     amount_sat: u64,
//!     note: Option<String>,
//! }
//! ffi_record!(Fee { amount_sat, note });
//!
//! #[derive(Debug, PartialEq)]
//! enum SwapState {
//!     Created,
//!     Redeemed { txid: String },
//! }
//! ffi_enum!(SwapState { Created = 1, Redeemed { txid } = 2 });
//! ```

/// Implement `FfiCodec` for a struct as its fields in the listed order
#[macro_export]
macro_rules! ffi_record {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::codec::FfiCodec for $ty {
            fn write(&self, buf: &mut ::std::vec::Vec<u8>) {
                $( $crate::codec::FfiCodec::write(&self.$field, buf); )*
            }

            fn read(
                reader: &mut $crate::codec::ByteReader<'_>,
            ) -> $crate::error::CodecResult<Self> {
                Ok($ty {
                    $( $field: $crate::codec::FfiCodec::read(reader)?, )*
                })
            }
        }
    };
}

/// Implement `FfiCodec` for an enum of unit and struct-like variants
///
/// Each variant is given its 1-based discriminant explicitly.
#[macro_export]
macro_rules! ffi_enum {
    ($ty:ident { $($variant:ident $({ $($field:ident),* $(,)? })? = $idx:literal),+ $(,)? }) => {
        impl $crate::codec::FfiCodec for $ty {
            fn write(&self, buf: &mut ::std::vec::Vec<u8>) {
                match self {
                    $(
                        $ty::$variant $({ $($field),* })? => {
                            $crate::codec::write_discriminant(buf, $idx);
                            $($( $crate::codec::FfiCodec::write($field, buf); )*)?
                        }
                    )+
                }
            }

            fn read(
                reader: &mut $crate::codec::ByteReader<'_>,
            ) -> $crate::error::CodecResult<Self> {
                const VARIANTS: i32 = [$($idx),+].len() as i32;
                match $crate::codec::read_discriminant(reader, stringify!($ty), VARIANTS)? {
                    $(
                        $idx => Ok($ty::$variant $({
                            $( $field: $crate::codec::FfiCodec::read(reader)?, )*
                        })?),
                    )+
                    value => Err($crate::error::CodecError::InvalidDiscriminant {
                        type_name: stringify!($ty),
                        value,
                        variants: VARIANTS,
                    }),
                }
            }
        }
    };
}

/// Implement `FfiCodec` for a typed error enum
///
/// Every variant is a tuple variant holding the message: on the wire the
/// discriminant is followed by the message string.
#[macro_export]
macro_rules! ffi_error {
    ($ty:ident { $($variant:ident = $idx:literal),+ $(,)? }) => {
        impl $crate::codec::FfiCodec for $ty {
            fn write(&self, buf: &mut ::std::vec::Vec<u8>) {
                match self {
                    $(
                        $ty::$variant(message) => {
                            $crate::codec::write_discriminant(buf, $idx);
                            $crate::codec::FfiCodec::write(message, buf);
                        }
                    )+
                }
            }

            fn read(
                reader: &mut $crate::codec::ByteReader<'_>,
            ) -> $crate::error::CodecResult<Self> {
                const VARIANTS: i32 = [$($idx),+].len() as i32;
                let index = $crate::codec::read_discriminant(reader, stringify!($ty), VARIANTS)?;
                let message: ::std::string::String = $crate::codec::FfiCodec::read(reader)?;
                match index {
                    $( $idx => Ok($ty::$variant(message)), )+
                    value => Err($crate::error::CodecError::InvalidDiscriminant {
                        type_name: stringify!($ty),
                        value,
                        variants: VARIANTS,
                    }),
                }
            }
        }
    };
}
