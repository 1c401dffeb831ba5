//! Varint scalar types and their encoding/decoding implementations.

// Sign extension and zig-zag rely on `as` casts between equal-width integers.
#![allow(clippy::as_conversions)]

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode, ProtoType, ValueKind};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::leb128::LebCodec;
use crate::wire::WireType;

/// Read the single varint that makes up `payload`.
#[inline]
fn read_varint(ctx: &DecodeContext<'_>, payload: &[u8]) -> Result<u64, DecodeError> {
    let (value, _) = u64::decode_leb128(payload).map_err(|kind| ctx.error(kind))?;
    Ok(value)
}

#[inline]
fn narrow<T: TryFrom<i64>>(
    ctx: &DecodeContext<'_>,
    value: i64,
    target_type: &'static str,
) -> Result<T, DecodeError> {
    T::try_from(value).map_err(|_| ctx.error(DecodeErrorKind::IntegerOverflow { target_type }))
}

impl ProtoType for u64 {
    const WIRE_TYPE: WireType = WireType::Varint;
    const KIND: ValueKind = ValueKind::Integer;
}

impl ProtoDecode for u64 {
    #[inline]
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        read_varint(ctx, &payload)
    }
}

impl ProtoEncode for u64 {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        self.encode_leb128(buf);
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        *self == 0
    }
}

/// Unsigned integers narrower than 64 bits, encoded as a plain varint.
macro_rules! impl_unsigned_varint {
    ($($ty:ty),+ $(,)?) => {$(
        impl ProtoType for $ty {
            const WIRE_TYPE: WireType = WireType::Varint;
            const KIND: ValueKind = ValueKind::Integer;
        }

        impl ProtoDecode for $ty {
            #[inline]
            fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
                let value = read_varint(ctx, &payload)?;
                <$ty>::try_from(value).map_err(|_| {
                    ctx.error(DecodeErrorKind::IntegerOverflow { target_type: stringify!($ty) })
                })
            }
        }

        impl ProtoEncode for $ty {
            #[inline]
            fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
                u64::from(*self).encode_leb128(buf);
                Ok(())
            }

            #[inline]
            fn is_proto_default(&self) -> bool {
                *self == 0
            }
        }
    )+};
}

/// Signed integers, sign-extended to 64 bits and encoded as a varint.
///
/// Negative values always take 10 bytes, use the `Sint*` wrappers for
/// values that are often negative.
macro_rules! impl_signed_varint {
    ($($ty:ty),+ $(,)?) => {$(
        impl ProtoType for $ty {
            const WIRE_TYPE: WireType = WireType::Varint;
            const KIND: ValueKind = ValueKind::Integer;
        }

        /// Decoding is strict: a varint outside the range of the type fails
        /// with [`DecodeErrorKind::IntegerOverflow`] instead of being
        /// truncated. An `i32` of -1 written as the 5-byte varint
        /// `FF FF FF FF 0F` is rejected, only the sign-extended 10-byte form
        /// is accepted.
        impl ProtoDecode for $ty {
            #[inline]
            fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
                let value = read_varint(ctx, &payload)? as i64;
                narrow(ctx, value, stringify!($ty))
            }
        }

        impl ProtoEncode for $ty {
            #[inline]
            fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
                (i64::from(*self) as u64).encode_leb128(buf);
                Ok(())
            }

            #[inline]
            fn is_proto_default(&self) -> bool {
                *self == 0
            }
        }
    )+};
}

impl_unsigned_varint!(u16, u32);
impl_signed_varint!(i16, i32, i64);

impl ProtoType for bool {
    const WIRE_TYPE: WireType = WireType::Varint;
    const KIND: ValueKind = ValueKind::Bool;
}

impl ProtoDecode for bool {
    #[inline]
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        Ok(read_varint(ctx, &payload)? != 0)
    }
}

impl ProtoEncode for bool {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_u8(u8::from(*self));
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        !*self
    }
}

#[inline]
pub const fn zigzag_encode_16(n: i16) -> u16 {
    ((n << 1) ^ (n >> 15)) as u16
}

#[inline]
pub const fn zigzag_decode_16(n: u16) -> i16 {
    ((n >> 1) as i16) ^ (-((n & 1) as i16))
}

#[inline]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[inline]
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Zig-zag encoded signed integer wrappers, protobuf's `sint*` types.
macro_rules! impl_zigzag {
    ($($(#[$meta:meta])* $name:ident($inner:ty, $unsigned:ty) => $encode:ident, $decode:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl core::ops::Deref for $name {
            type Target = $inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                $name(value)
            }
        }

        impl ProtoType for $name {
            const WIRE_TYPE: WireType = WireType::Varint;
            const KIND: ValueKind = ValueKind::Integer;
        }

        impl ProtoDecode for $name {
            #[inline]
            fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
                let raw = read_varint(ctx, &payload)?;
                let raw = <$unsigned>::try_from(raw).map_err(|_| {
                    ctx.error(DecodeErrorKind::IntegerOverflow { target_type: stringify!($inner) })
                })?;
                Ok($name($decode(raw)))
            }
        }

        impl ProtoEncode for $name {
            #[inline]
            fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
                u64::from($encode(self.0)).encode_leb128(buf);
                Ok(())
            }

            #[inline]
            fn is_proto_default(&self) -> bool {
                self.0 == 0
            }
        }
    )+};
}

impl_zigzag! {
    /// Zig-zag encoded signed 16-bit integer.
    Sint16(i16, u16) => zigzag_encode_16, zigzag_decode_16;
    /// Wrapper for protobuf `sint32` (zigzag-encoded signed 32-bit integer).
    Sint32(i32, u32) => zigzag_encode_32, zigzag_decode_32;
    /// Wrapper for protobuf `sint64` (zigzag-encoded signed 64-bit integer).
    Sint64(i64, u64) => zigzag_encode_64, zigzag_decode_64;
}
