//! Fixed-width little endian types.

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode, ProtoType, ValueKind};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::wire::WireType;

/// Primitives with a fixed size little endian representation.
pub trait FixedWidth: Sized + Copy {
    /// Number of bytes in the encoded form.
    const WIDTH: usize;

    fn put_le<B: BufMut>(self, buf: &mut B);

    /// Read a value from exactly [`FixedWidth::WIDTH`] bytes.
    fn read_le(data: &[u8]) -> Result<Self, DecodeErrorKind>;
}

macro_rules! impl_fixed_width {
    ($($ty:ty => $width:literal),+ $(,)?) => {$(
        impl FixedWidth for $ty {
            const WIDTH: usize = $width;

            #[inline(always)]
            fn put_le<B: BufMut>(self, buf: &mut B) {
                buf.put_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(data: &[u8]) -> Result<Self, DecodeErrorKind> {
                let bytes: [u8; $width] = data
                    .try_into()
                    .map_err(|_| DecodeErrorKind::InvalidSize { width: $width, actual: data.len() })?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        }
    )+};
}

impl_fixed_width! {
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4, f32 => 4,
    u64 => 8, i64 => 8, f64 => 8,
}

/// Types whose payload is the raw little endian bytes of a primitive.
///
/// `$wrap`/`$unwrap` convert between the Rust type and the primitive.
macro_rules! impl_fixed_proto {
    ($($ty:ty as $prim:ty => $wire:ident, $kind:ident, |$v:ident| $unwrap:expr, |$p:ident| $wrap:expr;)+) => {$(
        impl ProtoType for $ty {
            const WIRE_TYPE: WireType = WireType::$wire;
            const KIND: ValueKind = ValueKind::$kind;
        }

        impl ProtoDecode for $ty {
            #[inline]
            fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
                let $p = <$prim as FixedWidth>::read_le(&payload).map_err(|kind| ctx.error(kind))?;
                Ok($wrap)
            }
        }

        impl ProtoEncode for $ty {
            #[inline]
            fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
                let $v = self;
                FixedWidth::put_le($unwrap, buf);
                Ok(())
            }

            #[inline]
            fn is_proto_default(&self) -> bool {
                let $v = self;
                let prim: $prim = $unwrap;
                prim == <$prim>::default()
            }
        }
    )+};
}

/// Wrapper for a little-endian unsigned 16-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed16(pub u16);

/// Wrapper for a little-endian signed 16-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Sfixed16(pub i16);

/// Wrapper for protobuf `fixed32` (little-endian unsigned 32-bit integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed32(pub u32);

/// Wrapper for protobuf `sfixed32` (little-endian signed 32-bit integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Sfixed32(pub i32);

/// Wrapper for protobuf `fixed64` (little-endian unsigned 64-bit integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed64(pub u64);

/// Wrapper for protobuf `sfixed64` (little-endian signed 64-bit integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Sfixed64(pub i64);

macro_rules! impl_deref {
    ($($name:ident => $inner:ty),+ $(,)?) => {$(
        impl core::ops::Deref for $name {
            type Target = $inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    )+};
}

impl_deref! {
    Fixed16 => u16, Sfixed16 => i16,
    Fixed32 => u32, Sfixed32 => i32,
    Fixed64 => u64, Sfixed64 => i64,
}

impl_fixed_proto! {
    u8 as u8 => I8, Integer, |v| *v, |p| p;
    i8 as i8 => I8, Integer, |v| *v, |p| p;
    Fixed16 as u16 => I16, Integer, |v| v.0, |p| Fixed16(p);
    Sfixed16 as i16 => I16, Integer, |v| v.0, |p| Sfixed16(p);
    Fixed32 as u32 => I32, Integer, |v| v.0, |p| Fixed32(p);
    Sfixed32 as i32 => I32, Integer, |v| v.0, |p| Sfixed32(p);
    Fixed64 as u64 => I64, Integer, |v| v.0, |p| Fixed64(p);
    Sfixed64 as i64 => I64, Integer, |v| v.0, |p| Sfixed64(p);
    f32 as f32 => I32, Float, |v| *v, |p| p;
    f64 as f64 => I64, Float, |v| *v, |p| p;
}
