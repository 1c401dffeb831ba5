//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev),
//! extended with a nil marker and 1 and 2 byte fixed-width wire types.

use core::num::NonZeroU32;
use core::ops::RangeInclusive;

use bytes::{Buf, BufMut, Bytes};

use crate::error::{DecodeErrorKind, EncodeErrorKind};
use crate::leb128::LebCodec;
use crate::util::{likely, unlikely, CastFrom};

/// Minimum value of a field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;
/// Range of field numbers reserved by Google.
pub const RESERVED_FIELD_NUMBERS: RangeInclusive<u32> = 19000..=19999;
/// Distance between a field number and the field number of its nil marker.
pub const NIL_KEY_SHIFT: u32 = 32767;

static_assertions::const_assert_eq!(NIL_KEY_SHIFT, (1 << 15) - 1);

/// Checks that `field` can be written as a field number.
pub fn validate_field_number(field: u64) -> Result<u32, EncodeErrorKind> {
    let number = match u32::try_from(field) {
        Ok(number) if (MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&number) => number,
        _ => return Err(EncodeErrorKind::FieldNumberOutOfRange { field }),
    };
    if unlikely(RESERVED_FIELD_NUMBERS.contains(&number)) {
        return Err(EncodeErrorKind::ReservedFieldNumber { field: number });
    }
    Ok(number)
}

/// Returns the shifted field number that marks `field` as nil.
pub fn nil_marker_field(field: u32) -> Result<u32, EncodeErrorKind> {
    validate_field_number(u64::from(field) + u64::from(NIL_KEY_SHIFT))
}

/// A decoded field key containing a wire type and field number.
///
/// The layout mirrors the protobuf wire format:
/// * Bits 0-2: wire type (0-7)
/// * Bits 3-31: field number (1 to 2^29-1)
///
/// Since field numbers start at 1 the raw value is never zero.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Tag(NonZeroU32);

impl Tag {
    /// Creates a [`Tag`] from a raw key, validating the field number.
    #[inline]
    fn try_from_raw(raw_key: u64) -> Result<Self, DecodeErrorKind> {
        let raw_key = u32::try_from(raw_key).map_err(|_| DecodeErrorKind::OutOfRange)?;
        let field = raw_key >> 3;
        if unlikely(field < MINIMUM_FIELD_NUMBER || field > MAXIMUM_FIELD_NUMBER) {
            return Err(DecodeErrorKind::OutOfRange);
        }
        let tag = NonZeroU32::new(raw_key).map(Tag).ok_or(DecodeErrorKind::OutOfRange)?;
        if unlikely(tag.wire_type() == WireType::SGroup) {
            return Err(DecodeErrorKind::DeprecatedGroupEncoding);
        }
        Ok(tag)
    }

    /// Returns the [`WireType`] component of this key.
    #[inline]
    pub fn wire_type(self) -> WireType {
        WireType::from_low_bits(self.0.get())
    }

    /// Returns the field number component of this key.
    #[inline]
    pub fn field(self) -> u32 {
        self.0.get() >> 3
    }

    /// Decomposes this key into its [`WireType`] and field number.
    #[inline]
    pub fn into_parts(self) -> (WireType, u32) {
        (self.wire_type(), self.field())
    }
}

impl core::fmt::Debug for Tag {
    #[cold]
    #[inline(never)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tag")
            .field("wire_type", &self.wire_type())
            .field("field", &self.field())
            .finish()
    }
}

/// Encodes the provided field number and wire_type as a field key.
///
/// The caller is responsible for validating `field`, see
/// [`validate_field_number`].
#[inline(always)]
pub fn encode_key<B: BufMut>(wire_type: WireType, field: u32, buf: &mut B) {
    let key = (field << 3) | u32::from(wire_type.into_val());
    key.encode_leb128(buf);
}

/// Returns the encoded length of a field key.
#[inline(always)]
pub fn encoded_key_len(field: u32) -> usize {
    // The wire type only occupies the low 3 bits and never changes the length.
    (field << 3).encoded_leb128_len()
}

/// Decodes a field key from the front of `buf`.
#[inline]
pub fn decode_key<B: Buf>(buf: &mut B) -> Result<Tag, DecodeErrorKind> {
    let chunk = buf.chunk();
    let raw = if likely(!chunk.is_empty() && chunk[0] < 0x80) {
        let raw = u64::from(chunk[0]);
        buf.advance(1);
        raw
    } else {
        u64::decode_leb128_buf(buf)?.0
    };
    Tag::try_from_raw(raw)
}

/// Decodes the length prefix of a length-delimited field.
#[inline(always)]
pub fn decode_len<B: Buf>(buf: &mut B) -> Result<usize, DecodeErrorKind> {
    let chunk = buf.chunk();
    // Fast path, most lengths fit in one byte.
    if likely(!chunk.is_empty() && chunk[0] < 0x80) {
        let len = usize::cast_from(chunk[0]);
        buf.advance(1);
        Ok(len)
    } else {
        let (len, _) = u64::decode_leb128_buf(buf)?;
        usize::try_from(len).map_err(|_| DecodeErrorKind::LengthOverflow { value: len })
    }
}

/// Writes `payload` with its length prefix.
#[inline]
pub fn frame<B: BufMut>(payload: &[u8], buf: &mut B) {
    u64::cast_from(payload.len()).encode_leb128(buf);
    buf.put_slice(payload);
}

/// Reads a length prefix and then exactly that many bytes.
#[inline]
pub fn unframe<B: Buf>(buf: &mut B) -> Result<Bytes, DecodeErrorKind> {
    let len = decode_len(buf)?;
    if unlikely(buf.remaining() < len) {
        return Err(DecodeErrorKind::PrematureEnd);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Splits the payload of one field of type `wire_type` off the front of
/// `buf`. Length-delimited payloads are returned without their prefix.
pub fn take_payload(wire_type: WireType, buf: &mut Bytes) -> Result<Bytes, DecodeErrorKind> {
    let len = match wire_type {
        WireType::Varint => u64::decode_leb128(&buf[..])?.1,
        WireType::Len => return unframe(buf),
        WireType::Nil => 0,
        WireType::SGroup => return Err(DecodeErrorKind::DeprecatedGroupEncoding),
        WireType::I8 | WireType::I16 | WireType::I32 | WireType::I64 => {
            wire_type.fixed_width().unwrap_or_default()
        }
    };
    if unlikely(buf.len() < len) {
        return Err(DecodeErrorKind::PrematureEnd);
    }
    Ok(buf.split_to(len))
}

/// Skips over a field value based on its wire type.
pub fn skip_field<B: Buf>(wire_type: WireType, buf: &mut B) -> Result<(), DecodeErrorKind> {
    let skip_len = match wire_type {
        WireType::Varint => {
            u64::decode_leb128_buf(buf)?;
            return Ok(());
        }
        WireType::Len => decode_len(buf)?,
        WireType::Nil => 0,
        WireType::SGroup => return Err(DecodeErrorKind::DeprecatedGroupEncoding),
        WireType::I8 | WireType::I16 | WireType::I32 | WireType::I64 => {
            wire_type.fixed_width().unwrap_or_default()
        }
    };

    if unlikely(buf.remaining() < skip_len) {
        return Err(DecodeErrorKind::PrematureEnd);
    }
    buf.advance(skip_len);
    Ok(())
}

/// Denotes the type of a field in an encoded message.
///
/// Messages are a series of records consisting of a field number, a
/// [`WireType`], and a payload. The [`WireType`] indicates how large the
/// payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int16`, `int32`, `int64`, `uint16`, `uint32`, `uint64`,
    /// `sint*`, `bool`.
    Varint = 0,
    /// 64-bit little endian.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Length prefixed payload.
    ///
    /// Used for: `string`, `bytes`, messages, packed repeated fields, map
    /// entries and nil tracked arrays.
    Len = 2,
    /// Group start (deprecated), always rejected.
    SGroup = 3,
    /// Nil marker, an empty payload. Occupies the deprecated group end slot.
    Nil = 4,
    /// 32-bit little endian.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
    /// A single raw byte.
    ///
    /// Used for: `u8`, `i8`.
    I8 = 6,
    /// 16-bit little endian.
    ///
    /// Used for: `fixed16`, `sfixed16`.
    I16 = 7,
}

static_assertions::assert_eq_size!(WireType, Result<WireType, ()>);

#[allow(clippy::as_conversions)]
impl WireType {
    const _DISCRIMINANT_CHECK: () = {
        assert!(WireType::Varint as u8 == 0);
        assert!(WireType::I64 as u8 == 1);
        assert!(WireType::Len as u8 == 2);
        assert!(WireType::SGroup as u8 == 3);
        assert!(WireType::Nil as u8 == 4);
        assert!(WireType::I32 as u8 == 5);
        assert!(WireType::I8 as u8 == 6);
        assert!(WireType::I16 as u8 == 7);
    };

    /// Every raw value in `0..8` names a wire type, so this is total.
    #[inline(always)]
    fn from_low_bits(raw: u32) -> Self {
        match raw & 0b111 {
            0 => WireType::Varint,
            1 => WireType::I64,
            2 => WireType::Len,
            3 => WireType::SGroup,
            4 => WireType::Nil,
            5 => WireType::I32,
            6 => WireType::I8,
            _ => WireType::I16,
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }

    /// Size of the payload for fixed-width wire types.
    #[inline]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::I8 => Some(1),
            WireType::I16 => Some(2),
            WireType::I32 => Some(4),
            WireType::I64 => Some(8),
            WireType::Varint | WireType::Len | WireType::SGroup | WireType::Nil => None,
        }
    }

    /// Whether values of this wire type can be concatenated into a packed
    /// repeated field.
    #[inline]
    pub const fn is_packable(self) -> bool {
        matches!(self, WireType::Varint) || self.fixed_width().is_some()
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeErrorKind;

    fn try_from(value: u8) -> Result<Self, DecodeErrorKind> {
        if value > 7 {
            return Err(DecodeErrorKind::OutOfRange);
        }
        Ok(WireType::from_low_bits(u32::from(value)))
    }
}
