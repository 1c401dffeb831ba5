//! Arrays with null elements.
//!
//! The payload starts with a nil index set, a varint count followed by the
//! strictly increasing positions of the null elements, and continues with
//! the non-null values in order. Packable values are written raw, all
//! others carry their own length prefix.
//!
//! ```text
//! [nil_count] [nil_index]* [value]*
//! ```
//!
//! An empty array still writes its count, so it never reads back as an
//! absent field.

use bytes::{BufMut, Bytes, BytesMut};

use super::{ProtoDecode, ProtoEncode, ProtoType, ValueKind};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::leb128::LebCodec;
use crate::path::PathSegment;
use crate::util::{unlikely, CastFrom};
use crate::wire::{frame, take_payload, WireType};

/// Encodes `values` as a nil index set followed by the non-null values.
pub fn encode_nil_array<T: ProtoEncode, B: BufMut>(
    ctx: &EncodeContext<'_>,
    values: &[Option<T>],
    buf: &mut B,
) -> Result<(), EncodeError> {
    let nil_count = values.iter().filter(|value| value.is_none()).count();
    u64::cast_from(nil_count).encode_leb128(buf);
    for (idx, value) in values.iter().enumerate() {
        if value.is_none() {
            u64::cast_from(idx).encode_leb128(buf);
        }
    }

    let framed = !T::WIRE_TYPE.is_packable();
    let mut scratch = BytesMut::new();
    for (idx, value) in values.iter().enumerate() {
        let Some(value) = value else {
            continue;
        };
        let ctx = ctx.child(PathSegment::Index(idx));
        if framed {
            scratch.clear();
            value.encode(&ctx, &mut scratch)?;
            frame(&scratch, buf);
        } else {
            value.encode(&ctx, buf)?;
        }
    }
    Ok(())
}

/// Decodes a payload written by [`encode_nil_array`].
pub fn decode_nil_array<T: ProtoDecode>(
    ctx: &DecodeContext<'_>,
    mut payload: Bytes,
) -> Result<Vec<Option<T>>, DecodeError> {
    let nil_count = read_varint(ctx, &mut payload)?;

    // Every index takes at least one byte.
    let capacity = usize::try_from(nil_count).unwrap_or(usize::MAX).min(payload.len());
    let mut nils = Vec::with_capacity(capacity);
    let mut previous = None;
    for _ in 0..nil_count {
        let index = read_varint(ctx, &mut payload)?;
        if unlikely(previous.is_some_and(|previous| index <= previous)) {
            return Err(ctx.error(DecodeErrorKind::InvalidNilIndex { index }));
        }
        previous = Some(index);
        nils.push(index);
    }

    let element_wire_type = if T::WIRE_TYPE.is_packable() {
        T::WIRE_TYPE
    } else {
        WireType::Len
    };

    let mut values = Vec::with_capacity(nils.len());
    let mut nils = nils.into_iter().peekable();
    let mut position = 0u64;
    loop {
        if nils.next_if_eq(&position).is_some() {
            values.push(None);
        } else if payload.is_empty() {
            break;
        } else {
            let ctx = ctx.child(PathSegment::Index(values.len()));
            let element =
                take_payload(element_wire_type, &mut payload).map_err(|kind| ctx.error(kind))?;
            values.push(Some(T::decode(&ctx, element)?));
        }
        position += 1;
    }

    // Positions past the last element.
    if let Some(index) = nils.next() {
        return Err(ctx.error(DecodeErrorKind::InvalidNilIndex { index }));
    }
    Ok(values)
}

fn read_varint(ctx: &DecodeContext<'_>, payload: &mut Bytes) -> Result<u64, DecodeError> {
    let (value, _) = u64::decode_leb128_buf(payload).map_err(|kind| ctx.error(kind))?;
    Ok(value)
}

impl<T: ProtoType> ProtoType for Vec<Option<T>> {
    const WIRE_TYPE: WireType = WireType::Len;
    const KIND: ValueKind = ValueKind::List;
}

impl<T: ProtoEncode> ProtoEncode for Vec<Option<T>> {
    fn encode<B: BufMut>(&self, ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        encode_nil_array(ctx, self, buf)
    }
}

impl<T: ProtoDecode> ProtoDecode for Vec<Option<T>> {
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        decode_nil_array(ctx, payload)
    }

    /// Each record carries its own nil index set, later records append.
    fn merge(&mut self, ctx: &DecodeContext<'_>, payload: Bytes) -> Result<(), DecodeError> {
        self.extend(decode_nil_array::<T>(ctx, payload)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Sint32;
    use crate::{Decoder, Encoder};

    fn encode_array<T: ProtoEncode>(values: &[Option<T>]) -> Vec<u8> {
        let encoder = Encoder::default();
        let mut buf = Vec::new();
        encode_nil_array(&encoder.context(), values, &mut buf).unwrap();
        buf
    }

    fn decode_array<T: ProtoDecode>(payload: &[u8]) -> Result<Vec<Option<T>>, DecodeError> {
        let decoder = Decoder::default();
        decode_nil_array(&decoder.context(), Bytes::copy_from_slice(payload))
    }

    #[test]
    fn test_nil_index_set_sample() {
        let values = vec![Some(0u8), None, Some(255u8)];
        let bytes = encode_array(&values);
        assert_eq!(bytes, [1, 1, 0, 255]);
        assert_eq!(decode_array::<u8>(&bytes).unwrap(), values);
    }

    #[test]
    fn test_empty_array_keeps_count() {
        assert_eq!(encode_array::<u32>(&[]), [0]);
        assert_eq!(decode_array::<u32>(&[0]).unwrap(), vec![]);
    }

    #[test]
    fn test_all_nil_and_trailing_nil() {
        let values: Vec<Option<u32>> = vec![None, None];
        let bytes = encode_array(&values);
        assert_eq!(bytes, [2, 0, 1]);
        assert_eq!(decode_array::<u32>(&bytes).unwrap(), values);

        let values = vec![Some(Sint32(-1)), None];
        let bytes = encode_array(&values);
        assert_eq!(bytes, [1, 1, 1]);
        assert_eq!(decode_array::<Sint32>(&bytes).unwrap(), values);
    }

    #[test]
    fn test_framed_values() {
        let values = vec![None, Some("ab".to_string()), Some(String::new())];
        let bytes = encode_array(&values);
        assert_eq!(bytes, [1, 0, 2, b'a', b'b', 0]);
        assert_eq!(decode_array::<String>(&bytes).unwrap(), values);
    }

    #[test]
    fn test_invalid_nil_indices() {
        // Not strictly increasing.
        let err = decode_array::<u8>(&[2, 1, 1, 7]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidNilIndex { index: 1 });

        // Past the end of the array.
        let err = decode_array::<u8>(&[1, 5, 7]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidNilIndex { index: 5 });

        // Count larger than the indices present.
        let err = decode_array::<u8>(&[3, 0]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::PrematureEnd);
    }

    #[test]
    fn test_as_value() {
        let values = vec![Some(1u32), None];
        assert!(!values.is_proto_default());
        assert!(!Vec::<Option<u32>>::new().is_proto_default());
    }
}
