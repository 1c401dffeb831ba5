//! Packed repeated fields: one `Len` record holding the raw payloads of
//! every element back to back.

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::path::PathSegment;
use crate::util::unlikely;
use crate::wire::{take_payload, WireType};

/// Writes the payload of every element of `values`, without keys.
///
/// Only meaningful for packable element types, see
/// [`WireType::is_packable`].
pub(crate) fn encode_packed<T: ProtoEncode, B: BufMut>(
    ctx: &EncodeContext<'_>,
    values: &[T],
    buf: &mut B,
) -> Result<(), EncodeError> {
    for (idx, value) in values.iter().enumerate() {
        value.encode(&ctx.child(PathSegment::Index(idx)), buf)?;
    }
    Ok(())
}

/// Splits a packed run into elements, appending them to `dst`.
///
/// `ctx` is the context of the repeated field; elements are indexed from
/// `dst.len()` so runs spread over several records keep counting.
pub(crate) fn decode_packed_run<T: ProtoDecode>(
    ctx: &DecodeContext<'_>,
    payload: Bytes,
    dst: &mut Vec<T>,
) -> Result<(), DecodeError> {
    match T::WIRE_TYPE.fixed_width() {
        Some(width) => decode_fixed_run(ctx, width, payload, dst),
        None => decode_varint_run(ctx, payload, dst),
    }
}

fn decode_fixed_run<T: ProtoDecode>(
    ctx: &DecodeContext<'_>,
    width: usize,
    payload: Bytes,
    dst: &mut Vec<T>,
) -> Result<(), DecodeError> {
    let len = payload.len();
    if unlikely(len % width != 0) {
        return Err(ctx.error(DecodeErrorKind::InvalidSize { width, actual: len }));
    }

    dst.reserve(len / width);
    for start in (0..len).step_by(width) {
        let ctx = ctx.child(PathSegment::Index(dst.len()));
        dst.push(T::decode(&ctx, payload.slice(start..start + width))?);
    }
    Ok(())
}

fn decode_varint_run<T: ProtoDecode>(
    ctx: &DecodeContext<'_>,
    mut payload: Bytes,
    dst: &mut Vec<T>,
) -> Result<(), DecodeError> {
    while !payload.is_empty() {
        let ctx = ctx.child(PathSegment::Index(dst.len()));
        let element = take_payload(WireType::Varint, &mut payload).map_err(|kind| ctx.error(kind))?;
        dst.push(T::decode(&ctx, element)?);
    }
    Ok(())
}
