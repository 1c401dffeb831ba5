//! Repeated fields.
//!
//! Packable elements may arrive as packed runs, one element per record, or
//! any mix of the two. Everything else is one element per record.

use super::{decode_packed_run, ProtoDecode};
use crate::decoder::DecodeContext;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::path::PathSegment;
use crate::table::FieldSpan;
use crate::wire::WireType;

/// Decodes the elements held by `spans`, in order, appending them to `dst`.
pub(crate) fn decode_repeated_spans<'s, T: ProtoDecode>(
    ctx: &DecodeContext<'_>,
    spans: impl Iterator<Item = &'s FieldSpan>,
    dst: &mut Vec<T>,
) -> Result<(), DecodeError> {
    for span in spans {
        if span.wire_type == T::WIRE_TYPE {
            let ctx = ctx.child(PathSegment::Index(dst.len()));
            dst.push(T::decode(&ctx, span.payload.clone())?);
        } else if span.wire_type == WireType::Len && T::WIRE_TYPE.is_packable() {
            decode_packed_run(ctx, span.payload.clone(), dst)?;
        } else {
            let ctx = ctx.child(PathSegment::Index(dst.len()));
            return Err(ctx.error(DecodeErrorKind::UnexpectedWireType {
                expected: T::WIRE_TYPE,
                actual: span.wire_type,
            }));
        }
    }
    Ok(())
}
