//! Message-level types and helpers.

use bytes::{BufMut, Bytes};

use crate::decoder::{DecodeContext, MessageDecoder};
use crate::encoder::{EncodeContext, MessageEncoder};
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};

/// Trait for protobuf message types.
///
/// Usually derived with `#[derive(ProtoMessage)]`. A message visits its
/// fields through the [`MessageEncoder`] and [`MessageDecoder`] it is
/// handed, which own framing, default omission and null tracking.
///
/// Nested messages additionally implement [`ProtoEncode`](super::ProtoEncode)
/// and [`ProtoDecode`](super::ProtoDecode) in terms of [`encode_message`]
/// and [`decode_message`].
pub trait ProtoMessage: Sized {
    /// Encode every field of `self`.
    fn encode_fields(&self, enc: &mut MessageEncoder<'_>) -> Result<(), EncodeError>;

    /// Build a message from the fields in `dec`.
    fn decode_fields(dec: &mut MessageDecoder<'_>) -> Result<Self, DecodeError>;
}

/// Encodes the body of `msg`, without a length prefix, into `buf`.
pub fn encode_message<M: ProtoMessage, B: BufMut>(
    msg: &M,
    ctx: &EncodeContext<'_>,
    buf: &mut B,
) -> Result<(), EncodeError> {
    let mut encoder = MessageEncoder::new(ctx.clone());
    msg.encode_fields(&mut encoder)?;
    buf.put(encoder.finish()?);
    Ok(())
}

/// Decodes a message body, `payload` has no length prefix.
pub fn decode_message<M: ProtoMessage>(
    ctx: &DecodeContext<'_>,
    payload: Bytes,
) -> Result<M, DecodeError> {
    let limit = ctx.options().recursion_limit;
    if ctx.depth() >= limit {
        return Err(ctx.error(DecodeErrorKind::RecursionLimitExceeded { limit }));
    }
    let mut decoder = MessageDecoder::new(ctx.nested(), payload)?;
    M::decode_fields(&mut decoder)
}
