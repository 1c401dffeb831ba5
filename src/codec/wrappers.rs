//! `Box<T>` support, for recursive or large message types.

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode, ProtoType, ValueKind};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, EncodeError};
use crate::wire::WireType;

impl<T: ProtoType> ProtoType for Box<T> {
    const WIRE_TYPE: WireType = T::WIRE_TYPE;
    const KIND: ValueKind = T::KIND;
}

impl<T: ProtoDecode> ProtoDecode for Box<T> {
    #[inline]
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        T::decode(ctx, payload).map(Box::new)
    }
}

impl<T: ProtoEncode> ProtoEncode for Box<T> {
    #[inline]
    fn encode<B: BufMut>(&self, ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        self.as_ref().encode(ctx, buf)
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        self.as_ref().is_proto_default()
    }
}
