//! Encoding and decoding traits for values carried by the wire format.
//!
//! A value knows how to write its payload and read it back. Field keys,
//! length prefixes, default omission and null tracking are the business of
//! [`MessageEncoder`](crate::MessageEncoder) and
//! [`MessageDecoder`](crate::MessageDecoder).

mod delimited;
mod fixed;
mod map;
mod message;
mod nullable;
mod oneof;
mod packed;
mod repeated;
mod scalar;
mod wrappers;

use bytes::{BufMut, Bytes};

use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, EncodeError};
use crate::wire::WireType;

/// Broad category of a value, used to enforce which values may key a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Bool,
    Float,
    String,
    Bytes,
    Message,
    /// A whole array carried in one record, such as a nil tracked array.
    List,
}

impl ValueKind {
    /// Map keys are restricted to integers, booleans and strings.
    pub const fn is_valid_map_key(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Bool | ValueKind::String)
    }
}

pub trait ProtoType: Sized {
    /// The wire type used to encode this type.
    const WIRE_TYPE: WireType;
    /// The category this type belongs to.
    const KIND: ValueKind;
}

/// A type that can be encoded to the wire format.
pub trait ProtoEncode: ProtoType {
    /// Write the payload of this value.
    ///
    /// Length-delimited values write their content without the length
    /// prefix; the caller frames it.
    fn encode<B: BufMut>(&self, ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError>;

    /// Returns true if this value is the default for its type.
    ///
    /// Length-delimited values whose payload comes out empty are treated as
    /// default as well, so messages can rely on the provided `false`.
    fn is_proto_default(&self) -> bool {
        false
    }
}

/// A type that can be decoded from the wire format.
pub trait ProtoDecode: ProtoType {
    /// Decode a value from exactly one payload.
    ///
    /// Length-delimited payloads arrive without their length prefix.
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError>;

    /// Fold a later occurrence of the same field into `self`.
    ///
    /// The provided implementation keeps the later value.
    fn merge(&mut self, ctx: &DecodeContext<'_>, payload: Bytes) -> Result<(), DecodeError> {
        *self = Self::decode(ctx, payload)?;
        Ok(())
    }
}

pub use delimited::ProtoString;
pub use fixed::{FixedWidth, Fixed16, Fixed32, Fixed64, Sfixed16, Sfixed32, Sfixed64};
pub use map::ProtoMap;
pub use message::{decode_message, encode_message, ProtoMessage};
pub use nullable::{decode_nil_array, encode_nil_array};
pub use oneof::{OneofDecoder, OneofEncoder, ProtoOneof};
pub use scalar::{
    zigzag_decode_16, zigzag_decode_32, zigzag_decode_64, zigzag_encode_16, zigzag_encode_32,
    zigzag_encode_64, Sint16, Sint32, Sint64,
};

pub(crate) use map::{decode_entry, encode_entry};
pub(crate) use packed::{decode_packed_run, encode_packed};
pub(crate) use repeated::decode_repeated_spans;
