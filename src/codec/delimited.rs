//! Length-delimited types (bytes, string).

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode, ProtoType, ValueKind};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::wire::WireType;

/// UTF-8 string that shares the decoded buffer instead of copying out of it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ProtoString(Bytes);

impl ProtoString {
    /// Returns the string as a `&str`.
    pub fn as_str(&self) -> &str {
        // Every constructor either starts from a `str` or validates the bytes.
        core::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the ProtoString and returns the underlying Bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl core::ops::Deref for ProtoString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl From<&str> for ProtoString {
    fn from(s: &str) -> Self {
        ProtoString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for ProtoString {
    fn from(s: String) -> Self {
        ProtoString(Bytes::from(s))
    }
}

impl TryFrom<Bytes> for ProtoString {
    type Error = DecodeErrorKind;

    fn try_from(data: Bytes) -> Result<Self, Self::Error> {
        if core::str::from_utf8(&data).is_err() {
            return Err(DecodeErrorKind::InvalidString);
        }
        Ok(ProtoString(data))
    }
}

impl ProtoType for ProtoString {
    const WIRE_TYPE: WireType = WireType::Len;
    const KIND: ValueKind = ValueKind::String;
}

impl ProtoDecode for ProtoString {
    #[inline]
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        ProtoString::try_from(payload).map_err(|kind| ctx.error(kind))
    }
}

impl ProtoEncode for ProtoString {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_slice(&self.0);
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl ProtoType for String {
    const WIRE_TYPE: WireType = WireType::Len;
    const KIND: ValueKind = ValueKind::String;
}

impl ProtoDecode for String {
    #[inline]
    fn decode(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        String::from_utf8(payload.to_vec())
            .map_err(|_| ctx.error(DecodeErrorKind::InvalidString))
    }
}

impl ProtoEncode for String {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        self.is_empty()
    }
}

impl ProtoType for Bytes {
    const WIRE_TYPE: WireType = WireType::Len;
    const KIND: ValueKind = ValueKind::Bytes;
}

impl ProtoDecode for Bytes {
    #[inline]
    fn decode(_ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        Ok(payload)
    }
}

impl ProtoEncode for Bytes {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_slice(self);
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        self.is_empty()
    }
}

/// `Vec<u8>` is a bytes value. Repeated `u8` fields go through
/// [`MessageEncoder::repeated`](crate::MessageEncoder::repeated) instead.
impl ProtoType for Vec<u8> {
    const WIRE_TYPE: WireType = WireType::Len;
    const KIND: ValueKind = ValueKind::Bytes;
}

impl ProtoDecode for Vec<u8> {
    #[inline]
    fn decode(_ctx: &DecodeContext<'_>, payload: Bytes) -> Result<Self, DecodeError> {
        Ok(payload.to_vec())
    }
}

impl ProtoEncode for Vec<u8> {
    #[inline]
    fn encode<B: BufMut>(&self, _ctx: &EncodeContext<'_>, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_slice(self);
        Ok(())
    }

    #[inline]
    fn is_proto_default(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decoder;

    #[test]
    fn test_invalid_utf8() {
        let decoder = Decoder::default();
        let ctx = decoder.context();

        let invalid = Bytes::from_static(&[0xC3, 0x28]);
        let err = String::decode(&ctx, invalid.clone()).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidString);

        let err = ProtoString::decode(&ctx, invalid.clone()).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidString);

        // Raw bytes accept anything.
        assert_eq!(Bytes::decode(&ctx, invalid.clone()).unwrap(), invalid);
    }

    #[test]
    fn test_proto_string_shares_buffer() {
        let decoder = Decoder::default();
        let payload = Bytes::from_static("héllo".as_bytes());
        let decoded = ProtoString::decode(&decoder.context(), payload.clone()).unwrap();
        assert_eq!(decoded.as_str(), "héllo");
        assert_eq!(decoded.into_bytes().as_ptr(), payload.as_ptr());
    }
}
