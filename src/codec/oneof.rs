//! Oneof field support for protobuf.
//!
//! Protobuf oneofs map naturally to Rust enums. This module provides the
//! [`ProtoOneof`] trait for oneof encode/decode.
//!
//! # Wire Format
//!
//! Oneofs have no wire representation of their own. Each variant is encoded
//! as a regular field with its own tag. Encoding insists on exactly one
//! case, decoding takes whichever case appears last in the message.
//!
//! # Example
//!
//! ```ignore
//! // Given protobuf:
//! // message Foo {
//! //   oneof widget {
//! //     int32 quux = 1;
//! //     string bar = 2;
//! //   }
//! // }
//!
//! #[derive(ProtoOneof)]
//! pub enum Widget {
//!     #[proto(tag = 1)]
//!     Quux(i32),
//!     #[proto(tag = 2)]
//!     Bar(ProtoString),
//! }
//!
//! // In the message:
//! pub struct Foo {
//!     #[proto(oneof, tags = "1, 2")]
//!     pub widget: Option<Widget>,
//! }
//! ```

use super::{ProtoDecode, ProtoEncode};
use crate::decoder::{decode_spans, DecodeContext};
use crate::encoder::{FieldKey, MessageEncoder};
use crate::error::{DecodeError, EncodeError, EncodeErrorKind};
use crate::table::FieldSpan;

/// Trait for protobuf oneof types.
///
/// Oneofs are represented as Rust enums where each variant corresponds to
/// a possible field.
pub trait ProtoOneof: Sized {
    /// Field numbers of every case.
    const TAGS: &'static [u32];

    /// Encode the active case through `enc`.
    fn encode_case(&self, enc: &mut OneofEncoder<'_, '_>) -> Result<(), EncodeError>;

    /// Decode the case stored under `field`.
    ///
    /// Returns `Ok(None)` if `field` is not one of [`ProtoOneof::TAGS`].
    fn decode_case(field: u32, dec: &mut OneofDecoder<'_>) -> Result<Option<Self>, DecodeError>;
}

/// Encoding scope of one oneof, accepts exactly one case.
pub struct OneofEncoder<'e, 'a> {
    enc: &'e mut MessageEncoder<'a>,
    written: Option<u32>,
}

impl<'e, 'a> OneofEncoder<'e, 'a> {
    pub(crate) fn new(enc: &'e mut MessageEncoder<'a>) -> Self {
        OneofEncoder { enc, written: None }
    }

    /// Encode `value` as the active case. Written even when it is the
    /// default value, so the case survives a round trip.
    pub fn case<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        value: &T,
    ) -> Result<(), EncodeError> {
        let field = self.enc.resolve(key.into())?;
        if let Some(first) = self.written {
            let kind = EncodeErrorKind::MultipleValuesInOneof { first, second: field };
            return Err(self.enc.context().error(kind));
        }

        self.enc.claim_field(field)?;
        self.written = Some(field);
        self.enc.write_present(field, value)
    }

    pub(crate) fn finish(self) -> Result<(), EncodeError> {
        match self.written {
            Some(_) => Ok(()),
            None => Err(self.enc.context().error(EncodeErrorKind::NoValueInOneof)),
        }
    }
}

/// Decoding scope of one oneof, holding the occurrences of the chosen case.
pub struct OneofDecoder<'a> {
    ctx: DecodeContext<'a>,
    spans: Vec<FieldSpan>,
}

impl<'a> OneofDecoder<'a> {
    pub(crate) fn new(ctx: DecodeContext<'a>, spans: Vec<FieldSpan>) -> Self {
        OneofDecoder { ctx, spans }
    }

    /// Decode the value of the chosen case.
    pub fn value<T: ProtoDecode + Default>(&mut self) -> Result<T, DecodeError> {
        let spans: Vec<&FieldSpan> = self.spans.iter().collect();
        decode_spans(&self.ctx, &spans)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::codec::ProtoMessage;
    use crate::error::DecodeErrorKind;
    use crate::{Decoder, Encoder, MessageDecoder};

    #[derive(Debug, Clone, PartialEq)]
    enum Widget {
        Quux(i32),
        Bar(String),
    }

    impl ProtoOneof for Widget {
        const TAGS: &'static [u32] = &[1, 2];

        fn encode_case(&self, enc: &mut OneofEncoder<'_, '_>) -> Result<(), EncodeError> {
            match self {
                Widget::Quux(v) => enc.case(1u32, v),
                Widget::Bar(v) => enc.case(2u32, v),
            }
        }

        fn decode_case(field: u32, dec: &mut OneofDecoder<'_>) -> Result<Option<Self>, DecodeError> {
            match field {
                1 => dec.value().map(Widget::Quux).map(Some),
                2 => dec.value().map(Widget::Bar).map(Some),
                _ => Ok(None),
            }
        }
    }

    /// Misbehaving oneof that writes every case it has, or none at all.
    struct Broken(Vec<u32>);

    impl ProtoOneof for Broken {
        const TAGS: &'static [u32] = &[1, 2];

        fn encode_case(&self, enc: &mut OneofEncoder<'_, '_>) -> Result<(), EncodeError> {
            for &field in &self.0 {
                enc.case(field, &1u32)?;
            }
            Ok(())
        }

        fn decode_case(_field: u32, _dec: &mut OneofDecoder<'_>) -> Result<Option<Self>, DecodeError> {
            Ok(None)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Foo {
        widget: Option<Widget>,
    }

    impl ProtoMessage for Foo {
        fn encode_fields(&self, enc: &mut MessageEncoder<'_>) -> Result<(), EncodeError> {
            enc.oneof(self.widget.as_ref())
        }

        fn decode_fields(dec: &mut MessageDecoder<'_>) -> Result<Self, DecodeError> {
            Ok(Foo {
                widget: dec.oneof()?,
            })
        }
    }

    struct Holder(Broken);

    impl ProtoMessage for Holder {
        fn encode_fields(&self, enc: &mut MessageEncoder<'_>) -> Result<(), EncodeError> {
            enc.oneof(Some(&self.0))
        }

        fn decode_fields(_dec: &mut MessageDecoder<'_>) -> Result<Self, DecodeError> {
            Ok(Holder(Broken(Vec::new())))
        }
    }

    #[test]
    fn test_oneof_roundtrip() {
        for widget in [None, Some(Widget::Quux(0)), Some(Widget::Bar("x".into()))] {
            let foo = Foo { widget };
            let bytes = Encoder::default().encode(&foo).unwrap();
            let decoded: Foo = Decoder::default().decode(bytes).unwrap();
            assert_eq!(decoded, foo);
        }
    }

    #[test]
    fn test_default_case_is_written() {
        let foo = Foo {
            widget: Some(Widget::Quux(0)),
        };
        let bytes = Encoder::default().encode(&foo).unwrap();
        assert_eq!(bytes, &[0x08, 0x00][..]);
    }

    #[test]
    fn test_last_case_wins() {
        let bytes = Bytes::from_static(&[0x12, 0x01, b'a', 0x08, 0x05]);
        let foo: Foo = Decoder::default().decode(bytes).unwrap();
        assert_eq!(foo.widget, Some(Widget::Quux(5)));

        let bytes = Bytes::from_static(&[0x08, 0x05, 0x12, 0x01, b'a']);
        let foo: Foo = Decoder::default().decode(bytes).unwrap();
        assert_eq!(foo.widget, Some(Widget::Bar("a".into())));
    }

    #[test]
    fn test_encode_exclusivity() {
        let err = Encoder::default()
            .encode(&Holder(Broken(vec![1, 2])))
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &EncodeErrorKind::MultipleValuesInOneof { first: 1, second: 2 }
        );

        let err = Encoder::default()
            .encode(&Holder(Broken(Vec::new())))
            .unwrap_err();
        assert_eq!(err.kind(), &EncodeErrorKind::NoValueInOneof);
    }

    #[test]
    fn test_required_oneof() {
        let decoder = Decoder::default();
        let mut dec = MessageDecoder::new(decoder.context(), Bytes::new()).unwrap();
        let err = dec.required_oneof::<Widget>("widget").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MissingRequiredOneof { field: "widget" });
    }
}
