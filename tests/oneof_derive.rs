//! Integration tests for ProtoOneof derive macro.

use bytes::Bytes;
use protonil::codec::{ProtoOneof, ProtoString};
use protonil::{DecodeErrorKind, Decoder, EncodeOptions, Encoder, ProtoMessage, ProtoOneof};

/// Test oneof using derive macro.
/// Equivalent to:
/// ```protobuf
/// oneof test_oneof {
///     int32 int_value = 1;
///     string string_value = 2;
///     bool bool_value = 3;
///     bytes bytes_value = 4;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, ProtoOneof)]
pub enum TestOneof {
    #[proto(tag = 1)]
    IntValue(i32),
    #[proto(tag = 2)]
    StringValue(ProtoString),
    #[proto(tag = 3)]
    BoolValue(bool),
    #[proto(tag = 4)]
    BytesValue(Bytes),
}

#[derive(Debug, Clone, PartialEq, Default, ProtoMessage)]
pub struct Holder {
    #[proto(oneof, tags = "1, 2, 3, 4")]
    pub value: Option<TestOneof>,
}

/// A oneof for use in message tests.
/// Equivalent to:
/// ```protobuf
/// oneof widget {
///     int32 int_field = 2;
///     string string_field = 3;
///     Inner nested = 5;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, ProtoOneof)]
pub enum Widget {
    #[proto(tag = 2)]
    IntField(i32),
    #[proto(tag = 3)]
    StringField(ProtoString),
    #[proto(tag = 5)]
    Nested(Box<MessageWithOneof>),
}

/// Message containing a oneof field.
#[derive(Debug, Clone, PartialEq, Default, ProtoMessage)]
pub struct MessageWithOneof {
    #[proto(tag = 1)]
    pub name: ProtoString,
    #[proto(oneof, tags = "2, 3, 5")]
    pub widget: Option<Widget>,
    #[proto(tag = 4)]
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, ProtoOneof)]
pub enum Shape {
    #[proto(tag = 1)]
    Circle(f64),
    #[proto(tag = 2)]
    Square(u32),
}

/// Message with a oneof that must be set.
#[derive(Debug, Clone, PartialEq, ProtoMessage)]
pub struct Drawing {
    #[proto(oneof, tags = "1, 2", required)]
    pub shape: Shape,
    #[proto(tag = 3)]
    pub label: String,
}

fn roundtrip<M: protonil::codec::ProtoMessage + PartialEq + std::fmt::Debug>(msg: &M) -> Bytes {
    let bytes = Encoder::default().encode(msg).expect("encode failed");
    let decoded: M = Decoder::default().decode(bytes.clone()).expect("decode failed");
    assert_eq!(&decoded, msg);
    bytes
}

fn roundtrip_oneof(value: TestOneof) {
    roundtrip(&Holder { value: Some(value) });
}

#[test]
fn test_derived_oneof_tags() {
    assert_eq!(TestOneof::TAGS, &[1, 2, 3, 4]);
    assert_eq!(Widget::TAGS, &[2, 3, 5]);
}

#[test]
fn test_derived_oneof_roundtrip_int() {
    roundtrip_oneof(TestOneof::IntValue(0));
    roundtrip_oneof(TestOneof::IntValue(42));
    roundtrip_oneof(TestOneof::IntValue(-1));
    roundtrip_oneof(TestOneof::IntValue(i32::MAX));
    roundtrip_oneof(TestOneof::IntValue(i32::MIN));
}

#[test]
fn test_derived_oneof_roundtrip_string() {
    roundtrip_oneof(TestOneof::StringValue(ProtoString::from("")));
    roundtrip_oneof(TestOneof::StringValue(ProtoString::from("hello")));
    roundtrip_oneof(TestOneof::StringValue(ProtoString::from("hello world! 🎉")));
}

#[test]
fn test_derived_oneof_roundtrip_bool() {
    roundtrip_oneof(TestOneof::BoolValue(true));
    roundtrip_oneof(TestOneof::BoolValue(false));
}

#[test]
fn test_derived_oneof_roundtrip_bytes() {
    roundtrip_oneof(TestOneof::BytesValue(Bytes::new()));
    roundtrip_oneof(TestOneof::BytesValue(Bytes::from_static(&[1, 2, 3])));
    roundtrip_oneof(TestOneof::BytesValue(Bytes::from(vec![0u8; 100])));
}

#[test]
fn test_default_case_is_written() {
    let bytes = roundtrip(&Holder {
        value: Some(TestOneof::StringValue(ProtoString::from(""))),
    });
    assert_eq!(bytes, &[0x12, 0x00][..]);

    let bytes = roundtrip(&Holder { value: None });
    assert!(bytes.is_empty());
}

#[test]
fn test_derived_oneof_unknown_tag() {
    // Field 99 is not part of the oneof.
    let holder: Holder = Decoder::default()
        .decode(Bytes::from_static(&[0x98, 0x06, 0x2A]))
        .unwrap();
    assert_eq!(holder.value, None);
}

#[test]
fn test_derived_oneof_last_one_wins() {
    // IntValue(42), then BoolValue(true).
    let bytes: &[u8] = &[0x08, 0x2A, 0x18, 0x01];
    let holder: Holder = Decoder::default().decode(Bytes::from_static(bytes)).unwrap();
    assert_eq!(holder.value, Some(TestOneof::BoolValue(true)));

    // Repeating a case still picks the case that appears last.
    let bytes: &[u8] = &[0x08, 0x2A, 0x18, 0x01, 0x08, 0x07];
    let holder: Holder = Decoder::default().decode(Bytes::from_static(bytes)).unwrap();
    assert_eq!(holder.value, Some(TestOneof::IntValue(7)));
}

#[test]
fn test_message_with_oneof_roundtrip() {
    roundtrip(&MessageWithOneof {
        name: ProtoString::from("test"),
        widget: Some(Widget::IntField(42)),
        count: 10,
    });
    roundtrip(&MessageWithOneof {
        name: ProtoString::from("hello"),
        widget: Some(Widget::StringField(ProtoString::from("world"))),
        count: 5,
    });
    roundtrip(&MessageWithOneof {
        name: ProtoString::from("outer"),
        widget: Some(Widget::Nested(Box::new(MessageWithOneof {
            name: ProtoString::from("inner"),
            widget: None,
            count: 1,
        }))),
        count: 0,
    });
}

#[test]
fn test_required_oneof() {
    let drawing = Drawing {
        shape: Shape::Square(0),
        label: "box".to_string(),
    };
    let bytes = roundtrip(&drawing);
    assert_eq!(bytes, &[0x10, 0x00, 0x1A, 0x03, b'b', b'o', b'x'][..]);

    let drawing = Drawing {
        shape: Shape::Circle(1.5),
        label: String::new(),
    };
    roundtrip(&drawing);

    let err = Decoder::default()
        .decode::<Drawing>(Bytes::from_static(&[0x1A, 0x01, b'x']))
        .unwrap_err();
    assert_eq!(
        err.kind(),
        DecodeErrorKind::MissingRequiredOneof { field: "shape" }
    );
    assert_eq!(err.path().to_string(), "$");
}

#[test]
fn test_oneof_sorted_with_fields() {
    let msg = MessageWithOneof {
        name: ProtoString::from("n"),
        widget: Some(Widget::Nested(Box::default())),
        count: 1,
    };

    let bytes = Encoder::default().encode(&msg).unwrap();
    assert_eq!(bytes, &[0x0A, 0x01, b'n', 0x2A, 0x00, 0x20, 0x01][..]);

    let mut options = EncodeOptions::new();
    options.sort_fields_during_encoding(true);
    let bytes = Encoder::new(options).encode(&msg).unwrap();
    assert_eq!(bytes, &[0x0A, 0x01, b'n', 0x20, 0x01, 0x2A, 0x00][..]);

    let decoded: MessageWithOneof = Decoder::default().decode(bytes).unwrap();
    assert_eq!(decoded, msg);
}
