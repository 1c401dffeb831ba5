//! Tests for the code generated by the derive macros.

use crate::{impl_proto_message, impl_proto_oneof};
use proc_macro2::TokenStream as TokenStream2;
use syn::{parse_quote, DeriveInput};

/// Format generated tokens as pretty Rust code.
fn format_tokens(tokens: TokenStream2) -> String {
    let file = syn::parse_file(&tokens.to_string()).expect("generated invalid syntax");
    prettyplease::unparse(&file)
}

/// Asserts `generated` contains `snippet`, ignoring whitespace.
#[track_caller]
fn assert_generates(generated: &str, snippet: &str) {
    let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    assert!(
        squash(generated).contains(&squash(snippet)),
        "expected `{snippet}` in:\n{generated}"
    );
}

fn message_error(input: DeriveInput) -> String {
    match impl_proto_message(&input) {
        Ok(_) => panic!("derive should have failed"),
        Err(err) => err.to_string(),
    }
}

fn oneof_error(input: DeriveInput) -> String {
    match impl_proto_oneof(&input) {
        Ok(_) => panic!("derive should have failed"),
        Err(err) => err.to_string(),
    }
}

#[test]
fn test_simple_message() {
    let input: DeriveInput = parse_quote! {
        struct Person {
            #[proto(tag = 1)]
            name: String,
            #[proto(tag = 2)]
            id: i32,
        }
    };
    let output = format_tokens(impl_proto_message(&input).expect("derive failed"));
    assert_generates(&output, "impl protonil::codec::ProtoMessage for Person");
    assert_generates(&output, "enc.field(1u32, &self.name)?;");
    assert_generates(&output, "enc.field(2u32, &self.id)?;");
    assert_generates(&output, "let __field_name = dec.field(1u32)?;");
    assert_generates(&output, "name: __field_name,");
    assert_generates(
        &output,
        "const KIND: protonil::codec::ValueKind = protonil::codec::ValueKind::Message;",
    );
    assert_generates(&output, "protonil::codec::encode_message(self, ctx, buf)");
    assert_generates(&output, "protonil::codec::decode_message(ctx, payload)");
}

#[test]
fn test_message_with_optional_and_repeated() {
    let input: DeriveInput = parse_quote! {
        struct Message {
            #[proto(tag = 1, optional)]
            optional_field: Option<String>,
            #[proto(tag = 2, repeated)]
            packed: Vec<i32>,
            #[proto(tag = 3, repeated, unpacked)]
            unpacked: Vec<i32>,
            #[proto(tag = 4, repeated)]
            nullable: Vec<Option<u8>>,
        }
    };
    let output = format_tokens(impl_proto_message(&input).expect("derive failed"));
    assert_generates(
        &output,
        "enc.optional(1u32, ::core::option::Option::as_ref(&self.optional_field))?;",
    );
    assert_generates(&output, "enc.repeated(2u32, &self.packed)?;");
    assert_generates(&output, "enc.repeated_unpacked(3u32, &self.unpacked)?;");
    assert_generates(&output, "enc.nullable_repeated(4u32, &self.nullable)?;");
    assert_generates(&output, "let __field_optional_field = dec.optional(1u32)?;");
    assert_generates(&output, "let __field_unpacked = dec.repeated(3u32)?;");
    assert_generates(&output, "let __field_nullable = dec.nullable_repeated(4u32)?;");
}

#[test]
fn test_message_with_map_and_oneofs() {
    let input: DeriveInput = parse_quote! {
        struct Message {
            #[proto(tag = 1, map)]
            entries: BTreeMap<String, i32>,
            #[proto(oneof, tags = "2, 3")]
            choice: Option<Choice>,
            #[proto(oneof, tags = "4, 5", required)]
            kind: Kind,
        }
    };
    let output = format_tokens(impl_proto_message(&input).expect("derive failed"));
    assert_generates(&output, "enc.map(1u32, &self.entries)?;");
    assert_generates(
        &output,
        "enc.oneof(::core::option::Option::as_ref(&self.choice))?;",
    );
    assert_generates(&output, "enc.oneof(::core::option::Option::Some(&self.kind))?;");
    assert_generates(&output, "let __field_choice = dec.oneof()?;");
    assert_generates(&output, "let __field_kind = dec.required_oneof(\"kind\")?;");
}

#[test]
fn test_unknown_fields_are_collected_last() {
    let input: DeriveInput = parse_quote! {
        struct Message {
            #[proto(unknown)]
            unknown: Bytes,
            #[proto(tag = 1)]
            id: u64,
        }
    };
    let output = format_tokens(impl_proto_message(&input).expect("derive failed"));
    assert_generates(&output, "enc.unknown(&self.unknown)?;");

    let id = output.find("let __field_id").expect("id decoded");
    let unknown = output
        .find("let __field_unknown = dec.unknown_fields();")
        .expect("unknown decoded");
    assert!(id < unknown);
}

#[test]
fn test_generic_message() {
    let input: DeriveInput = parse_quote! {
        struct Wrapper<T: Default> {
            #[proto(tag = 1)]
            inner: T,
        }
    };
    let output = format_tokens(impl_proto_message(&input).expect("derive failed"));
    assert_generates(
        &output,
        "impl<T: Default> protonil::codec::ProtoMessage for Wrapper<T>",
    );
}

#[test]
fn test_oneof_enum() {
    let input: DeriveInput = parse_quote! {
        enum Widget {
            #[proto(tag = 1)]
            Quux(i32),
            #[proto(tag = 2)]
            Bar(ProtoString),
        }
    };
    let output = format_tokens(impl_proto_oneof(&input).expect("derive failed"));
    assert_generates(&output, "const TAGS: &'static [u32] = &[1u32, 2u32];");
    assert_generates(&output, "Self::Quux(value) => enc.case(1u32, value),");
    assert_generates(&output, "2u32 => dec.value::<ProtoString>()");
    assert_generates(
        &output,
        "_ => ::core::result::Result::Ok(::core::option::Option::None),",
    );
}

#[test]
fn test_invalid_tags() {
    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 0)]
            id: u32,
        }
    });
    insta::assert_snapshot!(err, @"field number 0 is invalid, expected 1..=536870911 outside of 19000..=19999");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 19500)]
            id: u32,
        }
    });
    insta::assert_snapshot!(err, @"field number 19500 is invalid, expected 1..=536870911 outside of 19000..=19999");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 1)]
            id: u32,
            #[proto(oneof, tags = "2, 1")]
            choice: Option<Choice>,
        }
    });
    insta::assert_snapshot!(err, @"tag 1 is used more than once");
}

#[test]
fn test_invalid_attributes() {
    let err = message_error(parse_quote! {
        struct Message {
            id: u32,
        }
    });
    insta::assert_snapshot!(err, @"missing #[proto(tag = N)] attribute");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 1, repeated, map)]
            id: Vec<u32>,
        }
    });
    insta::assert_snapshot!(err, @"conflicting field attributes");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 1, unpacked)]
            id: u32,
        }
    });
    insta::assert_snapshot!(err, @"'unpacked' attribute is only valid for repeated fields");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(tag = 1, repeated, unpacked)]
            ids: Vec<Option<u32>>,
        }
    });
    insta::assert_snapshot!(err, @"arrays with nullable elements cannot be unpacked");

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(oneof)]
            choice: Option<Choice>,
        }
    });
    insta::assert_snapshot!(err, @r#"oneof field requires tags = "1, 2, 3" attribute"#);

    let err = message_error(parse_quote! {
        struct Message {
            #[proto(unknown)]
            a: Bytes,
            #[proto(unknown)]
            b: Bytes,
        }
    });
    insta::assert_snapshot!(err, @"only one #[proto(unknown)] field is allowed");

    let err = message_error(parse_quote! {
        struct Message(u32);
    });
    insta::assert_snapshot!(err, @"only named fields supported");
}

#[test]
fn test_invalid_oneof() {
    let err = oneof_error(parse_quote! {
        enum Empty {}
    });
    insta::assert_snapshot!(err, @"ProtoOneof requires at least one variant");

    let err = oneof_error(parse_quote! {
        enum Widget {
            #[proto(tag = 1)]
            Quux(i32, i32),
        }
    });
    insta::assert_snapshot!(err, @"oneof variants must have exactly one unnamed field, e.g., `Foo(i32)`");

    let err = oneof_error(parse_quote! {
        enum Widget {
            Quux(i32),
        }
    });
    insta::assert_snapshot!(err, @"missing #[proto(tag = N)] attribute on oneof variant");

    let err = oneof_error(parse_quote! {
        enum Widget {
            #[proto(tag = 1)]
            Quux(i32),
            #[proto(tag = 1)]
            Bar(u32),
        }
    });
    insta::assert_snapshot!(err, @"tag 1 is used more than once");

    let err = oneof_error(parse_quote! {
        struct Widget;
    });
    insta::assert_snapshot!(err, @"ProtoOneof can only be derived for enums");
}
