//! Derive macros for protonil.
//!
//! Provides `#[derive(ProtoMessage)]` and `#[derive(ProtoOneof)]`. The
//! generated code only calls into `protonil::MessageEncoder` and
//! `protonil::MessageDecoder`, the wire format itself lives in the runtime
//! crate.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Result, Type};

mod support;
#[cfg(test)]
mod tests;

use support::{FieldKind, FieldMetadata, Packing};

/// Derive macro for implementing the `ProtoMessage` trait.
///
/// Also implements `ProtoType`, `ProtoEncode` and `ProtoDecode` so the
/// message can be nested in other messages.
///
/// # Attributes
///
/// * `#[proto(tag = N)]`: a singular field, the type's default when absent.
/// * `#[proto(tag = N, optional)]`: an `Option<T>` that writes a nil marker
///   for `None`.
/// * `#[proto(tag = N, repeated)]`: a `Vec<T>`, packed when the element type
///   allows it. Add `unpacked` for one record per element. A
///   `Vec<Option<T>>` is written with a nil index set.
/// * `#[proto(tag = N, map)]`: a `BTreeMap` or `HashMap`.
/// * `#[proto(oneof, tags = "1, 2")]`: an `Option<E>` where `E` derives
///   `ProtoOneof`. Add `required` to use `E` directly.
/// * `#[proto(unknown)]`: a `Bytes` field that keeps unrecognized records.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, ProtoMessage)]
/// pub struct Person {
///     #[proto(tag = 1)]
///     name: ProtoString,
///     #[proto(tag = 2)]
///     id: i32,
///     #[proto(tag = 3, optional)]
///     email: Option<ProtoString>,
///     #[proto(tag = 4, repeated)]
///     phones: Vec<PhoneNumber>,
/// }
/// ```
#[proc_macro_derive(ProtoMessage, attributes(proto))]
pub fn derive_proto_message(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match impl_proto_message(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn impl_proto_message(input: &DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "only named fields supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "only structs supported")),
    };

    let metadata = fields
        .iter()
        .map(support::parse_field_metadata)
        .collect::<Result<Vec<_>>>()?;

    let mut unknown = metadata.iter().filter(|field| field.kind.is_unknown());
    if let (Some(_), Some(second)) = (unknown.next(), unknown.next()) {
        return Err(syn::Error::new_spanned(
            second.name,
            "only one #[proto(unknown)] field is allowed",
        ));
    }
    support::check_duplicate_tags(metadata.iter().flat_map(|field| {
        let span = field.name.span();
        field.kind.all_tags().iter().map(move |tag| (*tag, span))
    }))?;

    let encode_fields = metadata.iter().map(generate_field_encode);
    let decode_fields = metadata
        .iter()
        .filter(|field| !field.kind.is_unknown())
        .map(generate_field_decode);
    let decode_unknown = metadata
        .iter()
        .filter(|field| field.kind.is_unknown())
        .map(|field| {
            let local = local_ident(field.name);
            quote! { let #local = dec.unknown_fields(); }
        });
    let field_names = metadata.iter().map(|field| field.name);
    let locals = metadata.iter().map(|field| local_ident(field.name));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics protonil::codec::ProtoType for #name #ty_generics #where_clause {
            const WIRE_TYPE: protonil::wire::WireType = protonil::wire::WireType::Len;
            const KIND: protonil::codec::ValueKind = protonil::codec::ValueKind::Message;
        }

        impl #impl_generics protonil::codec::ProtoMessage for #name #ty_generics #where_clause {
            fn encode_fields(
                &self,
                enc: &mut protonil::MessageEncoder<'_>,
            ) -> ::core::result::Result<(), protonil::EncodeError> {
                #(#encode_fields)*
                ::core::result::Result::Ok(())
            }

            fn decode_fields(
                dec: &mut protonil::MessageDecoder<'_>,
            ) -> ::core::result::Result<Self, protonil::DecodeError> {
                #(#decode_fields)*
                #(#decode_unknown)*
                ::core::result::Result::Ok(Self {
                    #(#field_names: #locals,)*
                })
            }
        }

        impl #impl_generics protonil::codec::ProtoEncode for #name #ty_generics #where_clause {
            #[inline]
            fn encode<B: protonil::bytes::BufMut>(
                &self,
                ctx: &protonil::EncodeContext<'_>,
                buf: &mut B,
            ) -> ::core::result::Result<(), protonil::EncodeError> {
                protonil::codec::encode_message(self, ctx, buf)
            }
        }

        impl #impl_generics protonil::codec::ProtoDecode for #name #ty_generics #where_clause {
            #[inline]
            fn decode(
                ctx: &protonil::DecodeContext<'_>,
                payload: protonil::bytes::Bytes,
            ) -> ::core::result::Result<Self, protonil::DecodeError> {
                protonil::codec::decode_message(ctx, payload)
            }
        }
    })
}

fn local_ident(name: &Ident) -> Ident {
    format_ident!("__field_{}", name)
}

fn generate_field_encode(field: &FieldMetadata<'_>) -> TokenStream2 {
    let fname = field.name;

    match &field.kind {
        FieldKind::Singular { tag } => quote! {
            enc.field(#tag, &self.#fname)?;
        },
        FieldKind::Optional { tag } => quote! {
            enc.optional(#tag, ::core::option::Option::as_ref(&self.#fname))?;
        },
        FieldKind::Repeated { tag, packing } => {
            let method = match packing {
                Packing::Packed => quote!(repeated),
                Packing::Unpacked => quote!(repeated_unpacked),
                Packing::Nullable => quote!(nullable_repeated),
            };
            quote! {
                enc.#method(#tag, &self.#fname)?;
            }
        }
        FieldKind::Map { tag } => quote! {
            enc.map(#tag, &self.#fname)?;
        },
        FieldKind::Oneof { required: false, .. } => quote! {
            enc.oneof(::core::option::Option::as_ref(&self.#fname))?;
        },
        FieldKind::Oneof { required: true, .. } => quote! {
            enc.oneof(::core::option::Option::Some(&self.#fname))?;
        },
        FieldKind::Unknown => quote! {
            enc.unknown(&self.#fname)?;
        },
    }
}

fn generate_field_decode(field: &FieldMetadata<'_>) -> TokenStream2 {
    let local = local_ident(field.name);

    let value = match &field.kind {
        FieldKind::Singular { tag } => quote!(dec.field(#tag)?),
        FieldKind::Optional { tag } => quote!(dec.optional(#tag)?),
        FieldKind::Repeated { tag, packing } => match packing {
            Packing::Packed | Packing::Unpacked => quote!(dec.repeated(#tag)?),
            Packing::Nullable => quote!(dec.nullable_repeated(#tag)?),
        },
        FieldKind::Map { tag } => quote!(dec.map(#tag)?),
        FieldKind::Oneof { required: false, .. } => quote!(dec.oneof()?),
        FieldKind::Oneof { required: true, .. } => {
            let name = field.name.to_string();
            quote!(dec.required_oneof(#name)?)
        }
        FieldKind::Unknown => quote!(dec.unknown_fields()),
    };

    quote! {
        let #local = #value;
    }
}

/// Derive macro for implementing the `ProtoOneof` trait on enums.
///
/// Each variant must have exactly one unnamed field and a
/// `#[proto(tag = N)]` attribute.
///
/// # Example
///
/// ```ignore
/// #[derive(ProtoOneof)]
/// pub enum Widget {
///     #[proto(tag = 1)]
///     Quux(i32),
///     #[proto(tag = 2)]
///     Bar(ProtoString),
///     #[proto(tag = 3)]
///     Nested(Box<SomeMessage>),
/// }
///
/// // In a message:
/// #[derive(ProtoMessage)]
/// pub struct Foo {
///     #[proto(oneof, tags = "1, 2, 3")]
///     widget: Option<Widget>,
/// }
/// ```
#[proc_macro_derive(ProtoOneof, attributes(proto))]
pub fn derive_proto_oneof(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match impl_proto_oneof(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct OneofVariantInfo<'a> {
    name: &'a Ident,
    ty: &'a Type,
    tag: u32,
    span: Span,
}

fn impl_proto_oneof(input: &DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "ProtoOneof can only be derived for enums",
            ))
        }
    };
    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "ProtoOneof requires at least one variant",
        ));
    }

    let variant_info = variants
        .iter()
        .map(|variant| {
            let ty = match &variant.fields {
                Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                    &fields.unnamed[0].ty
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "oneof variants must have exactly one unnamed field, e.g., `Foo(i32)`",
                    ))
                }
            };
            Ok(OneofVariantInfo {
                name: &variant.ident,
                ty,
                tag: support::parse_variant_tag(variant)?,
                span: variant.span(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    support::check_duplicate_tags(variant_info.iter().map(|v| (v.tag, v.span)))?;

    let tags = variant_info.iter().map(|v| v.tag);
    let encode_arms = variant_info.iter().map(|v| {
        let vname = v.name;
        let tag = v.tag;
        quote! {
            Self::#vname(value) => enc.case(#tag, value),
        }
    });
    let decode_arms = variant_info.iter().map(|v| {
        let vname = v.name;
        let vty = v.ty;
        let tag = v.tag;
        quote! {
            #tag => dec
                .value::<#vty>()
                .map(|value| ::core::option::Option::Some(Self::#vname(value))),
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics protonil::codec::ProtoOneof for #name #ty_generics #where_clause {
            const TAGS: &'static [u32] = &[#(#tags),*];

            fn encode_case(
                &self,
                enc: &mut protonil::codec::OneofEncoder<'_, '_>,
            ) -> ::core::result::Result<(), protonil::EncodeError> {
                match self {
                    #(#encode_arms)*
                }
            }

            fn decode_case(
                field: u32,
                dec: &mut protonil::codec::OneofDecoder<'_>,
            ) -> ::core::result::Result<::core::option::Option<Self>, protonil::DecodeError> {
                match field {
                    #(#decode_arms)*
                    _ => ::core::result::Result::Ok(::core::option::Option::None),
                }
            }
        }
    })
}
