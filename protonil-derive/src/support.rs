//! Reading `#[proto(...)]` attributes into a description of each field.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use darling::FromMeta;
use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Attribute, Field, GenericArgument, Ident, PathArguments, Result, Type, Variant};

/// Field numbers a message may use.
const FIELD_NUMBERS: RangeInclusive<u32> = 1..=(1 << 29) - 1;
/// Field numbers set aside by the protobuf implementation.
const RESERVED_FIELD_NUMBERS: RangeInclusive<u32> = 19000..=19999;

/// A struct field and how it is laid out on the wire.
pub struct FieldMetadata<'a> {
    pub name: &'a Ident,
    pub kind: FieldKind,
}

pub enum FieldKind {
    /// Plain value, the type's default when absent.
    Singular { tag: u32 },
    /// `Option<T>` with a nil marker for `None`.
    Optional { tag: u32 },
    Repeated { tag: u32, packing: Packing },
    Map { tag: u32 },
    /// An enum deriving `ProtoOneof`, `required` when the field is not an `Option`.
    Oneof { tags: Vec<u32>, required: bool },
    /// `Bytes` collecting every record no other field asked for.
    Unknown,
}

/// Layout of a repeated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Packed when the element type allows it.
    Packed,
    Unpacked,
    /// `Vec<Option<T>>`: nil index set, then the values.
    Nullable,
}

impl FieldKind {
    /// Field numbers this field writes to.
    pub fn all_tags(&self) -> &[u32] {
        match self {
            FieldKind::Singular { tag }
            | FieldKind::Optional { tag }
            | FieldKind::Repeated { tag, .. }
            | FieldKind::Map { tag } => std::slice::from_ref(tag),
            FieldKind::Oneof { tags, .. } => tags,
            FieldKind::Unknown => &[],
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldKind::Unknown)
    }
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct FieldAttrs {
    tag: Option<u32>,
    repeated: bool,
    unpacked: bool,
    optional: bool,
    map: bool,
    oneof: bool,
    tags: Option<String>,
    required: bool,
    unknown: bool,
}

impl FieldAttrs {
    /// Number of the mutually exclusive markers that are set.
    fn markers(&self) -> usize {
        [self.unknown, self.oneof, self.map, self.repeated, self.optional]
            .into_iter()
            .filter(|set| *set)
            .count()
    }
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct VariantAttrs {
    tag: Option<u32>,
}

/// Parses the first `#[proto(...)]` in `attrs`, or the defaults if there is none.
fn proto_attrs<A, S>(attrs: &[Attribute], owner: &S) -> Result<A>
where
    A: FromMeta + Default,
    S: quote::ToTokens,
{
    match attrs.iter().find(|attr| attr.path().is_ident("proto")) {
        Some(attr) => {
            A::from_meta(&attr.meta).map_err(|e| syn::Error::new_spanned(owner, e.to_string()))
        }
        None => Ok(A::default()),
    }
}

/// Describe `field` from its attributes and type.
pub fn parse_field_metadata(field: &Field) -> Result<FieldMetadata<'_>> {
    let Some(name) = field.ident.as_ref() else {
        return Err(syn::Error::new_spanned(field, "only named fields supported"));
    };
    let attrs: FieldAttrs = proto_attrs(&field.attrs, field)?;
    let fail = |msg: &str| syn::Error::new_spanned(field, msg);

    if attrs.required && !attrs.oneof {
        return Err(fail("'required' attribute is only valid for oneof fields"));
    }
    if attrs.unpacked && !attrs.repeated {
        return Err(fail("'unpacked' attribute is only valid for repeated fields"));
    }
    if attrs.markers() > 1 || (attrs.unknown && attrs.tag.is_some()) {
        return Err(fail("conflicting field attributes"));
    }

    if attrs.unknown {
        return Ok(FieldMetadata { name, kind: FieldKind::Unknown });
    }
    if attrs.oneof {
        let Some(list) = attrs.tags.as_deref() else {
            return Err(fail("oneof field requires tags = \"1, 2, 3\" attribute"));
        };
        let tags = parse_tag_list(list, field)?;
        let kind = FieldKind::Oneof { tags, required: attrs.required };
        return Ok(FieldMetadata { name, kind });
    }

    let tag = attrs.tag.ok_or_else(|| fail("missing #[proto(tag = N)] attribute"))?;
    validate_tag(tag, field.span())?;

    let kind = if attrs.map {
        FieldKind::Map { tag }
    } else if attrs.repeated {
        let packing = match (is_vec_of_option(&field.ty), attrs.unpacked) {
            (true, true) => return Err(fail("arrays with nullable elements cannot be unpacked")),
            (true, false) => Packing::Nullable,
            (false, true) => Packing::Unpacked,
            (false, false) => Packing::Packed,
        };
        FieldKind::Repeated { tag, packing }
    } else if attrs.optional {
        FieldKind::Optional { tag }
    } else {
        FieldKind::Singular { tag }
    };
    Ok(FieldMetadata { name, kind })
}

/// Parses `"1, 2, 3"`.
fn parse_tag_list(list: &str, field: &Field) -> Result<Vec<u32>> {
    list.split(',')
        .map(|item| {
            let tag = item
                .trim()
                .parse::<u32>()
                .map_err(|_| syn::Error::new_spanned(field, "invalid tag in tags list"))?;
            validate_tag(tag, field.span())?;
            Ok(tag)
        })
        .collect()
}

/// Field number of a oneof variant, from `#[proto(tag = N)]`.
pub fn parse_variant_tag(variant: &Variant) -> Result<u32> {
    let attrs: VariantAttrs = proto_attrs(&variant.attrs, variant)?;
    let tag = attrs.tag.ok_or_else(|| {
        syn::Error::new_spanned(variant, "missing #[proto(tag = N)] attribute on oneof variant")
    })?;
    validate_tag(tag, variant.span())?;
    Ok(tag)
}

pub fn check_duplicate_tags<I>(tagged: I) -> Result<()>
where
    I: IntoIterator<Item = (u32, Span)>,
{
    let mut seen = BTreeMap::new();
    for (tag, span) in tagged {
        if seen.insert(tag, span).is_some() {
            return Err(syn::Error::new(span, format!("tag {tag} is used more than once")));
        }
    }
    Ok(())
}

/// Rejects field numbers the encoder would refuse at runtime.
pub fn validate_tag(tag: u32, span: Span) -> Result<()> {
    if FIELD_NUMBERS.contains(&tag) && !RESERVED_FIELD_NUMBERS.contains(&tag) {
        return Ok(());
    }
    Err(syn::Error::new(
        span,
        format!(
            "field number {tag} is invalid, expected {}..={} outside of {}..={}",
            FIELD_NUMBERS.start(),
            FIELD_NUMBERS.end(),
            RESERVED_FIELD_NUMBERS.start(),
            RESERVED_FIELD_NUMBERS.end(),
        ),
    ))
}

/// Whether `ty` is spelled `Vec<Option<_>>`.
fn is_vec_of_option(ty: &Type) -> bool {
    single_generic_arg(ty, "Vec").is_some_and(|inner| single_generic_arg(inner, "Option").is_some())
}

/// If `ty` is `name<T>` returns `T`.
fn single_generic_arg<'t>(ty: &'t Type, name: &str) -> Option<&'t Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
