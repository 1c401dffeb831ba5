//! Protobuf map field support.
//!
//! Maps in protobuf are syntactic sugar for `repeated Entry { K key = 1; V value = 2; }`.
//! Each map entry is encoded as a length-delimited record with two fields.
//!
//! # Wire Format
//!
//! ```text
//! [field_tag, LEN] [entry_len] [key_tag=1, key_wire] [key_value] [value_tag=2, value_wire] [value_value]
//! ```
//!
//! Both fields are always written, and an entry missing either one is
//! rejected when decoding.
//!
//! # Valid Key Types
//!
//! Integers, bool and string. Floats, bytes and messages are rejected with
//! `UnsupportedMapKey` on both sides.
//!
//! # Example
//!
//! ```ignore
//! use std::collections::BTreeMap;
//! use protonil::ProtoMessage;
//!
//! #[derive(Default, ProtoMessage)]
//! pub struct Config {
//!     #[proto(tag = 1, map)]
//!     pub settings: BTreeMap<String, String>,
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use bytes::{BufMut, Bytes};

use super::{ProtoDecode, ProtoEncode};
use crate::decoder::{DecodeContext, MessageDecoder};
use crate::encoder::{EncodeContext, MessageEncoder};
use crate::error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};

const KEY_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

/// Trait for protobuf map fields.
///
/// Provides a unified interface for map fields, whether they use `BTreeMap`
/// or `HashMap`.
pub trait ProtoMap: Default {
    type Key: ProtoEncode + ProtoDecode + Default;
    type Value: ProtoEncode + ProtoDecode + Default;

    /// Insert a decoded entry, replacing any previous value for the key.
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);

    fn entry_count(&self) -> usize;

    /// Visit every entry, stopping at the first error.
    fn for_each_entry<F>(&self, f: F) -> Result<(), EncodeError>
    where
        F: FnMut(&Self::Key, &Self::Value) -> Result<(), EncodeError>;
}

impl<K, V> ProtoMap for BTreeMap<K, V>
where
    K: ProtoEncode + ProtoDecode + Default + Ord,
    V: ProtoEncode + ProtoDecode + Default,
{
    type Key = K;
    type Value = V;

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn for_each_entry<F>(&self, mut f: F) -> Result<(), EncodeError>
    where
        F: FnMut(&K, &V) -> Result<(), EncodeError>,
    {
        self.iter().try_for_each(|(key, value)| f(key, value))
    }
}

impl<K, V, S> ProtoMap for HashMap<K, V, S>
where
    K: ProtoEncode + ProtoDecode + Default + Hash + Eq,
    V: ProtoEncode + ProtoDecode + Default,
    S: BuildHasher + Default,
{
    type Key = K;
    type Value = V;

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn for_each_entry<F>(&self, mut f: F) -> Result<(), EncodeError>
    where
        F: FnMut(&K, &V) -> Result<(), EncodeError>,
    {
        self.iter().try_for_each(|(key, value)| f(key, value))
    }
}

/// Encodes the body of one map entry into `buf`.
pub(crate) fn encode_entry<K, V, B>(
    ctx: &EncodeContext<'_>,
    key: &K,
    value: &V,
    buf: &mut B,
) -> Result<(), EncodeError>
where
    K: ProtoEncode,
    V: ProtoEncode,
    B: BufMut,
{
    if !K::KIND.is_valid_map_key() {
        return Err(ctx.error(EncodeErrorKind::UnsupportedMapKey { kind: K::KIND }));
    }

    let mut entry = MessageEncoder::new(ctx.clone());
    entry.write_present(KEY_FIELD, key)?;
    entry.write_present(VALUE_FIELD, value)?;
    buf.put(entry.finish()?);
    Ok(())
}

/// Decodes the body of one map entry.
pub(crate) fn decode_entry<K, V>(ctx: &DecodeContext<'_>, payload: Bytes) -> Result<(K, V), DecodeError>
where
    K: ProtoDecode + Default,
    V: ProtoDecode + Default,
{
    if !K::KIND.is_valid_map_key() {
        return Err(ctx.error(DecodeErrorKind::UnsupportedMapKey { kind: K::KIND }));
    }

    let mut entry = MessageDecoder::new(ctx.clone(), payload)?;
    let invalid = |reason| ctx.error(DecodeErrorKind::InvalidMapEntry { reason });
    let table = entry.table();
    if table
        .field_numbers()
        .any(|field| field != KEY_FIELD && field != VALUE_FIELD)
    {
        return Err(invalid("unexpected field in map entry"));
    }
    if table.last_value(KEY_FIELD).is_none() {
        return Err(invalid("missing key"));
    }
    if table.last_value(VALUE_FIELD).is_none() {
        return Err(invalid("missing value"));
    }

    let key = entry.field(KEY_FIELD)?;
    let value = entry.field(VALUE_FIELD)?;
    Ok((key, value))
}
