//! Index of the fields in one encoded message.
//!
//! Decoding never needs to know the shape of a message up front. The
//! [`FieldTable`] is built with a single pass over the bytes and then
//! answers lookups in whatever order the message asks for them.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::DecodeErrorKind;
use crate::wire::{decode_key, take_payload, WireType, NIL_KEY_SHIFT};

/// One occurrence of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpan {
    pub wire_type: WireType,
    /// Payload without the key, and without the length prefix for `Len`.
    pub payload: Bytes,
    /// Index of this occurrence among all records of the message.
    pub position: usize,
}

impl FieldSpan {
    /// Whether this span marks its field as nil, either with the nil wire
    /// type or as a zero-length `Len` field.
    pub fn is_nil_marker(&self) -> bool {
        match self.wire_type {
            WireType::Nil => true,
            WireType::Len => self.payload.is_empty(),
            _ => false,
        }
    }
}

#[cfg(feature = "smallvec")]
type SpanVec = smallvec::SmallVec<[FieldSpan; 1]>;
#[cfg(not(feature = "smallvec"))]
type SpanVec = Vec<FieldSpan>;

/// A raw field record, key and payload, as it appeared in the message.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub field: u32,
    pub wire_type: WireType,
    /// The record's bytes, starting with its key.
    pub raw: Bytes,
    pub payload_len: usize,
}

/// Spans of a message grouped by field number, duplicates kept in the
/// order they were encountered.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: BTreeMap<u32, SpanVec>,
    records: Vec<FieldRecord>,
}

impl FieldTable {
    /// Scans `bytes` into a table.
    ///
    /// Fails if a key is malformed or a payload runs past the end of the
    /// input.
    pub fn scan(bytes: Bytes) -> Result<Self, DecodeErrorKind> {
        let total = bytes.len();
        let mut rest = bytes.clone();
        let mut table = FieldTable::default();

        while !rest.is_empty() {
            let start = total - rest.len();
            let (wire_type, field) = decode_key(&mut rest)?.into_parts();
            let payload = take_payload(wire_type, &mut rest)?;
            let end = total - rest.len();

            let position = table.records.len();
            table.records.push(FieldRecord {
                field,
                wire_type,
                raw: bytes.slice(start..end),
                payload_len: payload.len(),
            });
            table.fields.entry(field).or_default().push(FieldSpan {
                wire_type,
                payload,
                position,
            });
        }

        Ok(table)
    }

    /// Every occurrence of `field`, nil markers included.
    pub fn spans(&self, field: u32) -> &[FieldSpan] {
        self.fields.get(&field).map(|spans| &spans[..]).unwrap_or_default()
    }

    /// Occurrences of `field` that carry a value.
    pub fn values(&self, field: u32) -> impl Iterator<Item = &FieldSpan> + '_ {
        self.spans(field)
            .iter()
            .filter(|span| span.wire_type != WireType::Nil)
    }

    /// The occurrence of `field` that scalar semantics use, the last one.
    pub fn last_value(&self, field: u32) -> Option<&FieldSpan> {
        self.values(field).last()
    }

    /// Whether the shifted field number of `field` holds a nil marker.
    pub fn is_nil_marked(&self, field: u32) -> bool {
        match field.checked_add(NIL_KEY_SHIFT) {
            Some(marker) => self.spans(marker).iter().any(FieldSpan::is_nil_marker),
            None => false,
        }
    }

    /// Distinct field numbers in ascending order.
    pub fn field_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    /// All records in the order they were encountered.
    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
