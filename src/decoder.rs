//! Decoding messages from bytes.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::codec::{
    decode_entry, decode_message, decode_nil_array, decode_repeated_spans, OneofDecoder,
    ProtoDecode, ProtoMap, ProtoMessage, ProtoOneof, ValueKind,
};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::observe::{CodecObserver, FieldEvent};
use crate::options::DecodeOptions;
use crate::path::{CodingPath, PathSegment};
use crate::table::{FieldSpan, FieldTable};
use crate::wire::{WireType, NIL_KEY_SHIFT};

/// Decodes [`ProtoMessage`]s with a fixed set of [`DecodeOptions`].
#[derive(Clone)]
pub struct Decoder {
    options: DecodeOptions,
    observer: Arc<dyn CodecObserver>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(DecodeOptions::default())
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Decoder {
            options,
            observer: crate::observe::default_observer(),
        }
    }

    /// Replace the observer that is notified of every decoded field.
    pub fn with_observer(mut self, observer: impl CodecObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Context for the root message.
    pub fn context(&self) -> DecodeContext<'_> {
        DecodeContext {
            decoder: self,
            path: CodingPath::root(),
            depth: 0,
        }
    }

    /// Decode a top level message, the input has no length prefix.
    pub fn decode<M: ProtoMessage>(&self, bytes: impl Into<Bytes>) -> Result<M, DecodeError> {
        decode_message(&self.context(), bytes.into())
    }
}

/// Where a value is being decoded, and with what options.
#[derive(Clone)]
pub struct DecodeContext<'a> {
    decoder: &'a Decoder,
    path: CodingPath,
    /// Number of messages entered above this context.
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    pub fn options(&self) -> &'a DecodeOptions {
        &self.decoder.options
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for a value nested one level below this one.
    pub fn child(&self, segment: PathSegment) -> DecodeContext<'a> {
        DecodeContext {
            decoder: self.decoder,
            path: self.path.join(segment),
            depth: self.depth,
        }
    }

    /// The same location, one message deeper.
    pub(crate) fn nested(&self) -> DecodeContext<'a> {
        DecodeContext {
            decoder: self.decoder,
            path: self.path.clone(),
            depth: self.depth + 1,
        }
    }

    /// Build an error located at this context's path.
    pub fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.path.clone())
    }

    fn observer(&self) -> &'a dyn CodecObserver {
        self.decoder.observer.as_ref()
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("path", &self.path)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Answers field lookups for one message.
///
/// Every field number may be requested once. Scalars use the last
/// occurrence of their field, repeated fields use all of them.
pub struct MessageDecoder<'a> {
    ctx: DecodeContext<'a>,
    table: FieldTable,
    claimed: BTreeSet<u32>,
    /// Shifted field numbers read as nil markers.
    consumed_markers: BTreeSet<u32>,
}

impl<'a> MessageDecoder<'a> {
    pub fn new(ctx: DecodeContext<'a>, payload: Bytes) -> Result<Self, DecodeError> {
        let table = FieldTable::scan(payload).map_err(|kind| ctx.error(kind))?;

        let observer = ctx.observer();
        for record in table.records() {
            observer.field_decoded(&FieldEvent {
                path: ctx.path(),
                field: record.field,
                wire_type: record.wire_type,
                len: record.payload_len,
                nil: record.wire_type == WireType::Nil,
            });
        }

        Ok(MessageDecoder {
            ctx,
            table,
            claimed: BTreeSet::new(),
            consumed_markers: BTreeSet::new(),
        })
    }

    pub fn context(&self) -> &DecodeContext<'a> {
        &self.ctx
    }

    /// The scanned fields of this message.
    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// Decode a scalar or nested message, the type's default if absent.
    pub fn field<T: ProtoDecode + Default>(&mut self, field: u32) -> Result<T, DecodeError> {
        self.claim(field)?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let spans: Vec<&FieldSpan> = self.table.values(field).collect();
        decode_spans(&ctx, &spans)
    }

    /// Decode a field that tracks null.
    ///
    /// A value at `field` wins. Without one, a nil marker at the shifted
    /// field number means `None`, and no marker means the default value.
    pub fn optional<T: ProtoDecode + Default>(
        &mut self,
        field: u32,
    ) -> Result<Option<T>, DecodeError> {
        self.claim(field)?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let spans: Vec<&FieldSpan> = self.table.values(field).collect();

        if self.table.is_nil_marked(field) {
            self.consumed_markers.insert(field + NIL_KEY_SHIFT);
            if spans.is_empty() {
                return Ok(None);
            }
        }
        decode_spans(&ctx, &spans).map(Some)
    }

    /// Decode a repeated field, accepting packed and unpacked records in
    /// any mix.
    pub fn repeated<T: ProtoDecode>(&mut self, field: u32) -> Result<Vec<T>, DecodeError> {
        self.claim(field)?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut values = Vec::new();
        decode_repeated_spans(&ctx, self.table.values(field), &mut values)?;
        Ok(values)
    }

    /// Decode an array whose elements may be null. Multiple records are
    /// concatenated.
    pub fn nullable_repeated<T: ProtoDecode>(
        &mut self,
        field: u32,
    ) -> Result<Vec<Option<T>>, DecodeError> {
        self.claim(field)?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut values = Vec::new();
        for span in self.table.values(field) {
            expect_wire_type(&ctx, WireType::Len, span)?;
            values.extend(decode_nil_array::<T>(&ctx, span.payload.clone())?);
        }
        Ok(values)
    }

    /// Decode a map, later entries overwrite earlier ones with the same key.
    pub fn map<M: ProtoMap>(&mut self, field: u32) -> Result<M, DecodeError> {
        self.claim(field)?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut map = M::default();
        for (idx, span) in self.table.values(field).enumerate() {
            let ctx = ctx.child(PathSegment::Index(idx));
            expect_wire_type(&ctx, WireType::Len, span)?;
            let (key, value) = decode_entry::<M::Key, M::Value>(&ctx, span.payload.clone())?;
            map.insert_entry(key, value);
        }
        Ok(map)
    }

    /// Decode a oneof. When several cases are present the one appearing
    /// last in the message wins.
    pub fn oneof<O: ProtoOneof>(&mut self) -> Result<Option<O>, DecodeError> {
        for &tag in O::TAGS {
            self.claim(tag)?;
        }

        let chosen = O::TAGS
            .iter()
            .filter_map(|&tag| self.table.values(tag).last().map(|span| (span.position, tag)))
            .max();
        let Some((_, field)) = chosen else {
            return Ok(None);
        };

        let ctx = self.ctx.child(PathSegment::Field(field));
        let spans = self.table.values(field).cloned().collect();
        let mut cases = OneofDecoder::new(ctx, spans);
        O::decode_case(field, &mut cases)
    }

    /// Decode a oneof that must hold a value.
    pub fn required_oneof<O: ProtoOneof>(&mut self, name: &'static str) -> Result<O, DecodeError> {
        match self.oneof()? {
            Some(value) => Ok(value),
            None => Err(self
                .ctx
                .error(DecodeErrorKind::MissingRequiredOneof { field: name })),
        }
    }

    /// Records of fields that were never requested, in their original order.
    pub fn unknown_fields(&self) -> Bytes {
        let mut unknown = BytesMut::new();
        for record in self.table.records() {
            if self.claimed.contains(&record.field) || self.consumed_markers.contains(&record.field) {
                continue;
            }
            unknown.extend_from_slice(&record.raw);
        }
        unknown.freeze()
    }

    fn claim(&mut self, field: u32) -> Result<(), DecodeError> {
        if !self.claimed.insert(field) {
            return Err(self.ctx.error(DecodeErrorKind::MultipleContainers { field }));
        }
        Ok(())
    }
}

impl fmt::Debug for MessageDecoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDecoder")
            .field("path", self.ctx.path())
            .field("records", &self.table.records().len())
            .field("claimed", &self.claimed)
            .finish()
    }
}

/// Fails unless `span` has the `expected` wire type.
pub(crate) fn expect_wire_type(
    ctx: &DecodeContext<'_>,
    expected: WireType,
    span: &FieldSpan,
) -> Result<(), DecodeError> {
    if span.wire_type != expected {
        return Err(ctx.error(DecodeErrorKind::UnexpectedWireType {
            expected,
            actual: span.wire_type,
        }));
    }
    Ok(())
}

/// Decodes a singular value from the occurrences of its field.
///
/// Scalars take the last occurrence. Messages merge every occurrence by
/// decoding their concatenated payloads, lists append record by record.
pub(crate) fn decode_spans<T: ProtoDecode + Default>(
    ctx: &DecodeContext<'_>,
    spans: &[&FieldSpan],
) -> Result<T, DecodeError> {
    for span in spans {
        expect_wire_type(ctx, T::WIRE_TYPE, span)?;
    }
    match spans {
        [] => Ok(T::default()),
        [first, rest @ ..] if T::KIND == ValueKind::List => {
            let mut value = T::decode(ctx, first.payload.clone())?;
            for span in rest {
                value.merge(ctx, span.payload.clone())?;
            }
            Ok(value)
        }
        [.., last] if T::KIND != ValueKind::Message || spans.len() == 1 => {
            T::decode(ctx, last.payload.clone())
        }
        _ => {
            let len = spans.iter().map(|span| span.payload.len()).sum();
            let mut merged = BytesMut::with_capacity(len);
            for span in spans {
                merged.extend_from_slice(&span.payload);
            }
            T::decode(ctx, merged.freeze())
        }
    }
}

/// Decode `bytes` with the default [`DecodeOptions`].
pub fn decode<M: ProtoMessage>(bytes: impl Into<Bytes>) -> Result<M, DecodeError> {
    Decoder::default().decode(bytes)
}
