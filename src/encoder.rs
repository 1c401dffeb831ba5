//! Encoding messages to bytes.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::codec::{
    encode_entry, encode_nil_array, encode_packed, ProtoEncode, ProtoMap, ProtoMessage,
    ProtoOneof, OneofEncoder,
};
use crate::error::{EncodeError, EncodeErrorKind};
use crate::observe::{CodecObserver, FieldEvent};
use crate::options::EncodeOptions;
use crate::path::{CodingPath, PathSegment};
use crate::wire::{
    decode_key, encode_key, frame, nil_marker_field, take_payload, validate_field_number,
    WireType,
};

/// Encodes [`ProtoMessage`]s with a fixed set of [`EncodeOptions`].
#[derive(Clone)]
pub struct Encoder {
    options: EncodeOptions,
    observer: Arc<dyn CodecObserver>,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(EncodeOptions::default())
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Encoder {
            options,
            observer: crate::observe::default_observer(),
        }
    }

    /// Replace the observer that is notified of every encoded field.
    pub fn with_observer(mut self, observer: impl CodecObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Context for the root message.
    pub fn context(&self) -> EncodeContext<'_> {
        EncodeContext {
            encoder: self,
            path: CodingPath::root(),
        }
    }

    /// Encode `msg` as a top level message, without a length prefix.
    pub fn encode<M: ProtoMessage>(&self, msg: &M) -> Result<Bytes, EncodeError> {
        let mut encoder = MessageEncoder::new(self.context());
        msg.encode_fields(&mut encoder)?;
        Ok(encoder.finish()?.freeze())
    }

    /// Same as [`Encoder::encode`], collecting into a `Vec`.
    pub fn encode_to_vec<M: ProtoMessage>(&self, msg: &M) -> Result<Vec<u8>, EncodeError> {
        self.encode(msg).map(Vec::from)
    }
}

/// Where a value is being encoded, and with what options.
#[derive(Clone)]
pub struct EncodeContext<'a> {
    encoder: &'a Encoder,
    path: CodingPath,
}

impl<'a> EncodeContext<'a> {
    pub fn options(&self) -> &'a EncodeOptions {
        &self.encoder.options
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }

    /// Context for a value nested one level below this one.
    pub fn child(&self, segment: PathSegment) -> EncodeContext<'a> {
        EncodeContext {
            encoder: self.encoder,
            path: self.path.join(segment),
        }
    }

    /// Build an error located at this context's path.
    pub fn error(&self, kind: EncodeErrorKind) -> EncodeError {
        EncodeError::new(kind, self.path.clone())
    }

    fn observer(&self) -> &'a dyn CodecObserver {
        self.encoder.observer.as_ref()
    }
}

impl fmt::Debug for EncodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeContext")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Key a field is encoded under.
///
/// Field numbers are always accepted. Names are only accepted when
/// [`EncodeOptions::require_integer_field_keys`] is disabled, and then must
/// spell out a field number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Number(u32),
    Name(Cow<'static, str>),
}

impl From<u32> for FieldKey {
    fn from(number: u32) -> Self {
        FieldKey::Number(number)
    }
}

impl From<&'static str> for FieldKey {
    fn from(name: &'static str) -> Self {
        FieldKey::Name(Cow::Borrowed(name))
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        FieldKey::Name(Cow::Owned(name))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Number(number) => write!(f, "{number}"),
            FieldKey::Name(name) => f.write_str(name),
        }
    }
}

/// A written record, as a range of the message buffer.
#[derive(Debug, Clone)]
struct EncodedRecord {
    field: u32,
    range: Range<usize>,
}

#[cfg(feature = "smallvec")]
type RecordVec = smallvec::SmallVec<[EncodedRecord; 8]>;
#[cfg(not(feature = "smallvec"))]
type RecordVec = Vec<EncodedRecord>;

/// Collects the fields of one message.
///
/// Created by [`Encoder::encode`] for the root message and by
/// [`encode_message`](crate::codec::encode_message) for nested ones, then
/// handed to [`ProtoMessage::encode_fields`].
pub struct MessageEncoder<'a> {
    ctx: EncodeContext<'a>,
    buf: BytesMut,
    records: RecordVec,
    claimed: BTreeSet<u32>,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(ctx: EncodeContext<'a>) -> Self {
        MessageEncoder {
            ctx,
            buf: BytesMut::new(),
            records: RecordVec::new(),
            claimed: BTreeSet::new(),
        }
    }

    pub fn context(&self) -> &EncodeContext<'a> {
        &self.ctx
    }

    /// Encode a scalar or nested message. Default values are omitted when
    /// [`EncodeOptions::omit_default_values`] is enabled.
    pub fn field<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        value: &T,
    ) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        self.write_value(field, value, true)
    }

    /// Encode a field that tracks null: `None` writes a nil marker at the
    /// shifted field number, `Some` is encoded like [`MessageEncoder::field`].
    pub fn optional<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        value: Option<&T>,
    ) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        match value {
            Some(value) => self.write_value(field, value, true),
            None => self.write_nil(field),
        }
    }

    /// Encode a repeated field, packed when the element type allows it.
    pub fn repeated<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        values: &[T],
    ) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        if values.is_empty() {
            return Ok(());
        }
        if !T::WIRE_TYPE.is_packable() {
            return self.write_each(field, values);
        }

        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut payload = BytesMut::new();
        encode_packed(&ctx, values, &mut payload)?;
        self.write_record(field, WireType::Len, &payload, false);
        Ok(())
    }

    /// Encode a repeated field with one record per element.
    pub fn repeated_unpacked<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        values: &[T],
    ) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        self.write_each(field, values)
    }

    /// Encode an array whose elements may be null, as a nil index set
    /// followed by the non-null values. Always written, even when empty.
    pub fn nullable_repeated<T: ProtoEncode>(
        &mut self,
        key: impl Into<FieldKey>,
        values: &[Option<T>],
    ) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut payload = BytesMut::new();
        encode_nil_array(&ctx, values, &mut payload)?;
        self.write_record(field, WireType::Len, &payload, false);
        Ok(())
    }

    /// Encode a map as one entry record per key.
    pub fn map<M: ProtoMap>(&mut self, key: impl Into<FieldKey>, map: &M) -> Result<(), EncodeError> {
        let field = self.claim(key.into())?;
        let ctx = self.ctx.child(PathSegment::Field(field));
        let mut entries = Vec::with_capacity(map.entry_count());
        map.for_each_entry(|key, value| {
            let mut payload = BytesMut::new();
            encode_entry(&ctx.child(PathSegment::Index(entries.len())), key, value, &mut payload)?;
            entries.push(payload);
            Ok(())
        })?;
        for payload in entries {
            self.write_record(field, WireType::Len, &payload, false);
        }
        Ok(())
    }

    /// Encode the active case of a oneof. `None` writes nothing.
    pub fn oneof<O: ProtoOneof>(&mut self, value: Option<&O>) -> Result<(), EncodeError> {
        let Some(value) = value else {
            return Ok(());
        };
        let mut cases = OneofEncoder::new(self);
        value.encode_case(&mut cases)?;
        cases.finish()
    }

    /// Write back fields that were preserved while decoding. The records
    /// are not checked against fields this message encodes itself.
    ///
    /// Fails with [`EncodeErrorKind::MalformedUnknownFields`] if `fields`
    /// does not split into whole records; nothing is written in that case.
    pub fn unknown(&mut self, fields: &Bytes) -> Result<(), EncodeError> {
        let mut rest = fields.clone();
        let mut records = Vec::new();
        while !rest.is_empty() {
            let start = fields.len() - rest.len();
            let field = next_record(&mut rest).map_err(|kind| {
                self.ctx
                    .error(EncodeErrorKind::MalformedUnknownFields { kind })
            })?;
            records.push((field, start..fields.len() - rest.len()));
        }
        for (field, range) in records {
            self.push_raw(field, &fields[range]);
        }
        Ok(())
    }

    /// Returns the encoded message, without a length prefix.
    pub fn finish(self) -> Result<BytesMut, EncodeError> {
        if !self.ctx.options().sort_fields_during_encoding {
            return Ok(self.buf);
        }

        let mut records = self.records;
        records.sort_by_key(|record| record.field);
        let mut sorted = BytesMut::with_capacity(self.buf.len());
        for record in &records {
            sorted.extend_from_slice(&self.buf[record.range.clone()]);
        }
        Ok(sorted)
    }

    /// Writes `value` even when it is the default, without claiming `field`.
    pub(crate) fn write_present<T: ProtoEncode>(
        &mut self,
        field: u32,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.write_value(field, value, false)
    }

    /// Resolves `key` to a field number and claims it for this message.
    fn claim(&mut self, key: FieldKey) -> Result<u32, EncodeError> {
        let field = self.resolve(key)?;
        self.claim_field(field)?;
        Ok(field)
    }

    pub(crate) fn claim_field(&mut self, field: u32) -> Result<(), EncodeError> {
        if !self.claimed.insert(field) {
            return Err(self.ctx.error(EncodeErrorKind::MultipleValues { field }));
        }
        Ok(())
    }

    /// Maps `key` to a valid field number.
    pub(crate) fn resolve(&self, key: FieldKey) -> Result<u32, EncodeError> {
        let name = match key {
            FieldKey::Number(number) => {
                return validate_field_number(u64::from(number))
                    .map_err(|kind| self.ctx.error(kind));
            }
            FieldKey::Name(name) => name,
        };

        // Errors for a textual key point at the key as written.
        let ctx = self.ctx.child(PathSegment::Name(name.clone()));
        let number = match name.parse::<u64>() {
            Ok(number) if !self.ctx.options().require_integer_field_keys => number,
            _ => {
                let kind = EncodeErrorKind::MissingIntegerKey { key: name.into_owned() };
                return Err(ctx.error(kind));
            }
        };
        validate_field_number(number).map_err(|kind| ctx.error(kind))
    }

    fn write_value<T: ProtoEncode>(
        &mut self,
        field: u32,
        value: &T,
        omittable: bool,
    ) -> Result<(), EncodeError> {
        let ctx = self.ctx.child(PathSegment::Field(field));
        self.write_value_at(&ctx, field, value, omittable)
    }

    fn write_value_at<T: ProtoEncode>(
        &mut self,
        ctx: &EncodeContext<'a>,
        field: u32,
        value: &T,
        omittable: bool,
    ) -> Result<(), EncodeError> {
        let omit = omittable && self.ctx.options().omit_default_values;
        if omit && value.is_proto_default() {
            return Ok(());
        }

        if T::WIRE_TYPE == WireType::Len {
            let mut payload = BytesMut::new();
            value.encode(ctx, &mut payload)?;
            if omit && payload.is_empty() {
                return Ok(());
            }
            self.write_record(field, WireType::Len, &payload, false);
        } else {
            let start = self.buf.len();
            encode_key(T::WIRE_TYPE, field, &mut self.buf);
            let payload_start = self.buf.len();
            value.encode(ctx, &mut self.buf)?;
            let len = self.buf.len() - payload_start;
            self.push_record(field, start, T::WIRE_TYPE, len, false);
        }
        Ok(())
    }

    /// One record per element, defaults included.
    fn write_each<T: ProtoEncode>(&mut self, field: u32, values: &[T]) -> Result<(), EncodeError> {
        let ctx = self.ctx.child(PathSegment::Field(field));
        for (idx, value) in values.iter().enumerate() {
            self.write_value_at(&ctx.child(PathSegment::Index(idx)), field, value, false)?;
        }
        Ok(())
    }

    fn write_nil(&mut self, field: u32) -> Result<(), EncodeError> {
        let marker = nil_marker_field(field).map_err(|kind| self.ctx.error(kind))?;
        self.write_record(marker, WireType::Nil, &[], true);
        Ok(())
    }

    fn write_record(&mut self, field: u32, wire_type: WireType, payload: &[u8], nil: bool) {
        let start = self.buf.len();
        encode_key(wire_type, field, &mut self.buf);
        if wire_type == WireType::Len {
            frame(payload, &mut self.buf);
        } else {
            self.buf.extend_from_slice(payload);
        }
        self.push_record(field, start, wire_type, payload.len(), nil);
    }

    fn push_record(&mut self, field: u32, start: usize, wire_type: WireType, len: usize, nil: bool) {
        self.records.push(EncodedRecord {
            field,
            range: start..self.buf.len(),
        });
        self.ctx.observer().field_encoded(&FieldEvent {
            path: self.ctx.path(),
            field,
            wire_type,
            len,
            nil,
        });
    }

    fn push_raw(&mut self, field: u32, raw: &[u8]) {
        let start = self.buf.len();
        self.buf.extend_from_slice(raw);
        self.records.push(EncodedRecord {
            field,
            range: start..self.buf.len(),
        });
    }
}

/// Advances `buf` past one record, returning its field number.
fn next_record(buf: &mut Bytes) -> Result<u32, crate::error::DecodeErrorKind> {
    let (wire_type, field) = decode_key(buf)?.into_parts();
    take_payload(wire_type, buf)?;
    Ok(field)
}

impl fmt::Debug for MessageEncoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEncoder")
            .field("path", self.ctx.path())
            .field("len", &self.buf.len())
            .field("claimed", &self.claimed)
            .finish()
    }
}

/// Encode `msg` with the default [`EncodeOptions`].
pub fn encode<M: ProtoMessage>(msg: &M) -> Result<Bytes, EncodeError> {
    Encoder::default().encode(msg)
}
