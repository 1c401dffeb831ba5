//! Encode and decode errors.
//!
//! Low level helpers ([`crate::leb128`], [`crate::wire`]) return a bare
//! [`DecodeErrorKind`] or [`EncodeErrorKind`]; the message encoder and
//! decoder attach the [`CodingPath`] of the value being processed.

use thiserror::Error;

use crate::codec::ValueKind;
use crate::path::CodingPath;
use crate::wire::WireType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("unexpected end of input")]
    PrematureEnd,
    #[error("value out of range")]
    OutOfRange,
    #[error("invalid size: {actual} bytes where {width}-byte values were expected")]
    InvalidSize { width: usize, actual: usize },
    #[error("invalid UTF-8 in string field")]
    InvalidString,
    #[error("field {field} was requested more than once")]
    MultipleContainers { field: u32 },
    #[error("deprecated group encoding not supported")]
    DeprecatedGroupEncoding,
    #[error("unexpected wire type {actual:?}, expected {expected:?}")]
    UnexpectedWireType { expected: WireType, actual: WireType },
    #[error("invalid map entry: {reason}")]
    InvalidMapEntry { reason: &'static str },
    #[error("{kind:?} values cannot be used as map keys")]
    UnsupportedMapKey { kind: ValueKind },
    #[error("nil index {index} is out of order")]
    InvalidNilIndex { index: u64 },
    #[error("missing required oneof field '{field}'")]
    MissingRequiredOneof { field: &'static str },
    #[error("length prefix {value} exceeds platform addressable memory")]
    LengthOverflow { value: u64 },
    #[error("integer overflow: value does not fit in {target_type}")]
    IntegerOverflow { target_type: &'static str },
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize },
}

/// A [`DecodeErrorKind`] along with the location it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {path}: {kind}")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    path: CodingPath,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, path: CodingPath) -> Self {
        DecodeError { kind, path }
    }

    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        DecodeError::new(kind, CodingPath::root())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeErrorKind {
    #[error("field key '{key}' is not an integer field number")]
    MissingIntegerKey { key: String },
    #[error("field number {field} is outside of the valid range")]
    FieldNumberOutOfRange { field: u64 },
    #[error("field number {field} is in the reserved range")]
    ReservedFieldNumber { field: u32 },
    #[error("oneof already holds field {first}, cannot also encode field {second}")]
    MultipleValuesInOneof { first: u32, second: u32 },
    #[error("oneof holds no value")]
    NoValueInOneof,
    #[error("{kind:?} values cannot be used as map keys")]
    UnsupportedMapKey { kind: ValueKind },
    #[error("field {field} was encoded more than once")]
    MultipleValues { field: u32 },
    #[error("preserved unknown fields are malformed: {kind}")]
    MalformedUnknownFields { kind: DecodeErrorKind },
}

/// An [`EncodeErrorKind`] along with the location it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to encode {path}: {kind}")]
pub struct EncodeError {
    kind: EncodeErrorKind,
    path: CodingPath,
}

impl EncodeError {
    pub fn new(kind: EncodeErrorKind, path: CodingPath) -> Self {
        EncodeError { kind, path }
    }

    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }
}

impl From<EncodeErrorKind> for EncodeError {
    fn from(kind: EncodeErrorKind) -> Self {
        EncodeError::new(kind, CodingPath::root())
    }
}
