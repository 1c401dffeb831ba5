//! Protocol Buffers wire format codec with explicit null tracking.
//!
//! Messages implement [`ProtoMessage`](codec::ProtoMessage), usually through
//! `#[derive(ProtoMessage)]`, and are turned into bytes by an [`Encoder`]
//! and back by a [`Decoder`]. The output is standard protobuf, plus two
//! extensions that only appear when a message uses them:
//!
//! * `Option<T>` fields marked `optional` write a nil marker at field
//!   number `n + 32767` when they are `None`, so null and "default" stay
//!   distinguishable.
//! * `Vec<Option<T>>` fields carry a nil index set ahead of their values.
//!
//! ```ignore
//! use protonil::ProtoMessage;
//!
//! #[derive(Debug, Default, PartialEq, ProtoMessage)]
//! struct User {
//!     #[proto(tag = 1)]
//!     id: u64,
//!     #[proto(tag = 2, optional)]
//!     nickname: Option<String>,
//! }
//!
//! let user = User { id: 7, nickname: None };
//! let bytes = protonil::encode(&user)?;
//! assert_eq!(protonil::decode::<User>(bytes)?, user);
//! ```

#![deny(clippy::as_conversions)]

extern crate self as protonil;

pub mod codec;
pub mod error;
pub mod leb128;
pub mod observe;
pub mod options;
pub mod path;
pub mod table;
pub mod wire;

mod decoder;
mod encoder;
mod util;

pub use bytes;

pub use decoder::{decode, DecodeContext, Decoder, MessageDecoder};
pub use encoder::{encode, EncodeContext, Encoder, FieldKey, MessageEncoder};
pub use error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
pub use options::{DecodeOptions, EncodeOptions};

#[cfg(feature = "derive")]
pub use protonil_derive::{ProtoMessage, ProtoOneof};
