//! Hooks for watching fields flow through the codec.
//!
//! An observer is handed to an [`Encoder`](crate::Encoder) or
//! [`Decoder`](crate::Decoder) and sees every field record written or read.

use std::sync::Arc;

use crate::path::CodingPath;
use crate::wire::WireType;

/// A single field record passing through the codec.
#[derive(Debug, Clone, Copy)]
pub struct FieldEvent<'a> {
    /// Path of the message holding the field.
    pub path: &'a CodingPath,
    /// Field number as written on the wire, shifted for nil markers.
    pub field: u32,
    pub wire_type: WireType,
    /// Payload length, not counting the key or a length prefix.
    pub len: usize,
    /// Whether the record is a nil marker.
    pub nil: bool,
}

/// Receives [`FieldEvent`]s. Every method defaults to doing nothing.
pub trait CodecObserver: Send + Sync {
    fn field_encoded(&self, _event: &FieldEvent<'_>) {}

    fn field_decoded(&self, _event: &FieldEvent<'_>) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CodecObserver for NoopObserver {}

/// Observer that emits a `TRACE` level [`tracing`] event per field.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl CodecObserver for TracingObserver {
    fn field_encoded(&self, event: &FieldEvent<'_>) {
        tracing::trace!(
            path = %event.path,
            field = event.field,
            wire_type = ?event.wire_type,
            len = event.len,
            nil = event.nil,
            "encoded field"
        );
    }

    fn field_decoded(&self, event: &FieldEvent<'_>) {
        tracing::trace!(
            path = %event.path,
            field = event.field,
            wire_type = ?event.wire_type,
            len = event.len,
            nil = event.nil,
            "decoded field"
        );
    }
}

/// Observer installed when none is given: [`TracingObserver`] if the
/// `tracing` feature is enabled, [`NoopObserver`] otherwise.
pub(crate) fn default_observer() -> Arc<dyn CodecObserver> {
    #[cfg(feature = "tracing")]
    {
        Arc::new(TracingObserver)
    }
    #[cfg(not(feature = "tracing"))]
    {
        Arc::new(NoopObserver)
    }
}
