//! Knobs for the [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder).

/// Configuration for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Skip scalar fields holding their default value.
    pub(crate) omit_default_values: bool,
    /// Reject field keys that are names instead of field numbers.
    pub(crate) require_integer_field_keys: bool,
    /// Reorder the fields of every message by field number.
    pub(crate) sort_fields_during_encoding: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            omit_default_values: true,
            require_integer_field_keys: true,
            sort_fields_during_encoding: false,
        }
    }
}

impl EncodeOptions {
    /// Create a new [`EncodeOptions`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether fields equal to their type's default are left out of the output.
    ///
    /// Defaults to `true`, which matches standard protobuf encoders.
    pub fn omit_default_values(&mut self, omit: bool) -> &mut Self {
        self.omit_default_values = omit;
        self
    }

    /// Whether a field key given as a name is an error.
    ///
    /// When disabled, names must still parse as a field number.
    pub fn require_integer_field_keys(&mut self, require: bool) -> &mut Self {
        self.require_integer_field_keys = require;
        self
    }

    /// Whether fields are emitted in ascending field number order, instead of
    /// the order the message visited them in.
    pub fn sort_fields_during_encoding(&mut self, sort: bool) -> &mut Self {
        self.sort_fields_during_encoding = sort;
        self
    }
}

/// Configuration for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting depth of messages.
    pub(crate) recursion_limit: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
        }
    }
}

impl DecodeOptions {
    /// Create a new [`DecodeOptions`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of nested messages the decoder descends into.
    pub fn recursion_limit(&mut self, limit: usize) -> &mut Self {
        self.recursion_limit = limit;
        self
    }
}
