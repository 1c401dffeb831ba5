//! Coding paths: where in a value tree an error happened.

use std::borrow::Cow;
use std::fmt;

/// One step from a parent value into a child value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A field addressed by its field number.
    Field(u32),
    /// A field addressed by name, only seen when the caller supplied a name key.
    Name(Cow<'static, str>),
    /// An element of a repeated field, or an entry of a map.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(number) => write!(f, ".{number}"),
            PathSegment::Name(name) => write!(f, ".{name}"),
            PathSegment::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// The chain of [`PathSegment`]s from the root message to a value.
///
/// Rendered as `$` for the root, e.g. `$.4[2].1` is field 1 of the third
/// element of field 4.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CodingPath(Vec<PathSegment>);

impl CodingPath {
    /// The path of the root message.
    pub fn root() -> Self {
        CodingPath(Vec::new())
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment);
        CodingPath(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of nested values between the root and this path.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for CodingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for CodingPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        CodingPath(iter.into_iter().collect())
    }
}
