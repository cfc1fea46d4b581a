//! Dotted field path resolution

use crate::value::{Document, Value};
use std::fmt;

/// Separator between nested field names in a column declaration
pub const PATH_SEPARATOR: char = '.';

/// A field reference split into its segments ahead of time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Split a dotted field reference, e.g. `"address.city"`
    pub fn parse(path: &str) -> Self {
        FieldPath {
            segments: path.split(PATH_SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the path reaches below the top level of a document
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Resolve `path` against `value`.
///
/// Every intermediate value must be a document; a scalar or an array on the
/// way short-circuits to `None`, as does a missing key. Arrays are never
/// indexed into. When the segments run out the current value is returned as
/// is, which may itself be `Value::Null` or a nested structure.
pub fn resolve<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        let Value::Document(doc) = current else {
            return None;
        };
        current = doc.get(segment)?;
    }
    Some(current)
}

/// Resolve `path` starting from a document's top level
pub fn resolve_in<'a>(doc: &'a Document, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        let Value::Document(inner) = current else {
            return None;
        };
        current = inner.get(segment)?;
    }
    Some(current)
}

/// Parse and resolve a dotted path in one step
pub fn resolve_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    resolve(value, &FieldPath::parse(path))
}
