//! Field path addressing for free-form answer blobs.
//!
//! # Responsibility
//! - Parse dot/bracket field paths such as `analogies[2].why`.
//! - Read and write nested JSON values by path.
//!
//! # Invariants
//! - `set_in` never fails for a well-formed path; missing intermediate
//!   containers are created on the way down.
//! - Index segments pad arrays with `null` up to the addressed slot.
//! - Indexes above `MAX_INDEX` are rejected at parse time, so a path can
//!   never force an oversized allocation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$\-]*)?((?:\[\d+\])*)$").expect("valid segment regex")
});
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("valid index regex"));

/// Largest array index a path may address.
pub const MAX_INDEX: usize = 1024;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member lookup.
    Key(String),
    /// Array element lookup.
    Index(usize),
}

/// Path parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    InvalidSegment(String),
    IndexOverflow(String),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "field path cannot be empty"),
            Self::InvalidSegment(segment) => write!(f, "invalid field path segment: `{segment}`"),
            Self::IndexOverflow(segment) => {
                write!(f, "field path index out of range: `{segment}`")
            }
        }
    }
}

impl Error for PathError {}

/// Parsed field path into an answer blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parses dot/bracket notation (`worksheet[0]`, `analogies[1].why`).
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for (position, part) in trimmed.split('.').enumerate() {
            let caps = SEGMENT_RE
                .captures(part)
                .ok_or_else(|| PathError::InvalidSegment(part.to_string()))?;
            let key = caps.get(1).map(|m| m.as_str());
            let indexes = caps.get(2).map(|m| m.as_str()).unwrap_or("");

            match key {
                Some(key) => segments.push(PathSegment::Key(key.to_string())),
                // A bare `[0]` is only meaningful at the root.
                None if position == 0 && !indexes.is_empty() => {}
                None => return Err(PathError::InvalidSegment(part.to_string())),
            }

            for index in INDEX_RE.captures_iter(indexes) {
                let digits = &index[1];
                let value = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|value| *value <= MAX_INDEX)
                    .ok_or_else(|| PathError::IndexOverflow(part.to_string()))?;
                segments.push(PathSegment::Index(value));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Reads the value at `path`, if every step exists.
pub fn get_in<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| match segment {
            PathSegment::Key(key) => current.as_object()?.get(key),
            PathSegment::Index(index) => current.as_array()?.get(*index),
        })
}

/// Writes `value` at `path`, creating intermediate containers as needed.
///
/// A scalar found where a container is required is replaced by an empty
/// container of the required kind.
pub fn set_in(root: &mut Value, path: &FieldPath, value: Value) {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            PathSegment::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                // Indexing an object by a missing key inserts `null`.
                &mut current[key.as_str()]
            }
            PathSegment::Index(index) => {
                match current.as_array_mut() {
                    Some(items) if items.len() <= *index => items.resize(index + 1, Value::Null),
                    Some(_) => {}
                    None => *current = Value::Array(vec![Value::Null; index + 1]),
                }
                &mut current[*index]
            }
        };
    }
    *current = value;
}
