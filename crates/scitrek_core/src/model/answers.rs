//! Answer blob store for one lesson page.
//!
//! # Responsibility
//! - Hold the student's answers for one module behind copy-on-write sharing.
//! - Provide typed (closure) and string-path mutation APIs.
//! - Merge saved blobs over page defaults during hydration.
//!
//! # Invariants
//! - Stored answers are always JSON-serializable.
//! - Mutation never affects a previously captured snapshot.
//! - Hydration keeps default-only fields and takes saved values for shared
//!   fields.
//! - A path write either lands where a later `get` finds it or fails.

use crate::model::path::{get_in, set_in, FieldPath, PathError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Declared answer shape of one lesson page.
///
/// Each page owns its own shape; there is no cross-page schema.
pub trait AnswerShape: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Page defaults used before (and underneath) any saved data.
    fn defaults() -> Self;

    /// Restores structural guarantees after reading stored data, such as
    /// list lengths that typed edits index into.
    fn normalize(&mut self) {}
}

/// Free-form shape for pages without a typed declaration.
impl AnswerShape for Value {
    fn defaults() -> Self {
        Value::Object(Map::new())
    }
}

/// Answer store errors.
#[derive(Debug)]
pub enum AnswerError {
    Path(PathError),
    /// Value could not be converted to or from JSON.
    Serialize(serde_json::Error),
    /// Mutated blob no longer fits the page's declared shape.
    Shape(serde_json::Error),
    /// Path is not part of the page's declared shape.
    Unmapped(String),
}

impl Display for AnswerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "answers are not serializable: {err}"),
            Self::Shape(err) => write!(f, "answers do not match page shape: {err}"),
            Self::Unmapped(path) => write!(f, "field `{path}` is not part of the page shape"),
        }
    }
}

impl Error for AnswerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Path(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Shape(err) => Some(err),
            Self::Unmapped(_) => None,
        }
    }
}

impl From<PathError> for AnswerError {
    fn from(value: PathError) -> Self {
        Self::Path(value)
    }
}

/// In-memory answers for one mounted page.
#[derive(Debug, Clone)]
pub struct AnswerStore<A: AnswerShape> {
    current: Arc<A>,
}

impl<A: AnswerShape> AnswerStore<A> {
    /// Creates a store holding the page defaults.
    pub fn new() -> Self {
        Self::with_answers(A::defaults())
    }

    pub fn with_answers(answers: A) -> Self {
        Self {
            current: Arc::new(answers),
        }
    }

    /// Returns a shared handle to the current answers.
    ///
    /// The handle keeps its content even if the store is edited afterwards.
    pub fn snapshot(&self) -> Arc<A> {
        Arc::clone(&self.current)
    }

    pub fn answers(&self) -> &A {
        &self.current
    }

    /// Applies a typed edit.
    ///
    /// Clones the answers first when any snapshot is still held.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut A) -> R) -> R {
        edit(Arc::make_mut(&mut self.current))
    }

    /// Reads one field by dot/bracket path.
    pub fn get(&self, path: &str) -> Result<Option<Value>, AnswerError> {
        let path = FieldPath::parse(path)?;
        let blob = self.to_value()?;
        Ok(get_in(&blob, &path).cloned())
    }

    /// Writes one field by dot/bracket path, creating missing containers.
    ///
    /// On error the store is left untouched. A write the shape would
    /// silently drop is rejected with [`AnswerError::Unmapped`].
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), AnswerError> {
        let path = FieldPath::parse(path)?;
        let mut blob = self.to_value()?;
        set_in(&mut blob, &path, value);
        let mut next = serde_json::from_value::<A>(blob).map_err(AnswerError::Shape)?;
        next.normalize();

        let stored = serde_json::to_value(&next).map_err(AnswerError::Serialize)?;
        if get_in(&stored, &path).is_none() {
            return Err(AnswerError::Unmapped(path.to_string()));
        }
        self.current = Arc::new(next);
        Ok(())
    }

    /// Replaces the content with `saved` merged over the page defaults.
    pub fn hydrate(&mut self, saved: Value) -> Result<(), AnswerError> {
        let merged = merge_over_defaults::<A>(saved)?;
        self.current = Arc::new(merged);
        Ok(())
    }

    /// Serializes the current answers into a JSON blob.
    pub fn to_value(&self) -> Result<Value, AnswerError> {
        serde_json::to_value(self.current.as_ref()).map_err(AnswerError::Serialize)
    }

    /// Share of non-blank text answers, in whole percent.
    pub fn progress_percent(&self) -> Result<u8, AnswerError> {
        Ok(progress_percent(&self.to_value()?))
    }
}

impl<A: AnswerShape> Default for AnswerStore<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Merges a saved blob over `A::defaults()`.
///
/// Only top-level keys are overlaid, so a saved list replaces the default
/// list as a whole; the shape's `normalize` then restores list lengths.
/// A saved blob that is not an object leaves the defaults.
pub fn merge_over_defaults<A: AnswerShape>(saved: Value) -> Result<A, AnswerError> {
    let mut base = serde_json::to_value(A::defaults()).map_err(AnswerError::Serialize)?;
    if let (Value::Object(base_map), Value::Object(saved_map)) = (&mut base, saved) {
        for (key, value) in saved_map {
            base_map.insert(key, value);
        }
    }
    let mut merged = serde_json::from_value::<A>(base).map_err(AnswerError::Shape)?;
    merged.normalize();
    Ok(merged)
}

/// Extracts the answers object from a response-detail payload.
///
/// Accepts `{ "answers": {...} }` and the legacy double-wrapped
/// `{ "answers": { "answers": {...} } }`. Returns `None` when the payload
/// carries no answers.
pub fn unwrap_answers_payload(payload: Value) -> Option<Value> {
    let Value::Object(mut outer) = payload else {
        return None;
    };
    let answers = outer.remove("answers")?;
    match answers {
        Value::Null => None,
        Value::Object(mut inner) if inner.get("answers").is_some_and(Value::is_object) => {
            inner.remove("answers")
        }
        other => Some(other),
    }
}

/// Computes the share of non-blank string leaves in `blob`.
///
/// Returns 0 when the blob has no string leaves.
pub fn progress_percent(blob: &Value) -> u8 {
    let mut total = 0usize;
    let mut filled = 0usize;
    count_text_leaves(blob, &mut total, &mut filled);
    if total == 0 {
        return 0;
    }
    ((filled as f64 / total as f64) * 100.0).round() as u8
}

fn count_text_leaves(value: &Value, total: &mut usize, filled: &mut usize) {
    match value {
        Value::String(text) => {
            *total += 1;
            if !text.trim().is_empty() {
                *filled += 1;
            }
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| count_text_leaves(item, total, filled)),
        Value::Object(map) => map
            .values()
            .for_each(|item| count_text_leaves(item, total, filled)),
        _ => {}
    }
}
