//! Partial-update (JSON Patch) engine for point-of-interest drafts.
//!
//! # Responsibility
//! - Parse RFC 6902 style patch documents into operations.
//! - Resolve operation paths and apply the ordered list to a draft snapshot.
//!
//! # Invariants
//! - Application is all-or-nothing: the input snapshot is never mutated and
//!   a failing operation discards every earlier one.
//! - Only the closed set of `FieldPath` targets is addressable; other paths
//!   fail at application time, not at parse time.
//! - Success says nothing about semantic validity; callers re-run validation.

use crate::model::city::PointOfInterestDraft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PatchResult<T> = Result<T, PatchError>;

/// Structural failure of a patch document or one of its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Document is not a JSON array of well-formed operations.
    Malformed(String),
    /// Operation addresses a path outside the point-of-interest fields.
    UnsupportedPath { index: usize, path: String },
    /// Operation value has the wrong JSON type for its target field.
    InvalidValue { path: FieldPath, reason: String },
    /// `test` operation found a different current value.
    TestFailed { index: usize, path: FieldPath },
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(details) => write!(f, "malformed patch document: {details}"),
            Self::UnsupportedPath { index, path } => {
                write!(f, "operation #{index} addresses unsupported path `{path}`")
            }
            Self::InvalidValue { path, reason } => {
                write!(f, "invalid value for `{path}`: {reason}")
            }
            Self::TestFailed { index, path } => {
                write!(f, "test operation #{index} failed for `{path}`")
            }
        }
    }
}

impl Error for PatchError {}

/// Addressable point-of-interest field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Name,
    Description,
}

impl FieldPath {
    /// JSON pointer form of this path.
    pub fn as_pointer(self) -> &'static str {
        match self {
            Self::Name => "/name",
            Self::Description => "/description",
        }
    }

    /// Parses a JSON pointer; property names match case-insensitively.
    pub fn parse(pointer: &str) -> Option<Self> {
        let property = pointer.strip_prefix('/')?;
        match property.to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "description" => Some(Self::Description),
            _ => None,
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_pointer())
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.as_pointer().to_string()
    }
}

/// One patch instruction as received.
///
/// `path` and `from` stay raw JSON pointers until `apply_patch` resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
    Test { path: String, value: Value },
    Copy { from: String, path: String },
    Move { from: String, path: String },
}

impl PatchOperation {
    pub fn replace(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn test(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::Test {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: FieldPath) -> Self {
        Self::Remove { path: path.into() }
    }

    pub fn copy(from: FieldPath, path: FieldPath) -> Self {
        Self::Copy {
            from: from.into(),
            path: path.into(),
        }
    }

    pub fn move_to(from: FieldPath, path: FieldPath) -> Self {
        Self::Move {
            from: from.into(),
            path: path.into(),
        }
    }
}

/// Ordered list of patch operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchDocument(pub Vec<PatchOperation>);

impl PatchDocument {
    /// Parses a JSON array of operations.
    ///
    /// Unknown ops and missing members surface as `PatchError::Malformed`.
    /// Paths are not checked here.
    pub fn from_json(json: &str) -> PatchResult<Self> {
        serde_json::from_str(json).map_err(|err| PatchError::Malformed(err.to_string()))
    }

    pub fn from_value(value: Value) -> PatchResult<Self> {
        serde_json::from_value(value).map_err(|err| PatchError::Malformed(err.to_string()))
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.0
    }
}

/// Applies `ops` in order to a copy of `snapshot`.
///
/// Returns the patched copy, or the first error. `snapshot` is never touched.
pub fn apply_patch(
    snapshot: &PointOfInterestDraft,
    ops: &[PatchOperation],
) -> PatchResult<PointOfInterestDraft> {
    let mut working = snapshot.clone();

    for (index, op) in ops.iter().enumerate() {
        match op {
            PatchOperation::Add { path, value } | PatchOperation::Replace { path, value } => {
                set_field(&mut working, resolve(index, path)?, value)?;
            }
            PatchOperation::Remove { path } => clear_field(&mut working, resolve(index, path)?),
            PatchOperation::Test { path, value } => {
                let path = resolve(index, path)?;
                if !field_equals(&working, path, value) {
                    return Err(PatchError::TestFailed { index, path });
                }
            }
            PatchOperation::Copy { from, path } => {
                let from = resolve(index, from)?;
                let path = resolve(index, path)?;
                let value = read_field(&working, from);
                set_field(&mut working, path, &value)?;
            }
            PatchOperation::Move { from, path } => {
                let from = resolve(index, from)?;
                let path = resolve(index, path)?;
                if from == path {
                    continue;
                }
                let value = read_field(&working, from);
                set_field(&mut working, path, &value)?;
                clear_field(&mut working, from);
            }
        }
    }

    Ok(working)
}

fn resolve(index: usize, pointer: &str) -> PatchResult<FieldPath> {
    FieldPath::parse(pointer).ok_or_else(|| PatchError::UnsupportedPath {
        index,
        path: pointer.to_string(),
    })
}

fn read_field(draft: &PointOfInterestDraft, path: FieldPath) -> Value {
    match path {
        FieldPath::Name => Value::String(draft.name.clone()),
        FieldPath::Description => draft
            .description
            .clone()
            .map_or(Value::Null, Value::String),
    }
}

fn set_field(draft: &mut PointOfInterestDraft, path: FieldPath, value: &Value) -> PatchResult<()> {
    match (path, value) {
        (FieldPath::Name, Value::String(text)) => draft.name = text.clone(),
        (FieldPath::Description, Value::String(text)) => draft.description = Some(text.clone()),
        (FieldPath::Description, Value::Null) => draft.description = None,
        (FieldPath::Name, other) => {
            return Err(PatchError::InvalidValue {
                path,
                reason: format!("expected string, got {}", json_type_name(other)),
            });
        }
        (FieldPath::Description, other) => {
            return Err(PatchError::InvalidValue {
                path,
                reason: format!("expected string or null, got {}", json_type_name(other)),
            });
        }
    }
    Ok(())
}

fn clear_field(draft: &mut PointOfInterestDraft, path: FieldPath) {
    match path {
        FieldPath::Name => draft.name.clear(),
        FieldPath::Description => draft.description = None,
    }
}

fn field_equals(draft: &PointOfInterestDraft, path: FieldPath, expected: &Value) -> bool {
    read_field(draft, path) == *expected
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
