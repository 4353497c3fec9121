//! Field validation for point-of-interest drafts.
//!
//! # Responsibility
//! - Check field constraints and the cross-field name/description rule.
//! - Report every violation at once, keyed by field name.
//!
//! # Invariants
//! - Validation is pure: no I/O, no mutation, deterministic for its input.
//! - Rules are applied independently; nothing short-circuits.

use crate::model::city::{PointOfInterestDraft, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Field key used for `name` violations.
pub const FIELD_NAME: &str = "name";
/// Field key used for `description` violations, including the name/description clash.
pub const FIELD_DESCRIPTION: &str = "description";

/// Ordered mapping from field name to human-readable messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one message under `field`, keeping earlier messages.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns messages recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates fields in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Comma-separated field names, for metadata-only log lines.
    pub fn field_list(&self) -> String {
        self.0.keys().cloned().collect::<Vec<_>>().join(",")
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Outcome of validating one candidate resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(FieldErrors),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Converts into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(errors) => Err(errors),
        }
    }
}

/// Validates a point-of-interest draft.
///
/// Rules:
/// - `name` must be non-blank and at most 50 characters.
/// - `description`, when present, must be at most 200 characters.
/// - `name` must differ from `description` (reported under `description`).
pub fn validate_point_of_interest(draft: &PointOfInterestDraft) -> ValidationResult {
    let mut errors = FieldErrors::new();

    if draft.name.trim().is_empty() {
        errors.add(FIELD_NAME, "name is required");
    } else if draft.name.chars().count() > NAME_MAX_CHARS {
        errors.add(
            FIELD_NAME,
            format!("name must be at most {NAME_MAX_CHARS} characters"),
        );
    }

    if let Some(description) = draft.description.as_deref() {
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.add(
                FIELD_DESCRIPTION,
                format!("description must be at most {DESCRIPTION_MAX_CHARS} characters"),
            );
        }
        if description == draft.name {
            errors.add(
                FIELD_DESCRIPTION,
                "the description field cannot be equal to the name",
            );
        }
    }

    if errors.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid(errors)
    }
}
