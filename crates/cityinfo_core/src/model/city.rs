//! City and point-of-interest domain model.
//!
//! # Responsibility
//! - Define the two-level resource shape served by core (city -> points of interest).
//! - Provide the id-less draft shape used by create/update bodies and patching.
//!
//! # Invariants
//! - `PointOfInterest::id` is unique across every city, not only its owner.
//! - Ids are never reassigned while their row exists; deleting the highest
//!   id lets the next create hand it out again.
//! - A city exclusively owns its points of interest.

use serde::{Deserialize, Serialize};

/// Stable identifier of a seeded city.
pub type CityId = i64;

/// Store-wide identifier of a point of interest.
pub type PointOfInterestId = i64;

/// Maximum accepted length for `name` fields, in characters.
pub const NAME_MAX_CHARS: usize = 50;
/// Maximum accepted length for `description` fields, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Top-level resource owning an ordered collection of points of interest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub description: Option<String>,
    /// Insertion order is kept for display only.
    ///
    /// Empty when the city was loaded without children; callers must not
    /// read that as "city has no points of interest".
    #[serde(default)]
    pub points_of_interest: Vec<PointOfInterest>,
}

impl City {
    /// Creates a city without points of interest.
    pub fn new(id: CityId, name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.map(str::to_string),
            points_of_interest: Vec::new(),
        }
    }

    /// Returns a copy with `points_of_interest` cleared.
    pub fn without_points_of_interest(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            points_of_interest: Vec::new(),
        }
    }
}

/// Child resource owned by exactly one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: PointOfInterestId,
    pub name: String,
    pub description: Option<String>,
}

impl PointOfInterest {
    /// Builds a stored point of interest from an accepted draft.
    pub fn from_draft(id: PointOfInterestId, draft: PointOfInterestDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
        }
    }

    /// Returns a field-level copy without the id.
    pub fn to_draft(&self) -> PointOfInterestDraft {
        PointOfInterestDraft {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Overwrites every scalar field from `draft` (full replace, not merge).
    pub fn apply_draft(&mut self, draft: PointOfInterestDraft) {
        self.name = draft.name;
        self.description = draft.description;
    }
}

/// Id-less point-of-interest fields, as received in create/update bodies.
///
/// Missing JSON fields fall back to defaults so that validation, not parsing,
/// reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterestDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PointOfInterestDraft {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }
}
