//! Resource management core for CityInfo.
//! Cities own points of interest; this crate is the single source of truth
//! for their validation, patching, id assignment and persistence contracts.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod patch;
pub mod repo;
pub mod service;

pub use api::{handle_request, ApiRequest, ApiResponse, Method, Route};
pub use config::{CoreConfig, StoreBackend};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::city::{City, CityId, PointOfInterest, PointOfInterestDraft, PointOfInterestId};
pub use model::validation::{validate_point_of_interest, FieldErrors, ValidationResult};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use patch::{apply_patch, FieldPath, PatchDocument, PatchError, PatchOperation};
pub use repo::city_repo::{CityRepository, RepoError, RepoResult, SqliteCityRepository};
pub use repo::memory_repo::InMemoryCityRepository;
pub use service::point_of_interest_service::{
    NotFoundTarget, PointOfInterestService, ServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
