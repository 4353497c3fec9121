//! Point-of-interest use-case service.
//!
//! # Responsibility
//! - Orchestrate validation, patching and store calls into CRUD use-cases.
//! - Assign point-of-interest ids and classify every failure.
//!
//! # Invariants
//! - Mutations hold the store write lock across read -> compute -> write -> save.
//! - New ids are `max(existing ids across every city) + 1`, starting at 1.
//! - Rejected writes (validation or patch failure) leave the store untouched.
//! - Store faults never cross this boundary in raw form.

use crate::model::city::{
    City, CityId, PointOfInterest, PointOfInterestDraft, PointOfInterestId,
};
use crate::model::validation::{validate_point_of_interest, FieldErrors};
use crate::notify::{LogNotifier, Notifier};
use crate::patch::{apply_patch, PatchError, PatchOperation};
use crate::repo::city_repo::{CityRepository, RepoError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Resource whose absence caused a `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundTarget {
    City(CityId),
    PointOfInterest {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::City(city_id) => write!(f, "city {city_id}"),
            Self::PointOfInterest { city_id, poi_id } => {
                write!(f, "point of interest {poi_id} in city {city_id}")
            }
        }
    }
}

/// Classified failure of a point-of-interest use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    NotFound(NotFoundTarget),
    /// Every field rule violation, never only the first.
    ValidationFailed(FieldErrors),
    /// Patch document was malformed or one of its operations failed.
    Patch(PatchError),
    /// Store fault; details are logged, not exposed.
    InfrastructureFailure,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "{target} not found"),
            Self::ValidationFailed(errors) => write!(f, "validation failed: {errors}"),
            Self::Patch(err) => write!(f, "{err}"),
            Self::InfrastructureFailure => write!(f, "city store failure"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Patch(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PatchError> for ServiceError {
    fn from(value: PatchError) -> Self {
        Self::Patch(value)
    }
}

/// Point-of-interest service over an injected store and notifier.
pub struct PointOfInterestService<R: CityRepository, N: Notifier = LogNotifier> {
    repo: RwLock<R>,
    notifier: N,
}

impl<R: CityRepository> PointOfInterestService<R, LogNotifier> {
    /// Creates a service that reports deletions to the core log.
    pub fn with_log_notifier(repo: R) -> Self {
        Self::new(repo, LogNotifier)
    }
}

impl<R: CityRepository, N: Notifier> PointOfInterestService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self {
            repo: RwLock::new(repo),
            notifier,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Runs `inspect` against the store under the read lock.
    pub fn with_repository<T>(&self, inspect: impl FnOnce(&R) -> T) -> ServiceResult<T> {
        let repo = self.read("repo_inspect")?;
        Ok(inspect(&repo))
    }

    /// Lists cities by name, without points of interest.
    pub fn list_cities(&self) -> ServiceResult<Vec<City>> {
        let repo = self.read("city_list")?;
        repo.list_cities().map_err(storage_failure("city_list"))
    }

    pub fn get_city(
        &self,
        city_id: CityId,
        include_points_of_interest: bool,
    ) -> ServiceResult<City> {
        let repo = self.read("city_get")?;
        repo.get_city(city_id, include_points_of_interest)
            .map_err(storage_failure("city_get"))?
            .ok_or(ServiceError::NotFound(NotFoundTarget::City(city_id)))
    }

    /// Lists a city's points of interest in store order.
    pub fn list_points_of_interest(&self, city_id: CityId) -> ServiceResult<Vec<PointOfInterest>> {
        let repo = self.read("poi_list")?;
        repo.list_points_of_interest(city_id)
            .map_err(storage_failure("poi_list"))?
            .ok_or(ServiceError::NotFound(NotFoundTarget::City(city_id)))
    }

    pub fn get_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> ServiceResult<PointOfInterest> {
        let repo = self.read("poi_get")?;
        find_point_of_interest(&*repo, city_id, poi_id, "poi_get")
    }

    /// Creates a point of interest and returns it with its assigned id.
    ///
    /// # Errors
    /// - `ValidationFailed` before any store access when the draft is invalid.
    /// - `NotFound` when the city is absent.
    pub fn create_point_of_interest(
        &self,
        city_id: CityId,
        draft: PointOfInterestDraft,
    ) -> ServiceResult<PointOfInterest> {
        ensure_valid(&draft, "poi_create")?;

        let mut repo = self.write("poi_create")?;
        if !repo
            .city_exists(city_id)
            .map_err(storage_failure("poi_create"))?
        {
            return Err(ServiceError::NotFound(NotFoundTarget::City(city_id)));
        }

        // Scoped to the whole store, not the target city.
        let next_id = repo
            .max_point_of_interest_id()
            .map_err(storage_failure("poi_create"))?
            .map_or(1, |max_id| max_id + 1);
        let created = PointOfInterest::from_draft(next_id, draft);

        if !repo
            .add_point_of_interest(city_id, created.clone())
            .map_err(storage_failure("poi_create"))?
        {
            return Err(ServiceError::NotFound(NotFoundTarget::City(city_id)));
        }
        repo.save().map_err(storage_failure("poi_create"))?;

        info!(
            "event=poi_create module=service status=ok city_id={} poi_id={}",
            city_id, created.id
        );
        Ok(created)
    }

    /// Replaces every field of an existing point of interest.
    ///
    /// A missing `description` in `draft` clears the stored one.
    pub fn update_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
        draft: PointOfInterestDraft,
    ) -> ServiceResult<()> {
        ensure_valid(&draft, "poi_update")?;

        let mut repo = self.write("poi_update")?;
        let mut stored = find_point_of_interest(&*repo, city_id, poi_id, "poi_update")?;
        stored.apply_draft(draft);
        write_back(&mut *repo, city_id, &stored, "poi_update")?;

        info!("event=poi_update module=service status=ok city_id={city_id} poi_id={poi_id}");
        Ok(())
    }

    /// Applies patch operations to an existing point of interest.
    ///
    /// The store is only written when the whole patch applies and the result
    /// passes validation.
    pub fn patch_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
        ops: &[PatchOperation],
    ) -> ServiceResult<()> {
        let mut repo = self.write("poi_patch")?;
        let mut stored = find_point_of_interest(&*repo, city_id, poi_id, "poi_patch")?;

        let patched = apply_patch(&stored.to_draft(), ops).map_err(|err| {
            warn!(
                "event=poi_patch module=service status=rejected city_id={city_id} poi_id={poi_id} reason={err}"
            );
            ServiceError::Patch(err)
        })?;
        ensure_valid(&patched, "poi_patch")?;

        stored.apply_draft(patched);
        write_back(&mut *repo, city_id, &stored, "poi_patch")?;

        info!(
            "event=poi_patch module=service status=ok city_id={city_id} poi_id={poi_id} ops={}",
            ops.len()
        );
        Ok(())
    }

    /// Deletes a point of interest and notifies the configured notifier.
    pub fn delete_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> ServiceResult<()> {
        let deleted = {
            let mut repo = self.write("poi_delete")?;
            let stored = find_point_of_interest(&*repo, city_id, poi_id, "poi_delete")?;
            if !repo
                .remove_point_of_interest(city_id, poi_id)
                .map_err(storage_failure("poi_delete"))?
            {
                return Err(ServiceError::NotFound(NotFoundTarget::PointOfInterest {
                    city_id,
                    poi_id,
                }));
            }
            repo.save().map_err(storage_failure("poi_delete"))?;
            stored
        };

        info!("event=poi_delete module=service status=ok city_id={city_id} poi_id={poi_id}");
        self.notifier.notify(
            "Point of interest deleted.",
            &format!(
                "Point of interest {} with id {} was deleted.",
                deleted.name, deleted.id
            ),
        );
        Ok(())
    }

    fn read(&self, event: &'static str) -> ServiceResult<RwLockReadGuard<'_, R>> {
        self.repo.read().map_err(|_| {
            error!("event={event} module=service status=error error_code=lock_poisoned");
            ServiceError::InfrastructureFailure
        })
    }

    fn write(&self, event: &'static str) -> ServiceResult<RwLockWriteGuard<'_, R>> {
        self.repo.write().map_err(|_| {
            error!("event={event} module=service status=error error_code=lock_poisoned");
            ServiceError::InfrastructureFailure
        })
    }
}

fn find_point_of_interest<R: CityRepository + ?Sized>(
    repo: &R,
    city_id: CityId,
    poi_id: PointOfInterestId,
    event: &'static str,
) -> ServiceResult<PointOfInterest> {
    if !repo.city_exists(city_id).map_err(storage_failure(event))? {
        return Err(ServiceError::NotFound(NotFoundTarget::City(city_id)));
    }
    repo.get_point_of_interest(city_id, poi_id)
        .map_err(storage_failure(event))?
        .ok_or(ServiceError::NotFound(NotFoundTarget::PointOfInterest {
            city_id,
            poi_id,
        }))
}

fn write_back<R: CityRepository + ?Sized>(
    repo: &mut R,
    city_id: CityId,
    poi: &PointOfInterest,
    event: &'static str,
) -> ServiceResult<()> {
    if !repo
        .update_point_of_interest(city_id, poi)
        .map_err(storage_failure(event))?
    {
        return Err(ServiceError::NotFound(NotFoundTarget::PointOfInterest {
            city_id,
            poi_id: poi.id,
        }));
    }
    repo.save().map_err(storage_failure(event))
}

fn ensure_valid(draft: &PointOfInterestDraft, event: &'static str) -> ServiceResult<()> {
    validate_point_of_interest(draft)
        .into_result()
        .map_err(|errors| {
            warn!(
                "event={event} module=service status=invalid fields={}",
                errors.field_list()
            );
            ServiceError::ValidationFailed(errors)
        })
}

fn storage_failure(event: &'static str) -> impl FnOnce(RepoError) -> ServiceError {
    move |err| {
        error!("event={event} module=service status=error error_code=store_failure error={err}");
        ServiceError::InfrastructureFailure
    }
}
