//! Memory-resident city repository.
//!
//! # Invariants
//! - Mutations apply immediately; `save()` is a no-op that always succeeds.
//! - Points of interest keep insertion order inside their city.

use crate::model::city::{City, CityId, PointOfInterest, PointOfInterestId};
use crate::repo::city_repo::{CityRepository, RepoResult};
use crate::repo::seed::seed_cities;

/// City repository holding every row in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCityRepository {
    cities: Vec<City>,
}

impl InMemoryCityRepository {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    /// Repository pre-filled with the static city fixture.
    pub fn seeded() -> Self {
        Self::new(seed_cities())
    }

    fn city(&self, city_id: CityId) -> Option<&City> {
        self.cities.iter().find(|city| city.id == city_id)
    }

    fn city_mut(&mut self, city_id: CityId) -> Option<&mut City> {
        self.cities.iter_mut().find(|city| city.id == city_id)
    }
}

impl CityRepository for InMemoryCityRepository {
    fn list_cities(&self) -> RepoResult<Vec<City>> {
        let mut cities: Vec<City> = self
            .cities
            .iter()
            .map(City::without_points_of_interest)
            .collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(cities)
    }

    fn city_exists(&self, city_id: CityId) -> RepoResult<bool> {
        Ok(self.city(city_id).is_some())
    }

    fn get_city(
        &self,
        city_id: CityId,
        include_points_of_interest: bool,
    ) -> RepoResult<Option<City>> {
        Ok(self.city(city_id).map(|city| {
            if include_points_of_interest {
                city.clone()
            } else {
                city.without_points_of_interest()
            }
        }))
    }

    fn list_points_of_interest(
        &self,
        city_id: CityId,
    ) -> RepoResult<Option<Vec<PointOfInterest>>> {
        Ok(self.city(city_id).map(|city| city.points_of_interest.clone()))
    }

    fn get_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<Option<PointOfInterest>> {
        Ok(self.city(city_id).and_then(|city| {
            city.points_of_interest
                .iter()
                .find(|poi| poi.id == poi_id)
                .cloned()
        }))
    }

    fn max_point_of_interest_id(&self) -> RepoResult<Option<PointOfInterestId>> {
        Ok(self
            .cities
            .iter()
            .flat_map(|city| city.points_of_interest.iter())
            .map(|poi| poi.id)
            .max())
    }

    fn add_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: PointOfInterest,
    ) -> RepoResult<bool> {
        let Some(city) = self.city_mut(city_id) else {
            return Ok(false);
        };
        city.points_of_interest.push(poi);
        Ok(true)
    }

    fn update_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: &PointOfInterest,
    ) -> RepoResult<bool> {
        let stored = self.city_mut(city_id).and_then(|city| {
            city.points_of_interest
                .iter_mut()
                .find(|stored| stored.id == poi.id)
        });
        let Some(stored) = stored else {
            return Ok(false);
        };
        stored.apply_draft(poi.to_draft());
        Ok(true)
    }

    fn remove_point_of_interest(
        &mut self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<bool> {
        let Some(city) = self.city_mut(city_id) else {
            return Ok(false);
        };
        let before = city.points_of_interest.len();
        city.points_of_interest.retain(|poi| poi.id != poi_id);
        Ok(city.points_of_interest.len() != before)
    }

    fn save(&mut self) -> RepoResult<()> {
        Ok(())
    }
}
