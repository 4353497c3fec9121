//! City repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup and mutation primitives over cities and their points of interest.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Lookups return `None`/`false` for absent rows; errors mean infrastructure faults.
//! - SQLite writes are queued and committed by `save()` in one transaction.
//! - SQLite reads observe committed state only.
//! - Read paths reject persisted rows that cannot be converted.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::city::{City, CityId, PointOfInterest, PointOfInterestId};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type RepoResult<T> = Result<T, RepoError>;

/// Infrastructure failure raised by a city store.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    /// A thread panicked while holding the store connection.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted city data: {message}"),
            Self::LockPoisoned => write!(f, "city store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store contract shared by every city backend.
///
/// Reads take `&self`; mutations take `&mut self` so callers serialize them
/// behind a write lock. Mutations become durable on `save()`.
pub trait CityRepository {
    /// Lists cities by name ascending (ties by id), without points of interest.
    fn list_cities(&self) -> RepoResult<Vec<City>>;
    fn city_exists(&self, city_id: CityId) -> RepoResult<bool>;
    /// Gets one city; `points_of_interest` stays empty unless requested.
    fn get_city(&self, city_id: CityId, include_points_of_interest: bool)
        -> RepoResult<Option<City>>;
    /// Lists points of interest in insertion order; `None` when the city is absent.
    fn list_points_of_interest(&self, city_id: CityId)
        -> RepoResult<Option<Vec<PointOfInterest>>>;
    fn get_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<Option<PointOfInterest>>;
    /// Largest point-of-interest id across every city.
    fn max_point_of_interest_id(&self) -> RepoResult<Option<PointOfInterestId>>;
    /// Appends `poi` to the city; the id must already be assigned.
    ///
    /// Returns `false` when the city is absent.
    fn add_point_of_interest(&mut self, city_id: CityId, poi: PointOfInterest)
        -> RepoResult<bool>;
    /// Overwrites name and description of the stored row with `poi.id`.
    ///
    /// Returns `false` when the row is absent.
    fn update_point_of_interest(&mut self, city_id: CityId, poi: &PointOfInterest)
        -> RepoResult<bool>;
    /// Returns `false` (no-op) when the row is absent.
    fn remove_point_of_interest(
        &mut self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<bool>;
    /// Makes pending mutations durable.
    fn save(&mut self) -> RepoResult<()>;
}

impl<R: CityRepository + ?Sized> CityRepository for Box<R> {
    fn list_cities(&self) -> RepoResult<Vec<City>> {
        (**self).list_cities()
    }

    fn city_exists(&self, city_id: CityId) -> RepoResult<bool> {
        (**self).city_exists(city_id)
    }

    fn get_city(
        &self,
        city_id: CityId,
        include_points_of_interest: bool,
    ) -> RepoResult<Option<City>> {
        (**self).get_city(city_id, include_points_of_interest)
    }

    fn list_points_of_interest(
        &self,
        city_id: CityId,
    ) -> RepoResult<Option<Vec<PointOfInterest>>> {
        (**self).list_points_of_interest(city_id)
    }

    fn get_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<Option<PointOfInterest>> {
        (**self).get_point_of_interest(city_id, poi_id)
    }

    fn max_point_of_interest_id(&self) -> RepoResult<Option<PointOfInterestId>> {
        (**self).max_point_of_interest_id()
    }

    fn add_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: PointOfInterest,
    ) -> RepoResult<bool> {
        (**self).add_point_of_interest(city_id, poi)
    }

    fn update_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: &PointOfInterest,
    ) -> RepoResult<bool> {
        (**self).update_point_of_interest(city_id, poi)
    }

    fn remove_point_of_interest(
        &mut self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<bool> {
        (**self).remove_point_of_interest(city_id, poi_id)
    }

    fn save(&mut self) -> RepoResult<()> {
        (**self).save()
    }
}

#[derive(Debug, Clone)]
enum PendingChange {
    Insert {
        city_id: CityId,
        poi: PointOfInterest,
    },
    Update {
        city_id: CityId,
        poi: PointOfInterest,
    },
    Delete {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
}

/// SQLite-backed city repository.
pub struct SqliteCityRepository {
    conn: Mutex<Connection>,
    pending: Vec<PendingChange>,
}

impl SqliteCityRepository {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            pending: Vec::new(),
        }
    }

    /// Opens a database file, creating and seeding it on first use.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Number of queued mutations not yet committed.
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }

    /// Existence as decided by the newest queued change touching `poi_id`.
    fn pending_presence(&self, city_id: CityId, poi_id: PointOfInterestId) -> Option<bool> {
        self.pending.iter().rev().find_map(|change| match change {
            PendingChange::Insert { city_id: owner, poi } if poi.id == poi_id => {
                Some(*owner == city_id)
            }
            PendingChange::Delete { poi_id: removed, .. } if *removed == poi_id => Some(false),
            _ => None,
        })
    }

    fn point_of_interest_present(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<bool> {
        if let Some(present) = self.pending_presence(city_id, poi_id) {
            return Ok(present);
        }
        Ok(self.get_point_of_interest(city_id, poi_id)?.is_some())
    }
}

impl CityRepository for SqliteCityRepository {
    fn list_cities(&self) -> RepoResult<Vec<City>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description
             FROM cities
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut cities = Vec::new();
        while let Some(row) = rows.next()? {
            cities.push(parse_city_row(row)?);
        }
        Ok(cities)
    }

    fn city_exists(&self, city_id: CityId) -> RepoResult<bool> {
        let conn = self.conn()?;
        city_exists_in(&conn, city_id)
    }

    fn get_city(
        &self,
        city_id: CityId,
        include_points_of_interest: bool,
    ) -> RepoResult<Option<City>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description
             FROM cities
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([city_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut city = parse_city_row(row)?;
        if include_points_of_interest {
            city.points_of_interest = load_points_of_interest(&conn, city_id)?;
        }
        Ok(Some(city))
    }

    fn list_points_of_interest(
        &self,
        city_id: CityId,
    ) -> RepoResult<Option<Vec<PointOfInterest>>> {
        let conn = self.conn()?;
        if !city_exists_in(&conn, city_id)? {
            return Ok(None);
        }
        Ok(Some(load_points_of_interest(&conn, city_id)?))
    }

    fn get_point_of_interest(
        &self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<Option<PointOfInterest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description
             FROM points_of_interest
             WHERE city_id = ?1 AND id = ?2;",
        )?;
        let mut rows = stmt.query(params![city_id, poi_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_point_of_interest_row(row)?));
        }
        Ok(None)
    }

    fn max_point_of_interest_id(&self) -> RepoResult<Option<PointOfInterestId>> {
        let persisted: Option<PointOfInterestId> = {
            let conn = self.conn()?;
            let max_id =
                conn.query_row("SELECT MAX(id) FROM points_of_interest;", [], |row| {
                    row.get(0)
                })?;
            max_id
        };
        let queued = self
            .pending
            .iter()
            .filter_map(|change| match change {
                PendingChange::Insert { poi, .. } => Some(poi.id),
                _ => None,
            })
            .max();
        Ok(persisted.max(queued))
    }

    fn add_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: PointOfInterest,
    ) -> RepoResult<bool> {
        if !self.city_exists(city_id)? {
            return Ok(false);
        }
        self.pending.push(PendingChange::Insert { city_id, poi });
        Ok(true)
    }

    fn update_point_of_interest(
        &mut self,
        city_id: CityId,
        poi: &PointOfInterest,
    ) -> RepoResult<bool> {
        if !self.point_of_interest_present(city_id, poi.id)? {
            return Ok(false);
        }
        self.pending.push(PendingChange::Update {
            city_id,
            poi: poi.clone(),
        });
        Ok(true)
    }

    fn remove_point_of_interest(
        &mut self,
        city_id: CityId,
        poi_id: PointOfInterestId,
    ) -> RepoResult<bool> {
        if !self.point_of_interest_present(city_id, poi_id)? {
            return Ok(false);
        }
        self.pending.push(PendingChange::Delete { city_id, poi_id });
        Ok(true)
    }

    fn save(&mut self) -> RepoResult<()> {
        // Queued changes are discarded whether or not the commit succeeds.
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        let change_count = pending.len();
        let mut conn = self.conn()?;
        match commit_changes(&mut conn, &pending) {
            Ok(()) => {
                info!("event=store_save module=repo status=ok backend=sqlite changes={change_count}");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=repo status=error backend=sqlite changes={change_count} error={err}"
                );
                Err(err)
            }
        }
    }
}

fn commit_changes(conn: &mut Connection, pending: &[PendingChange]) -> RepoResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for change in pending {
        let changed = match change {
            PendingChange::Insert { city_id, poi } => tx.execute(
                "INSERT INTO points_of_interest (id, city_id, name, description)
                 VALUES (?1, ?2, ?3, ?4);",
                params![poi.id, city_id, poi.name.as_str(), poi.description.as_deref()],
            )?,
            PendingChange::Update { city_id, poi } => tx.execute(
                "UPDATE points_of_interest
                 SET name = ?3, description = ?4
                 WHERE city_id = ?1 AND id = ?2;",
                params![city_id, poi.id, poi.name.as_str(), poi.description.as_deref()],
            )?,
            PendingChange::Delete { city_id, poi_id } => tx.execute(
                "DELETE FROM points_of_interest WHERE city_id = ?1 AND id = ?2;",
                params![city_id, poi_id],
            )?,
        };
        if changed != 1 {
            // Dropping `tx` rolls back everything applied so far.
            return Err(RepoError::InvalidData(format!(
                "queued change touched {changed} rows: {change:?}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

fn city_exists_in(conn: &Connection, city_id: CityId) -> RepoResult<bool> {
    let exists = conn
        .query_row("SELECT 1 FROM cities WHERE id = ?1;", [city_id], |_| Ok(()))
        .optional()?;
    Ok(exists.is_some())
}

fn load_points_of_interest(conn: &Connection, city_id: CityId) -> RepoResult<Vec<PointOfInterest>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description
         FROM points_of_interest
         WHERE city_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([city_id])?;
    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(parse_point_of_interest_row(row)?);
    }
    Ok(points)
}

fn parse_city_row(row: &Row<'_>) -> RepoResult<City> {
    let name: String = row.get("name")?;
    if name.is_empty() {
        return Err(RepoError::InvalidData(
            "empty name in cities.name".to_string(),
        ));
    }
    Ok(City {
        id: row.get("id")?,
        name,
        description: row.get("description")?,
        points_of_interest: Vec::new(),
    })
}

fn parse_point_of_interest_row(row: &Row<'_>) -> RepoResult<PointOfInterest> {
    let id: PointOfInterestId = row.get("id")?;
    let name: String = row.get("name")?;
    if name.is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty name in points_of_interest.name for id {id}"
        )));
    }
    Ok(PointOfInterest {
        id,
        name,
        description: row.get("description")?,
    })
}
