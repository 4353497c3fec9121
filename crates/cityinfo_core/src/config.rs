//! Runtime configuration for CityInfo core.
//!
//! Values start from defaults and can be overridden by `CITYINFO_*`
//! environment variables. Invalid overrides are logged and ignored.

use crate::logging::default_log_level;
use crate::notify::Notifier;
use crate::repo::city_repo::{CityRepository, RepoResult, SqliteCityRepository};
use crate::repo::memory_repo::InMemoryCityRepository;
use crate::service::point_of_interest_service::PointOfInterestService;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_STORE: &str = "CITYINFO_STORE";
pub const ENV_DB_PATH: &str = "CITYINFO_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CITYINFO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CITYINFO_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "cityinfo.sqlite3";

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Seeded fixture held in memory; lost on exit.
    #[default]
    Memory,
    /// SQLite file at `StoreConfig::db_path`.
    Sqlite,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file used by the SQLite backend.
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace|debug|info|warn|error.
    pub level: String,
    /// Absolute directory for rolling log files; `None` keeps logging off.
    pub log_dir: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads defaults overridden by `CITYINFO_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_STORE) {
            match StoreBackend::parse(&value) {
                Some(backend) => config.store.backend = backend,
                None => warn!(
                    "event=config_load module=config status=ignored key={ENV_STORE} value={value:?}"
                ),
            }
        }

        if let Some(path) = lookup(ENV_DB_PATH).filter(|path| !path.trim().is_empty()) {
            config.store.db_path = PathBuf::from(path);
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|level| !level.trim().is_empty()) {
            config.logging.level = level;
        }

        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|dir| !dir.trim().is_empty()) {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        info!(
            "event=config_load module=config status=ok backend={:?} logging={}",
            config.store.backend,
            config.logging.log_dir.is_some()
        );
        config
    }

    /// Opens the configured store as a trait object.
    pub fn open_store(&self) -> RepoResult<Box<dyn CityRepository + Send + Sync>> {
        Ok(match self.store.backend {
            StoreBackend::Memory => Box::new(InMemoryCityRepository::seeded()),
            StoreBackend::Sqlite => Box::new(SqliteCityRepository::open(&self.store.db_path)?),
        })
    }

    /// Builds a service over the configured store.
    pub fn build_service<N: Notifier>(
        &self,
        notifier: N,
    ) -> RepoResult<PointOfInterestService<Box<dyn CityRepository + Send + Sync>, N>> {
        Ok(PointOfInterestService::new(self.open_store()?, notifier))
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, StoreBackend, ENV_DB_PATH, ENV_LOG_DIR, ENV_STORE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_memory_store_without_file_logging() {
        let config = CoreConfig::from_lookup(|_| None);
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_STORE, "SQLite"),
            (ENV_DB_PATH, "/tmp/cities.db"),
            (ENV_LOG_DIR, "/var/log/cityinfo"),
        ]));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/cities.db"));
        assert_eq!(
            config.logging.log_dir,
            Some(PathBuf::from("/var/log/cityinfo"))
        );
    }

    #[test]
    fn ignores_unknown_backend() {
        let config = CoreConfig::from_lookup(lookup_from(&[(ENV_STORE, "postgres")]));
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn deserializes_from_json() {
        let config: CoreConfig = serde_json::from_value(serde_json::json!({
            "store": { "backend": "sqlite", "db_path": "cities.db" },
            "logging": { "level": "warn", "log_dir": null }
        }))
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.logging.level, "warn");
    }
}
