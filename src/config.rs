//! Daemon configuration.
//!
//! The configuration is a TOML document with three parts: the database to
//! connect to, free-form settings shared with the transforms, and the lookup
//! tables themselves.
//!
//! ```toml
//! [database]
//! driver = "sqlite"
//! database = "/var/lib/mail/virtual.db"
//!
//! [misc]
//! recipient_delimiter = "+"
//! max_requests = 100
//!
//! [tables.virtual_alias]
//! query = "SELECT target FROM aliases WHERE source = ?"
//! transform = "lowercase"
//! ```
//!
//! Tables without a `query` are ignored and `transform` defaults to `all`.
//! Everything is validated here, once, so a bad configuration stops the
//! daemon before it answers anything.
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    router::{TableDefinition, TableRouter},
    transform::TransformRegistry,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/socketmap-sql.toml";
pub const DEFAULT_TRANSFORM: &str = "all";

const RECIPIENT_DELIMITER: &str = "recipient_delimiter";
const MAX_REQUESTS: &str = "max_requests";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing [{0}] section")]
    MissingSection(&'static str),

    #[error("table '{table}' uses unknown transform '{transform}'")]
    UnknownTransform { table: String, transform: String },

    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Database backends that can serve lookups.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    #[serde(alias = "sqlite3")]
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: Driver,
    /// Database file, or `:memory:`.
    pub database: String,
    /// Seconds to wait on a locked database.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub read_only: bool,
}

/// Read-only settings handed to every transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiscConfig {
    values: BTreeMap<String, String>,
}

impl MiscConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Separator between a user and an address extension, if one is set.
    pub fn recipient_delimiter(&self) -> Option<&str> {
        self.get(RECIPIENT_DELIMITER)
            .map(str::trim)
            .filter(|delimiter| !delimiter.is_empty())
    }

    /// Number of requests a session may serve before exiting.
    pub fn max_requests(&self) -> Result<Option<u64>, ConfigError> {
        let Some(value) = self.get(MAX_REQUESTS) else {
            return Ok(None);
        };

        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: MAX_REQUESTS.to_string(),
                value: value.to_string(),
                reason: "expected a non-negative integer".to_string(),
            })
    }
}

impl<K, V> FromIterator<(K, V)> for MiscConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: Option<DatabaseConfig>,
    #[serde(default)]
    misc: BTreeMap<String, toml::Value>,
    #[serde(default)]
    tables: BTreeMap<String, RawTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    query: Option<String>,
    transform: Option<String>,
}

/// Fully validated daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub misc: MiscConfig,
    pub tables: TableRouter,
}

impl Config {
    pub fn from_file(
        path: impl AsRef<Path>,
        registry: &TransformRegistry,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents, registry)
    }

    pub fn parse(contents: &str, registry: &TransformRegistry) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        let database = raw.database.ok_or(ConfigError::MissingSection("database"))?;

        let misc = raw
            .misc
            .into_iter()
            .map(|(key, value)| {
                let value = misc_value(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<MiscConfig, ConfigError>>()?;
        misc.max_requests()?;

        let mut tables = TableRouter::new();
        for (name, table) in raw.tables {
            let Some(query) = table.query else {
                warn!("table '{name}' has no query; skipping");
                continue;
            };

            let transform_name = table
                .transform
                .unwrap_or_else(|| DEFAULT_TRANSFORM.to_string());
            let transform =
                registry
                    .get(&transform_name)
                    .ok_or_else(|| ConfigError::UnknownTransform {
                        table: name.clone(),
                        transform: transform_name.clone(),
                    })?;

            debug!("table '{name}' uses transform '{transform_name}'");
            tables.insert(TableDefinition::new(name, query, transform_name, transform));
        }

        Ok(Self {
            database,
            misc,
            tables,
        })
    }
}

fn misc_value(key: &str, value: toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: other.to_string(),
            reason: "expected a scalar".to_string(),
        }),
    }
}
