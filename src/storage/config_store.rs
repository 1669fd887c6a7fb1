use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ConfigValue, Domain, Settings, Wrapper,
    config::{self, InvalidValue, default_key},
};

/// Directory under the user's configuration directory.
const APP_DIR: &str = "rolling-release";

/// A row of the configuration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Key name.
    pub key: String,
    /// Raw value; `None` is NULL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// How the value is interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<Wrapper>,
    /// Time of the last write.
    pub date: DateTime<Utc>,
}

impl Row {
    fn from_default(default: &config::DefaultKey) -> Self {
        Self {
            key: default.key.to_string(),
            value: Some(default.value.to_string()).filter(|value| !value.is_empty()),
            wrapper: default.wrapper,
            date: Utc::now(),
        }
    }

    /// The value after applying the wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value does not fit the wrapper.
    pub fn typed_value(&self) -> Result<ConfigValue, InvalidValue> {
        ConfigValue::from_stored(self.value.as_deref(), self.wrapper)
    }
}

/// Errors raised by the configuration store.
#[derive(Debug, thiserror::Error)]
pub enum ConfigStoreError {
    /// The file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file could not be written.
    #[error("failed to write config file {path}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for the store.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The table could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The key has no row and no default.
    #[error("no key '{0}' in the default configuration")]
    UnknownKey(String),

    /// A value does not fit its wrapper.
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),

    /// A value has the wrong type for the setting that reads it.
    #[error("config key '{key}' should hold {expected}")]
    WrongType {
        /// Key name.
        key: String,
        /// Description of the expected type.
        expected: &'static str,
    },
}

/// The `rr_config` key/value table, persisted as a TOML file.
///
/// Known keys are created with their default value the first time they are
/// read. Every mutation is written to disk immediately.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    rows: BTreeMap<String, Row>,
}

impl ConfigStore {
    /// Default location of the configuration file.
    ///
    /// Uses `$XDG_CONFIG_HOME`, falling back to `$HOME/.config`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Opens the store at `path`. A missing file is an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigStoreError> {
        let path = path.into();
        let rows = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let Versions::V1 { rows } = toml::from_str(&content)?;
                rows.into_iter().map(|row| (row.key.clone(), row)).collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no config file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(ConfigStoreError::Read { path, source }),
        };
        Ok(Self { path, rows })
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates every missing default key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn prepare(&mut self) -> Result<(), ConfigStoreError> {
        let mut changed = false;
        for default in config::DEFAULT_KEYS {
            if !self.rows.contains_key(default.key) {
                self.rows
                    .insert(default.key.to_string(), Row::from_default(default));
                changed = true;
            }
        }
        if changed {
            self.save()?;
        }
        Ok(())
    }

    /// Reads `key`, creating it from its default if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, its value does not fit its
    /// wrapper, or the default cannot be written.
    pub fn get(&mut self, key: &str) -> Result<ConfigValue, ConfigStoreError> {
        if let Some(row) = self.rows.get(key) {
            return Ok(row.typed_value()?);
        }
        let row = self.create_default(key)?;
        Ok(row.typed_value()?)
    }

    fn create_default(&mut self, key: &str) -> Result<Row, ConfigStoreError> {
        let default = default_key(key).ok_or_else(|| ConfigStoreError::UnknownKey(key.to_string()))?;
        tracing::debug!(key, "creating default config row");
        let row = Row::from_default(default);
        self.rows.insert(key.to_string(), row.clone());
        self.save()?;
        Ok(row)
    }

    /// Updates `key`. An empty value is stored as NULL.
    ///
    /// The value is checked against `wrapper` before anything is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit the wrapper, the key is
    /// unknown, or the file cannot be written.
    pub fn set(
        &mut self,
        key: &str,
        value: &str,
        wrapper: Option<Wrapper>,
    ) -> Result<(), ConfigStoreError> {
        let value = Some(value.to_string()).filter(|value| !value.is_empty());
        if let (Some(value), Some(wrapper)) = (&value, wrapper) {
            wrapper.apply(value)?;
        }

        if !self.rows.contains_key(key) {
            self.create_default(key)?;
        }
        if let Some(row) = self.rows.get_mut(key) {
            row.value = value;
            row.wrapper = wrapper;
            row.date = Utc::now();
        }
        tracing::info!(key, "config updated");
        self.save()
    }

    /// The row for `key`, if it exists.
    #[must_use]
    pub fn get_row(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Every row, ordered by key.
    pub fn get_all(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Deletes every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn clean(&mut self) -> Result<(), ConfigStoreError> {
        self.rows.clear();
        self.save()
    }

    /// Reads all settings the reporter needs.
    ///
    /// # Errors
    ///
    /// Returns an error if a key holds a value of the wrong type.
    pub fn settings(&mut self) -> Result<Settings, ConfigStoreError> {
        Ok(Settings {
            odoo_url: self.text(config::ODOO_URL)?,
            odoo_database: self.text(config::ODOO_DATABASE)?,
            odoo_login: self.text(config::ODOO_LOGIN)?,
            upgrade_url: self.text(config::UPGRADE_URL)?,
            upgrade_database: self.text(config::UPGRADE_DATABASE)?,
            upgrade_login: self.text(config::UPGRADE_LOGIN)?,
            limit: self.limit()?,
            task_domain: self.domain(config::TASK_DOMAIN)?,
        })
    }

    fn text(&mut self, key: &str) -> Result<String, ConfigStoreError> {
        match self.get(key)? {
            ConfigValue::Null => Ok(String::new()),
            ConfigValue::Text(text) => Ok(text),
            ConfigValue::Int(value) => Ok(value.to_string()),
            ConfigValue::Domain(_) => Err(ConfigStoreError::WrongType {
                key: key.to_string(),
                expected: "text",
            }),
        }
    }

    fn limit(&mut self) -> Result<u32, ConfigStoreError> {
        let wrong_type = || ConfigStoreError::WrongType {
            key: config::LIMIT.to_string(),
            expected: "a positive integer",
        };
        match self.get(config::LIMIT)? {
            ConfigValue::Int(limit) => u32::try_from(limit).map_err(|_| wrong_type()),
            ConfigValue::Text(text) => text.trim().parse().map_err(|_| wrong_type()),
            _ => Err(wrong_type()),
        }
    }

    fn domain(&mut self, key: &str) -> Result<Domain, ConfigStoreError> {
        match self.get(key)? {
            ConfigValue::Domain(domain) => Ok(domain),
            ConfigValue::Null => Ok(Domain::new()),
            ConfigValue::Text(text) => Ok(Wrapper::Eval
                .apply(&text)
                .ok()
                .and_then(|value| match value {
                    ConfigValue::Domain(domain) => Some(domain),
                    _ => None,
                })
                .ok_or_else(|| ConfigStoreError::WrongType {
                    key: key.to_string(),
                    expected: "a domain",
                })?),
            ConfigValue::Int(_) => Err(ConfigStoreError::WrongType {
                key: key.to_string(),
                expected: "a domain",
            }),
        }
    }

    fn save(&self) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| ConfigStoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let content = toml::to_string_pretty(&Versions::V1 {
            rows: self.rows.values().cloned().collect(),
        })?;
        std::fs::write(&self.path, content).map_err(|source| ConfigStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// The serialized versions of the configuration table.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        rows: Vec<Row>,
    },
}
