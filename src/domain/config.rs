use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::Domain;

/// How a stored configuration value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wrapper {
    /// An integer.
    Int,
    /// A domain literal.
    Eval,
}

impl Wrapper {
    /// The wrapper's stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Eval => "eval",
        }
    }

    /// Interprets `raw` according to this wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid value for the wrapper.
    pub fn apply(self, raw: &str) -> Result<ConfigValue, InvalidValue> {
        let invalid = || InvalidValue {
            value: raw.to_string(),
            wrapper: self,
        };
        match self {
            Self::Int => raw.trim().parse().map(ConfigValue::Int).map_err(|_| invalid()),
            Self::Eval => Domain::parse_literal(raw)
                .map(ConfigValue::Domain)
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Wrapper {
    type Err = UnknownWrapper;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "int" => Ok(Self::Int),
            "eval" => Ok(Self::Eval),
            other => Err(UnknownWrapper(other.to_string())),
        }
    }
}

/// The wrapper name is not recognised.
#[derive(Debug, thiserror::Error)]
#[error("unknown wrapper '{0}' (expected 'int' or 'eval')")]
pub struct UnknownWrapper(pub String);

/// A value does not fit its wrapper.
#[derive(Debug, thiserror::Error)]
#[error("error in value {value}, the wrapper: {wrapper} looks not valid")]
pub struct InvalidValue {
    /// The rejected value.
    pub value: String,
    /// The wrapper it was checked against.
    pub wrapper: Wrapper,
}

/// A configuration value after its wrapper has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// No value stored.
    Null,
    /// Plain text.
    Text(String),
    /// An integer (`int` wrapper).
    Int(i64),
    /// A search filter (`eval` wrapper).
    Domain(Domain),
}

impl ConfigValue {
    /// Interprets a stored value with an optional wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit the wrapper.
    pub fn from_stored(value: Option<&str>, wrapper: Option<Wrapper>) -> Result<Self, InvalidValue> {
        match (value, wrapper) {
            (None, _) => Ok(Self::Null),
            (Some(value), Some(wrapper)) => wrapper.apply(value),
            (Some(value), None) => Ok(Self::Text(value.to_string())),
        }
    }
}

/// A key that is created with a default value on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultKey {
    /// Key name.
    pub key: &'static str,
    /// Default raw value.
    pub value: &'static str,
    /// Default wrapper.
    pub wrapper: Option<Wrapper>,
}

/// Base URL of the main server.
pub const ODOO_URL: &str = "odoo_url";
/// Database name on the main server.
pub const ODOO_DATABASE: &str = "odoo_database_name";
/// Base URL of the upgrade platform.
pub const UPGRADE_URL: &str = "odoo_url_upg";
/// Database name on the upgrade platform.
pub const UPGRADE_DATABASE: &str = "odoo_database_name_upg";
/// Record limit for every query.
pub const LIMIT: &str = "odoo_limit";
/// Filter selecting rolling-release tickets.
pub const TASK_DOMAIN: &str = "odoo_task_domain";
/// Login on the main server.
pub const ODOO_LOGIN: &str = "odoo_login";
/// Login on the upgrade platform.
pub const UPGRADE_LOGIN: &str = "odoo_login_upg";

/// Keys known to the tool, with their defaults.
pub const DEFAULT_KEYS: &[DefaultKey] = &[
    DefaultKey {
        key: ODOO_URL,
        value: "www.odoo.com",
        wrapper: None,
    },
    DefaultKey {
        key: ODOO_DATABASE,
        value: "openerp",
        wrapper: None,
    },
    DefaultKey {
        key: UPGRADE_URL,
        value: "upgrade.odoo.com",
        wrapper: None,
    },
    DefaultKey {
        key: UPGRADE_DATABASE,
        value: "odoo_upgrade",
        wrapper: None,
    },
    DefaultKey {
        key: LIMIT,
        value: "700",
        wrapper: Some(Wrapper::Int),
    },
    DefaultKey {
        key: TASK_DOMAIN,
        value: r#"["&", "&", "&", ["name", "ilike", "[rr]%"], ["user_ids", "=", false], ["stage_id", "in", [25525]], ["tag_ids", "in", [25106]]]"#,
        wrapper: Some(Wrapper::Eval),
    },
    DefaultKey {
        key: ODOO_LOGIN,
        value: "",
        wrapper: None,
    },
    DefaultKey {
        key: UPGRADE_LOGIN,
        value: "",
        wrapper: None,
    },
];

/// Looks up the default for `key`.
#[must_use]
pub fn default_key(key: &str) -> Option<&'static DefaultKey> {
    DEFAULT_KEYS.iter().find(|default| default.key == key)
}

/// Typed view over the configuration table.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the main server.
    pub odoo_url: String,
    /// Database name on the main server.
    pub odoo_database: String,
    /// Login on the main server.
    pub odoo_login: String,
    /// Base URL of the upgrade platform.
    pub upgrade_url: String,
    /// Database name on the upgrade platform.
    pub upgrade_database: String,
    /// Login on the upgrade platform.
    pub upgrade_login: String,
    /// Record limit for every query.
    pub limit: u32,
    /// Filter selecting rolling-release tickets.
    pub task_domain: Domain,
}
