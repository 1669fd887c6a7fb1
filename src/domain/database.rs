use chrono::NaiveDateTime;
use serde::Deserialize;

use super::fields;

/// Shown when a database has no version.
pub const NO_VERSION: &str = "NO VERSION";

/// A customer database (`openerp.enterprise.database`).
///
/// The default value stands in for a database that could not be found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Database {
    /// Record id.
    #[serde(default)]
    pub id: Option<i64>,

    /// Server version the database runs.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub version: Option<String>,

    /// Database name.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub db_name: Option<String>,

    /// Database UUID, used to join upgrade requests.
    #[serde(default, deserialize_with = "fields::string_or_empty")]
    pub db_uuid: String,

    /// Public URL of the database.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub url: Option<String>,

    /// Parent database, if any.
    #[serde(default, deserialize_with = "fields::many2one")]
    pub parent_id: Option<i64>,

    /// Subscription (sale order) covering the database.
    #[serde(default, deserialize_with = "fields::many2one")]
    pub subscription_id: Option<i64>,

    /// End of validity of the database's contract.
    #[serde(default, deserialize_with = "fields::optional_datetime")]
    pub date_valid: Option<NaiveDateTime>,
}

impl Database {
    /// The version, or [`NO_VERSION`].
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(NO_VERSION)
    }

    /// Whether the database has a parent.
    #[must_use]
    pub const fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Validity date as `dd-mm-yyyy`, or an empty string.
    #[must_use]
    pub fn date_valid_display(&self) -> String {
        self.date_valid
            .map(|date| date.format("%d-%m-%Y").to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_server_record() {
        let database: Database = serde_json::from_value(json!({
            "id": 3,
            "version": "saas~17.4",
            "db_name": "acme",
            "db_uuid": "0f5e-11",
            "url": "https://acme.odoo.com",
            "parent_id": false,
            "subscription_id": [88, "S00088"],
            "date_valid": "2025-01-31 00:00:00",
            "extra_apps": false
        }))
        .unwrap();

        assert_eq!(database.id, Some(3));
        assert_eq!(database.version(), "saas~17.4");
        assert_eq!(database.db_name.as_deref(), Some("acme"));
        assert!(!database.has_parent());
        assert_eq!(database.subscription_id, Some(88));
        assert_eq!(database.date_valid_display(), "31-01-2025");
    }

    #[test]
    fn missing_database_uses_placeholders() {
        let database = Database::default();
        assert_eq!(database.version(), NO_VERSION);
        assert!(database.db_name.is_none());
        assert_eq!(database.date_valid_display(), "");
        assert!(database.db_uuid.is_empty());
    }
}
