use serde::Deserialize;

use super::{YesNo, fields};

/// An upgrade request on the upgrade platform (`upgrade.request`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpgradeRequest {
    /// Record id.
    #[serde(default)]
    pub id: Option<i64>,

    /// UUID of the database being upgraded.
    #[serde(default, deserialize_with = "fields::string_or_empty")]
    pub db_uuid: String,

    /// Traceback of the last failed attempt.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub last_traceback: Option<String>,
}

impl UpgradeRequest {
    /// Whether the last attempt left a traceback.
    #[must_use]
    pub const fn has_traceback(&self) -> YesNo {
        YesNo(self.last_traceback.is_some())
    }

    /// Keeps only the most recent request (highest id) per database.
    ///
    /// The result is ordered by `db_uuid`.
    #[must_use]
    pub fn latest_per_database(mut requests: Vec<Self>) -> Vec<Self> {
        requests.sort_by(|a, b| a.db_uuid.cmp(&b.db_uuid));

        let mut latest: Vec<Self> = Vec::new();
        for request in requests {
            match latest.last_mut() {
                Some(current) if current.db_uuid == request.db_uuid => {
                    if request.id > current.id {
                        *current = request;
                    }
                }
                _ => latest.push(request),
            }
        }
        latest
    }
}
