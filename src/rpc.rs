//! Remote procedure calls against the business-management server.
//!
//! Everything goes through [`Connector::execute_kw`], which calls a method on
//! a model. [`Model`] wraps the two read methods the tool needs.

use serde_json::{Value, json};

use crate::domain::Domain;

mod json_rpc;
pub use json_rpc::{JsonRpcConnector, ServerSettings, normalize_url};

/// Errors raised while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The HTTP request failed.
    #[error("request to {url} failed")]
    Transport {
        /// Endpoint that was called.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a fault.
    #[error("server error: {message}")]
    Remote {
        /// Fault message reported by the server.
        message: String,
    },

    /// The credentials were refused.
    #[error("authentication failed for '{login}' on database '{database}'")]
    Login {
        /// Login that was used.
        login: String,
        /// Database that was targeted.
        database: String,
    },

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedPayload(String),
}

/// Executes model methods on a remote server.
pub trait Connector {
    /// Calls `method` on `model` with positional `args` and keyword `kwargs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server reports a fault.
    fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, RpcError>;
}

/// A model on a remote server.
#[derive(Clone, Copy)]
pub struct Model<'c> {
    connector: &'c dyn Connector,
    name: &'c str,
}

impl<'c> Model<'c> {
    /// Binds `name` to `connector`.
    #[must_use]
    pub fn new(connector: &'c dyn Connector, name: &'c str) -> Self {
        Self { connector, name }
    }

    /// Reads `fields` of the records matching `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or does not return a list.
    pub fn search_read(
        &self,
        domain: &Domain,
        fields: &[String],
        limit: Option<u32>,
    ) -> Result<Vec<Value>, RpcError> {
        let mut kwargs = json!({
            "domain": domain,
            "fields": fields,
        });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
        }
        tracing::debug!(model = self.name, %domain, "search_read");
        into_rows(
            self.connector
                .execute_kw(self.name, "search_read", json!([]), kwargs)?,
        )
    }

    /// Counts the records matching `domain`, grouped by `groupby`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or does not return a list.
    pub fn read_group(
        &self,
        domain: &Domain,
        fields: &[String],
        groupby: &[String],
        limit: Option<u32>,
    ) -> Result<Vec<Value>, RpcError> {
        let mut kwargs = json!({
            "domain": domain,
            "fields": fields,
            "groupby": groupby,
            "lazy": true,
        });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
        }
        tracing::debug!(model = self.name, %domain, ?groupby, "read_group");
        into_rows(
            self.connector
                .execute_kw(self.name, "read_group", json!([]), kwargs)?,
        )
    }
}

fn into_rows(value: Value) -> Result<Vec<Value>, RpcError> {
    match value {
        Value::Array(rows) => Ok(rows),
        other => Err(RpcError::UnexpectedPayload(other.to_string())),
    }
}
