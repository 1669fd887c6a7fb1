use std::{cell::Cell, time::Duration};

use serde::Deserialize;
use serde_json::{Value, json};

use super::{Connector, RpcError};

const TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to log in to a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Base URL, with or without scheme.
    pub url: String,
    /// Database name.
    pub database: String,
    /// User login.
    pub login: String,
    /// Password or API key.
    pub password: String,
}

/// Adds `https://` to a bare host and drops any trailing slash.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// A [`Connector`] speaking JSON-RPC over blocking HTTP.
///
/// The session logs in lazily on the first model call and reuses the uid
/// afterwards.
pub struct JsonRpcConnector {
    client: reqwest::blocking::Client,
    base_url: String,
    database: String,
    login: String,
    password: String,
    uid: Cell<Option<i64>>,
    next_id: Cell<u64>,
}

impl JsonRpcConnector {
    /// Creates a connector for `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: ServerSettings) -> Result<Self, RpcError> {
        let base_url = normalize_url(&settings.url);
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|source| RpcError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            database: settings.database,
            login: settings.login,
            password: settings.password,
            uid: Cell::new(None),
            next_id: Cell::new(1),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/jsonrpc", self.base_url)
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.replace(self.next_id.get() + 1)
    }

    fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, RpcError> {
        let url = self.endpoint();
        let request = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {
                "service": service,
                "method": method,
                "args": args,
            },
            "id": self.next_request_id(),
        });

        tracing::trace!(%url, service, method, "json-rpc call");
        let transport = |source: reqwest::Error| RpcError::Transport {
            url: url.clone(),
            source,
        };
        let response: Response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(transport)?
            .json()
            .map_err(transport)?;

        response.into_result()
    }

    fn uid(&self) -> Result<i64, RpcError> {
        if let Some(uid) = self.uid.get() {
            return Ok(uid);
        }

        tracing::info!(url = %self.base_url, database = %self.database, login = %self.login, "logging in");
        let result = self.call(
            "common",
            "login",
            json!([self.database, self.login, self.password]),
        )?;
        let uid = login_uid(&result, &self.login, &self.database)?;
        self.uid.set(Some(uid));
        Ok(uid)
    }
}

impl Connector for JsonRpcConnector {
    fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, RpcError> {
        let uid = self.uid()?;
        self.call(
            "object",
            "execute_kw",
            json!([self.database, uid, self.password, model, method, args, kwargs]),
        )
    }
}

/// The uid returned by `common.login`; refused credentials come back as `false`.
fn login_uid(result: &Value, login: &str, database: &str) -> Result<i64, RpcError> {
    result
        .as_i64()
        .filter(|uid| *uid > 0)
        .ok_or_else(|| RpcError::Login {
            login: login.to_string(),
            database: database.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Fault>,
}

#[derive(Debug, Deserialize)]
struct Fault {
    message: String,
    #[serde(default)]
    data: Option<FaultData>,
}

#[derive(Debug, Deserialize)]
struct FaultData {
    #[serde(default)]
    message: Option<String>,
}

impl Response {
    fn into_result(self) -> Result<Value, RpcError> {
        if let Some(fault) = self.error {
            let message = match fault.data.and_then(|data| data.message) {
                Some(detail) => format!("{}: {detail}", fault.message),
                None => fault.message,
            };
            return Err(RpcError::Remote { message });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}
