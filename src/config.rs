//! Inputs supplied by the host per call, and the options derived from them.
//!
//! The host sends camelCase JSON; every block is optional on the wire so that
//! validation can report exactly which one is missing.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};
use crate::types::SqlValue;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;
pub const TEST_CONNECT_TIMEOUT_MS: u64 = 5_000;

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PluginError::InvalidConfiguration(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConfiguration {
    pub endpoint: Option<Endpoint>,
    pub authentication: Option<Authentication>,
    pub connection: Option<ConnectionSettings>,
}

impl DatasourceConfiguration {
    /// Decode an untyped datasource configuration.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        decode(value)
    }

    pub fn use_ssl(&self) -> bool {
        self.connection
            .as_ref()
            .and_then(|c| c.use_ssl)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Authentication {
    pub username: Option<String>,
    pub password: Option<String>,
    pub custom: Option<CustomAuthentication>,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("custom", &self.custom)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAuthentication {
    pub database_name: Option<Property>,
}

/// A host-side `{ value }` property wrapper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Property {
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub use_ssl: Option<bool>,
}

/// The statement to run. `body` has already had its template expressions
/// resolved by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionConfiguration {
    pub body: Option<String>,
}

impl ActionConfiguration {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        decode(value)
    }

    /// Returns the body if it holds any text.
    pub fn query(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    #[serde(default)]
    pub prepared_statement_context: Vec<SqlValue>,
}

impl ExecutionContext {
    pub fn with_parameters(params: impl IntoIterator<Item = SqlValue>) -> Self {
        Self {
            prepared_statement_context: params.into_iter().collect(),
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        decode(value)
    }
}

/// Everything `execute` receives from the host for one step.
#[derive(Debug, Clone, Default)]
pub struct ExecutionProps {
    pub context: ExecutionContext,
    pub datasource_configuration: Option<DatasourceConfiguration>,
    pub action_configuration: ActionConfiguration,
}

/// Validated parameters for opening one session.
#[derive(Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub use_tls: bool,
    /// Server certificate is not checked against a trust chain.
    pub accept_invalid_certs: bool,
    pub allow_public_key_retrieval: bool,
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    /// Validate a datasource configuration and derive session options.
    ///
    /// Checks run in order: configuration, endpoint, authentication, database name.
    pub fn from_datasource(
        datasource: Option<&DatasourceConfiguration>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let datasource = datasource.ok_or(PluginError::DatasourceNotFound)?;
        let endpoint = datasource
            .endpoint
            .as_ref()
            .ok_or(PluginError::EndpointNotSpecified)?;
        let auth = datasource
            .authentication
            .as_ref()
            .ok_or(PluginError::AuthenticationNotSpecified)?;
        let database = auth
            .custom
            .as_ref()
            .and_then(|c| c.database_name.as_ref())
            .and_then(|p| p.value.as_deref())
            .filter(|v| !v.is_empty())
            .ok_or(PluginError::DatabaseNotSpecified)?;

        let use_tls = datasource.use_ssl();
        Ok(Self {
            host: endpoint
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: endpoint.port.unwrap_or(DEFAULT_PORT),
            username: auth.username.clone().unwrap_or_default(),
            password: auth.password.clone().unwrap_or_default(),
            database: database.to_string(),
            use_tls,
            accept_invalid_certs: use_tls,
            allow_public_key_retrieval: !use_tls,
            connect_timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("use_tls", &self.use_tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("allow_public_key_retrieval", &self.allow_public_key_retrieval)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Connector-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Connect timeout for `execute` and `metadata`.
    pub connect_timeout_ms: u64,
    /// Connect timeout for the connectivity test.
    pub test_connect_timeout_ms: u64,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            test_connect_timeout_ms: TEST_CONNECT_TIMEOUT_MS,
        }
    }
}

impl ConnectorSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn test_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.test_connect_timeout_ms)
    }
}
