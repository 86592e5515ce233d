use thiserror::Error;

/// Error type for MySQL plugin operations.
///
/// Every variant is an integration error surfaced to the host. The four
/// `*NotSpecified`/`*NotFound` variants are raised before any network activity.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Datasource not found for MySQL step")]
    DatasourceNotFound,

    #[error("Endpoint not specified for MySQL step")]
    EndpointNotSpecified,

    #[error("Authentication not specified for MySQL step")]
    AuthenticationNotSpecified,

    #[error("Database not specified for MySQL step")]
    DatabaseNotSpecified,

    #[error("Invalid MySQL configuration, {0}")]
    InvalidConfiguration(String),

    #[error("Failed to connect to MySQL, {0}")]
    ConnectionFailed(String),

    #[error("MySQL query failed, {0}")]
    QueryFailed(String),

    #[error("Test MySQL connection failed, {0}")]
    TestConnectionFailed(String),

    /// Raw transport failure reported by a driver. The connector re-classifies
    /// it before returning to the host.
    #[error("{0}")]
    Driver(String),
}

impl PluginError {
    /// Returns true for errors caused by the supplied configuration rather than the server.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PluginError::DatasourceNotFound
                | PluginError::EndpointNotSpecified
                | PluginError::AuthenticationNotSpecified
                | PluginError::DatabaseNotSpecified
                | PluginError::InvalidConfiguration(_)
        )
    }
}

/// Result type alias for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;
