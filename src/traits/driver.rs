use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// A live session owned by exactly one connector operation.
///
/// Drivers report transport failures as `PluginError::Driver`; classification
/// is left to the connector.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Execute a SQL statement with its prepared-statement parameters.
    /// Parameters bind to anonymous `?` markers in the order given.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// End the session. Called at most once.
    async fn close(&mut self) -> Result<()>;
}

pub type BoxedConnection = Box<dyn DatabaseConnection>;

/// Opens sessions. Hosts that pool or instrument connections wrap this seam.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create(&self, options: &ConnectOptions) -> Result<BoxedConnection>;
}

/// Releases sessions opened by a [`ConnectionFactory`].
#[async_trait]
pub trait ConnectionTeardown: Send + Sync {
    async fn destroy(&self, connection: BoxedConnection) -> Result<()>;
}

/// Teardown that simply ends the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseOnTeardown;

#[async_trait]
impl ConnectionTeardown for CloseOnTeardown {
    async fn destroy(&self, mut connection: BoxedConnection) -> Result<()> {
        connection.close().await
    }
}
