//! mysql-plugin - A MySQL datasource connector for workflow hosts
//!
//! # Example
//! ```ignore
//! use mysql_plugin::{
//!     ActionConfiguration, DatasourceConfiguration, ExecutionContext, ExecutionProps,
//!     MySqlConnector, SqlValue,
//! };
//!
//! let connector = MySqlConnector::new();
//! let datasource = DatasourceConfiguration::from_json(config_json)?;
//!
//! // Run a statement
//! let output = connector
//!     .execute(&ExecutionProps {
//!         datasource_configuration: Some(datasource.clone()),
//!         action_configuration: ActionConfiguration::new("SELECT id, email FROM users WHERE id = ?"),
//!         context: ExecutionContext::with_parameters([SqlValue::from(42)]),
//!     })
//!     .await?;
//!
//! // Introspect the schema
//! let metadata = connector.metadata(Some(&datasource)).await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod traits;
pub mod types;

mod connector;

// Re-export main types for convenient access
pub use config::{
    ActionConfiguration, ConnectOptions, ConnectorSettings, DatasourceConfiguration,
    ExecutionContext, ExecutionProps,
};
pub use connector::{MySqlConnector, PLUGIN_NAME, TEST_QUERY};
pub use error::{PluginError, Result};
pub use traits::{
    ColumnNameNormalizer, ConnectionFactory, ConnectionTeardown, DatabaseConnection,
    DatasourcePlugin,
};
pub use types::{
    Column, DatasourceMetadata, ExecutionOutput, RawQueryResult, Record, SqlValue, Table,
};
