//! The MySQL connector: connect, execute, metadata and test.
//!
//! Every operation opens its own connection through the injected
//! [`ConnectionFactory`], runs exactly one query, and hands the connection to
//! the injected [`ConnectionTeardown`] on every exit path before returning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{
    ActionConfiguration, ConnectOptions, ConnectorSettings, DatasourceConfiguration,
    ExecutionProps,
};
use crate::drivers::SqlxMySqlFactory;
use crate::error::{PluginError, Result};
use crate::metadata::{fold_tables, TABLE_QUERY};
use crate::normalize::DefaultColumnNameNormalizer;
use crate::traits::{
    BoxedConnection, CloseOnTeardown, ColumnNameNormalizer, ConnectionFactory, ConnectionTeardown,
    DatabaseConnection, DatasourcePlugin,
};
use crate::types::{DatasourceMetadata, ExecutionOutput, RawQueryResult, SqlValue};

pub const PLUGIN_NAME: &str = "MySQL";

/// Liveness query used by `test`.
pub const TEST_QUERY: &str = "SELECT NOW()";

const DYNAMIC_PROPERTIES: &[&str] = &["body"];

/// Wraps a connection with the debug-level error/end diagnostics.
struct TracedConnection {
    inner: BoxedConnection,
    endpoint: String,
}

#[async_trait]
impl DatabaseConnection for TracedConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let result = self.inner.query(sql, params).await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, "{} connection error. {}", PLUGIN_NAME, self.endpoint);
        }
        result
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.inner.close().await;
        tracing::debug!("{} connection ended. {}", PLUGIN_NAME, self.endpoint);
        result
    }
}

/// MySQL datasource connector.
pub struct MySqlConnector {
    factory: Arc<dyn ConnectionFactory>,
    teardown: Arc<dyn ConnectionTeardown>,
    normalizer: Arc<dyn ColumnNameNormalizer>,
    settings: ConnectorSettings,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlConnector {
    /// Connector backed by sqlx, closing each connection on teardown.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(SqlxMySqlFactory::new()))
    }

    /// Create a connector with a custom connection factory.
    /// Useful for testing or for hosts that pool or instrument connections.
    pub fn with_factory(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            teardown: Arc::new(CloseOnTeardown),
            normalizer: Arc::new(DefaultColumnNameNormalizer),
            settings: ConnectorSettings::default(),
        }
    }

    pub fn teardown(mut self, teardown: Arc<dyn ConnectionTeardown>) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn ColumnNameNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn settings(mut self, settings: ConnectorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the configuration and open a connection.
    ///
    /// Configuration errors are returned unchanged; any failure from the
    /// factory becomes `ConnectionFailed`. The caller owns the returned
    /// connection and must pass it to [`release`](Self::release).
    pub async fn connect(
        &self,
        datasource: Option<&DatasourceConfiguration>,
        connect_timeout: Duration,
    ) -> Result<BoxedConnection> {
        let options = ConnectOptions::from_datasource(datasource, connect_timeout)?;
        let endpoint = options.endpoint();

        let inner = self.factory.create(&options).await.map_err(|err| {
            if err.is_configuration_error() {
                err
            } else {
                PluginError::ConnectionFailed(err.to_string())
            }
        })?;

        tracing::debug!("{} connection created. {}", PLUGIN_NAME, endpoint);
        Ok(Box::new(TracedConnection { inner, endpoint }))
    }

    /// Hand a connection to the teardown seam. Teardown failures are logged
    /// and never replace the outcome of the operation.
    pub async fn release(&self, connection: BoxedConnection) {
        if let Err(err) = self.teardown.destroy(connection).await {
            tracing::warn!(error = %err, "{} connection teardown failed", PLUGIN_NAME);
        }
    }

    /// Run the action's SQL body with the context's prepared-statement values.
    ///
    /// An empty or absent body yields an empty output; the connection is still
    /// opened and released.
    pub async fn execute(&self, props: &ExecutionProps) -> Result<ExecutionOutput> {
        let mut connection = self
            .connect(
                props.datasource_configuration.as_ref(),
                self.settings.connect_timeout(),
            )
            .await?;

        let result = self.run_action(connection.as_mut(), props).await;
        self.release(connection).await;
        result
    }

    async fn run_action(
        &self,
        connection: &mut dyn DatabaseConnection,
        props: &ExecutionProps,
    ) -> Result<ExecutionOutput> {
        let Some(query) = props.action_configuration.query() else {
            return Ok(ExecutionOutput::default());
        };

        let raw = connection
            .query(query, &props.context.prepared_statement_context)
            .await
            .map_err(|err| PluginError::QueryFailed(err.to_string()))?;

        Ok(ExecutionOutput::new(
            self.normalizer.normalize_records(raw.into_records()),
        ))
    }

    /// Introspect the tables and columns of the configured database.
    pub async fn metadata(
        &self,
        datasource: Option<&DatasourceConfiguration>,
    ) -> Result<DatasourceMetadata> {
        let mut connection = self
            .connect(datasource, self.settings.connect_timeout())
            .await?;

        let result = connection
            .query(TABLE_QUERY, &[])
            .await
            .and_then(fold_tables)
            .map(DatasourceMetadata::from_tables)
            .map_err(|err| PluginError::ConnectionFailed(err.to_string()));

        self.release(connection).await;
        result
    }

    /// Check that the datasource accepts connections and answers a trivial query.
    pub async fn test(&self, datasource: Option<&DatasourceConfiguration>) -> Result<()> {
        let mut connection = match self
            .connect(datasource, self.settings.test_connect_timeout())
            .await
        {
            Ok(connection) => connection,
            Err(err) if err.is_configuration_error() => return Err(err),
            Err(err) => return Err(PluginError::TestConnectionFailed(err.to_string())),
        };

        let result = connection
            .query(TEST_QUERY, &[])
            .await
            .map(|_| ())
            .map_err(|err| PluginError::TestConnectionFailed(err.to_string()));

        self.release(connection).await;
        result
    }
}

#[async_trait]
impl DatasourcePlugin for MySqlConnector {
    fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn dynamic_properties(&self) -> &'static [&'static str] {
        DYNAMIC_PROPERTIES
    }

    fn uses_ordered_parameters(&self) -> bool {
        false
    }

    fn get_request<'a>(&self, action_configuration: &'a ActionConfiguration) -> Option<&'a str> {
        action_configuration.body.as_deref()
    }

    async fn execute(&self, props: &ExecutionProps) -> Result<ExecutionOutput> {
        MySqlConnector::execute(self, props).await
    }

    async fn metadata(
        &self,
        datasource_configuration: Option<&DatasourceConfiguration>,
    ) -> Result<DatasourceMetadata> {
        MySqlConnector::metadata(self, datasource_configuration).await
    }

    async fn test(&self, datasource_configuration: Option<&DatasourceConfiguration>) -> Result<()> {
        MySqlConnector::test(self, datasource_configuration).await
    }
}
