use async_trait::async_trait;

use crate::config::{ActionConfiguration, DatasourceConfiguration, ExecutionProps};
use crate::error::Result;
use crate::types::{DatasourceMetadata, ExecutionOutput};

/// Capabilities the host expects from every datasource plugin.
#[async_trait]
pub trait DatasourcePlugin: Send + Sync {
    fn plugin_name(&self) -> &'static str;

    /// Action-configuration fields that may hold template expressions.
    /// The host resolves them before calling `execute`.
    fn dynamic_properties(&self) -> &'static [&'static str];

    /// Whether resolved template values become numbered (`$1`) placeholders
    /// rather than anonymous `?` markers.
    fn uses_ordered_parameters(&self) -> bool;

    /// The raw request, for the host's audit log.
    fn get_request<'a>(&self, action_configuration: &'a ActionConfiguration) -> Option<&'a str>;

    async fn execute(&self, props: &ExecutionProps) -> Result<ExecutionOutput>;

    async fn metadata(
        &self,
        datasource_configuration: Option<&DatasourceConfiguration>,
    ) -> Result<DatasourceMetadata>;

    async fn test(&self, datasource_configuration: Option<&DatasourceConfiguration>) -> Result<()>;
}
