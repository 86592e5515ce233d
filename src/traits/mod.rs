mod driver;
mod normalizer;
mod plugin;

pub use driver::{
    BoxedConnection, CloseOnTeardown, ConnectionFactory, ConnectionTeardown, DatabaseConnection,
};
pub use normalizer::ColumnNameNormalizer;
pub use plugin::DatasourcePlugin;
