mod row;
mod schema;
mod sql_value;

pub use row::{ExecutionOutput, OkPacket, RawQueryResult, Record};
pub use schema::{Column, DatabaseSchema, DatasourceMetadata, Table, TableType};
pub use sql_value::SqlValue;
