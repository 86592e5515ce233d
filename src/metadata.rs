//! Schema introspection: the fixed information-schema query and the fold that
//! groups its rows into tables.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{PluginError, Result};
use crate::types::{Column, RawQueryResult, Table};

/// Columns of the current database, ordered by table then ordinal position.
pub const TABLE_QUERY: &str = "select COLUMN_NAME as name, \
TABLE_NAME as table_name, \
COLUMN_TYPE as column_type \
from information_schema.columns \
where table_schema = database() \
order by table_name, ordinal_position";

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn column_index(raw: &RawQueryResult, name: &str) -> Result<usize> {
    raw.columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| PluginError::Driver(format!("introspection result has no `{}` column", name)))
}

/// Groups introspection rows into tables.
///
/// Tables appear in the order their names are first seen; columns keep result order.
pub fn fold_tables(raw: RawQueryResult) -> Result<Vec<Table>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let name_idx = column_index(&raw, "name")?;
    let table_idx = column_index(&raw, "table_name")?;
    let type_idx = column_index(&raw, "column_type")?;

    let mut tables: IndexMap<String, Table> = IndexMap::new();
    for row in &raw.rows {
        let cell = |i: usize| row.get(i).map(text).unwrap_or_default();
        let table_name = cell(table_idx);
        tables
            .entry(table_name.clone())
            .or_insert_with(|| Table::new(table_name))
            .columns
            .push(Column::new(cell(name_idx), cell(type_idx)));
    }

    Ok(tables.into_values().collect())
}
