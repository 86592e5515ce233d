use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row: column name to value, in the column order of the result set.
pub type Record = Map<String, Value>;

/// Server acknowledgement for a statement that produced no result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub insert_id: u64,
}

impl OkPacket {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("affectedRows".to_string(), Value::from(self.affected_rows));
        record.insert("insertId".to_string(), Value::from(self.insert_id));
        record
    }
}

/// Driver-agnostic raw result from a database query.
/// Drivers decode every cell to a JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<Value>>,
    /// Set for INSERT/UPDATE/DELETE-style statements.
    pub ok: Option<OkPacket>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            ok: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a statement that changed rows instead of returning them.
    pub fn ok_packet(affected_rows: u64, insert_id: u64) -> Self {
        Self {
            ok: Some(OkPacket {
                affected_rows,
                insert_id,
            }),
            ..Self::default()
        }
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts the rows into column-keyed records.
    ///
    /// A row-less result carrying an [`OkPacket`] becomes a single
    /// `{affectedRows, insertId}` record. Missing trailing cells are filled
    /// with `null`; if two columns share a name the later one wins.
    pub fn into_records(self) -> Vec<Record> {
        if self.rows.is_empty() {
            return self.ok.map(|ok| vec![ok.into_record()]).unwrap_or_default();
        }
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| {
                let mut values = values.into_iter();
                columns
                    .iter()
                    .map(|col| (col.clone(), values.next().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }
}

/// Normalized query result returned to the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub output: Vec<Record>,
}

impl ExecutionOutput {
    pub fn new(output: Vec<Record>) -> Self {
        Self { output }
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_records_keeps_column_order() {
        let raw = RawQueryResult::new(
            vec!["zeta".to_string(), "alpha".to_string()],
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
        );
        let records = raw.into_records();

        assert_eq!(records.len(), 2);
        let keys: Vec<&str> = records[0].keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(records[1]["alpha"], json!("b"));
    }

    #[test]
    fn test_into_records_pads_short_rows() {
        let raw = RawQueryResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![json!(1)]],
        );
        let records = raw.into_records();
        assert_eq!(records[0]["name"], Value::Null);
    }

    #[test]
    fn test_ok_packet_becomes_single_record() {
        let records = RawQueryResult::ok_packet(3, 17).into_records();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([{ "affectedRows": 3, "insertId": 17 }])
        );
    }

    #[test]
    fn test_empty_result_without_ok_packet_has_no_records() {
        assert!(RawQueryResult::empty().into_records().is_empty());
    }

    #[test]
    fn test_execution_output_serializes_under_output_key() {
        let output = ExecutionOutput::default();
        assert_eq!(serde_json::to_value(&output).unwrap(), json!({ "output": [] }));
    }
}
