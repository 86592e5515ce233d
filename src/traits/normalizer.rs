use crate::types::Record;

/// Canonicalizes result column names so every connector in the host
/// returns rows keyed the same way.
pub trait ColumnNameNormalizer: Send + Sync {
    fn normalize(&self, name: &str) -> String;

    /// Rewrites the keys of every record, keeping column order.
    fn normalize_records(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(name, value)| (self.normalize(&name), value))
                    .collect()
            })
            .collect()
    }
}
