use crate::traits::ColumnNameNormalizer;

/// Trims a column name and joins its words with `_`.
///
/// `"  order total "` becomes `"order_total"`; names without whitespace pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultColumnNameNormalizer;

impl ColumnNameNormalizer for DefaultColumnNameNormalizer {
    fn normalize(&self, name: &str) -> String {
        name.split_whitespace().collect::<Vec<_>>().join("_")
    }
}
