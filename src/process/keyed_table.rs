use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray, UInt32Array},
    compute::take,
    datatypes::Schema,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;

/// A table indexed by its identifier column.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    /// One identifier per row, in row order. Not unique until deduplicated.
    pub ids: Vec<String>,
    /// Every non-identifier column.
    pub batch: RecordBatch,
}

impl KeyedTable {
    /// Assemble a table, checking that every column has one value per id.
    /// The explicit row count keeps tables with no data columns valid.
    pub fn try_new(ids: Vec<String>, schema: Arc<Schema>, columns: Vec<ArrayRef>) -> Result<Self> {
        let options = RecordBatchOptions::new().with_row_count(Some(ids.len()));
        let batch = RecordBatch::try_new_with_options(schema, columns, &options)
            .context("assembling keyed table")?;
        Ok(Self { ids, batch })
    }

    pub fn num_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Borrow a text column by name.
    pub fn string_column(&self, name: &str) -> Result<&StringArray> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| anyhow!("missing column `{}`", name))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("column `{}` is not text", name))
    }

    /// Keep only the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[u32]) -> Result<Self> {
        let idx = UInt32Array::from(indices.to_vec());
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|c| take(c.as_ref(), &idx, None))
            .collect::<Result<Vec<_>, _>>()
            .context("selecting rows")?;
        let ids = indices
            .iter()
            .map(|&i| self.ids[i as usize].clone())
            .collect();
        Self::try_new(ids, self.batch.schema(), columns)
    }

    /// Row `row` of text column `name`, or `None` if null.
    pub fn text_at(&self, name: &str, row: usize) -> Result<Option<&str>> {
        let col = self.string_column(name)?;
        Ok(if col.is_null(row) {
            None
        } else {
            Some(col.value(row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    fn sample() -> Result<KeyedTable> {
        let schema = Arc::new(Schema::new(vec![Field::new("message", DataType::Utf8, true)]));
        let col: ArrayRef = Arc::new(StringArray::from(vec![Some("a"), None, Some("c")]));
        KeyedTable::try_new(
            vec!["1".into(), "2".into(), "3".into()],
            schema,
            vec![col],
        )
    }

    #[test]
    fn take_rows_keeps_ids_and_values_aligned() -> Result<()> {
        let t = sample()?.take_rows(&[2, 0])?;
        assert_eq!(t.ids, vec!["3", "1"]);
        assert_eq!(t.text_at("message", 0)?, Some("c"));
        assert_eq!(t.text_at("message", 1)?, Some("a"));
        Ok(())
    }

    #[test]
    fn table_without_data_columns_still_counts_rows() -> Result<()> {
        let t = KeyedTable::try_new(vec!["1".into(), "2".into()], Arc::new(Schema::empty()), vec![])?;
        assert_eq!(t.batch.num_rows(), 2);
        assert_eq!(t.take_rows(&[1])?.batch.num_rows(), 1);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let schema = Arc::new(Schema::new(vec![Field::new("message", DataType::Utf8, true)]));
        let col: ArrayRef = Arc::new(StringArray::from(vec![Some("a")]));
        assert!(KeyedTable::try_new(vec!["1".into(), "2".into()], schema, vec![col]).is_err());
    }
}
