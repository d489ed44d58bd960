use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Int64Builder},
    datatypes::{DataType, Field, Schema},
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

use crate::config::CATEGORIES_COLUMN;
use crate::process::categories::{derive_category_names, parse_row_values};
use crate::process::keyed_table::KeyedTable;

/// Replace the composite `categories` column with one integer column per
/// category.
///
/// Names are taken from the first row only and applied to every row by
/// position. Rows that list different categories in the same number of
/// segments are not detected.
pub fn expand_categories(table: &KeyedTable) -> Result<KeyedTable> {
    let raw = table.string_column(CATEGORIES_COLUMN)?;
    if raw.is_empty() {
        bail!("no rows to derive category columns from");
    }
    let first = table
        .text_at(CATEGORIES_COLUMN, 0)?
        .ok_or_else(|| anyhow!("first row has no `{}` to derive columns from", CATEGORIES_COLUMN))?;

    let names = derive_category_names(first);
    let schema = table.batch.schema();
    let mut unique = HashSet::new();
    for name in &names {
        if !unique.insert(name.as_str()) {
            bail!("category `{}` appears twice", name);
        }
        if name != CATEGORIES_COLUMN && schema.field_with_name(name).is_ok() {
            bail!("category `{}` collides with an existing column", name);
        }
    }
    debug!(categories = names.len(), "derived category columns");

    let mut builders: Vec<Int64Builder> = names
        .iter()
        .map(|_| Int64Builder::with_capacity(table.num_rows()))
        .collect();
    for (row, id) in table.ids.iter().enumerate() {
        if raw.is_null(row) {
            bail!("row with id {} has no `{}`", id, CATEGORIES_COLUMN);
        }
        let value = raw.value(row);
        let values = parse_row_values(value, names.len())
            .with_context(|| format!("row with id {}", id))?;
        for (b, v) in builders.iter_mut().zip(values) {
            b.append_value(v);
        }
    }

    let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len() + names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (field, col) in schema.fields().iter().zip(table.batch.columns()) {
        if field.name() == CATEGORIES_COLUMN {
            continue;
        }
        fields.push(field.as_ref().clone());
        columns.push(col.clone());
    }
    for (name, mut b) in names.iter().zip(builders) {
        fields.push(Field::new(name, DataType::Int64, false));
        columns.push(Arc::new(b.finish()) as ArrayRef);
    }

    KeyedTable::try_new(table.ids.clone(), Arc::new(Schema::new(fields)), columns)
}

/// Keep the first row seen for each id.
pub fn drop_duplicate_ids(table: &KeyedTable) -> Result<KeyedTable> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(table.num_rows());
    let mut keep: Vec<u32> = Vec::with_capacity(table.num_rows());
    for (i, id) in table.ids.iter().enumerate() {
        if seen.insert(id) {
            keep.push(i as u32);
        }
    }

    let duplicates = table.num_rows() - keep.len();
    if duplicates == 0 {
        return Ok(table.clone());
    }
    warn!(duplicates, "dropping rows with repeated ids");
    table.take_rows(&keep)
}

/// Expand categories, then deduplicate by id.
#[tracing::instrument(level = "info", skip_all, fields(rows = table.num_rows()))]
pub fn clean_data(table: &KeyedTable) -> Result<KeyedTable> {
    if table.num_rows() == 0 {
        bail!("nothing to clean: the joined table has no rows");
    }
    let expanded = expand_categories(table)?;
    let cleaned = drop_duplicate_ids(&expanded)?;
    info!(
        rows = cleaned.num_rows(),
        columns = cleaned.batch.num_columns(),
        "cleaned"
    );
    Ok(cleaned)
}
