// src/process/load.rs
use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray, UInt32Array},
    compute::take,
    datatypes::{DataType, Field, Schema},
};
use csv::ReaderBuilder;
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
    sync::Arc,
};
use tracing::{debug, info};

use crate::config::ID_COLUMN;
use crate::process::keyed_table::KeyedTable;
use crate::process::utils::{clean_cell, clean_str};

/// Read a headed CSV file into a table keyed by its `id` column.
///
/// Every other column becomes nullable text; empty cells are null.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_keyed_csv<P: AsRef<Path>>(path: P) -> Result<KeyedTable> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("Failed to read header row of {:?}", path))?
        .iter()
        .map(clean_str)
        .collect();

    let id_pos = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| anyhow!("{:?} has no `{}` column", path, ID_COLUMN))?;

    let mut seen = HashSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            bail!("{:?} has duplicate column `{}`", path, h);
        }
    }

    let mut ids = Vec::new();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {:?} at record {}", path, idx))?;
        for (pos, value) in record.iter().enumerate() {
            if pos == id_pos {
                let id = clean_str(value);
                if id.is_empty() {
                    bail!("{:?} record {} has an empty `{}`", path, idx, ID_COLUMN);
                }
                ids.push(id);
            } else {
                columns[pos].push(clean_cell(value));
            }
        }
    }

    let mut fields = Vec::with_capacity(headers.len().saturating_sub(1));
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (pos, (name, values)) in headers.iter().zip(columns).enumerate() {
        if pos == id_pos {
            continue;
        }
        fields.push(Field::new(name, DataType::Utf8, true));
        arrays.push(Arc::new(StringArray::from(values)));
    }

    debug!(rows = ids.len(), columns = fields.len(), "read csv");
    KeyedTable::try_new(ids, Arc::new(Schema::new(fields)), arrays)
}

/// Outer join on `id`, pairing the k-th occurrence of an id on the left with
/// the k-th occurrence on the right.
///
/// Left rows come first in their own order, then right rows nobody claimed.
/// Cells without a partner row are null.
pub fn join_on_id(left: &KeyedTable, right: &KeyedTable) -> Result<KeyedTable> {
    let left_schema = left.batch.schema();
    let right_schema = right.batch.schema();
    for f in right_schema.fields() {
        if left_schema.field_with_name(f.name()).is_ok() {
            bail!("column `{}` is present in both inputs", f.name());
        }
    }

    let mut right_rows: HashMap<&str, Vec<u32>> = HashMap::new();
    for (i, id) in right.ids.iter().enumerate() {
        right_rows.entry(id.as_str()).or_default().push(i as u32);
    }

    let total = left.num_rows().max(right.num_rows());
    let mut ids = Vec::with_capacity(total);
    let mut left_idx: Vec<Option<u32>> = Vec::with_capacity(total);
    let mut right_idx: Vec<Option<u32>> = Vec::with_capacity(total);
    let mut claimed = vec![false; right.num_rows()];
    let mut occurrence: HashMap<&str, usize> = HashMap::new();

    for (i, id) in left.ids.iter().enumerate() {
        let k = occurrence.entry(id.as_str()).or_insert(0);
        let partner = right_rows.get(id.as_str()).and_then(|rows| rows.get(*k)).copied();
        *k += 1;
        if let Some(r) = partner {
            claimed[r as usize] = true;
        }
        ids.push(id.clone());
        left_idx.push(Some(i as u32));
        right_idx.push(partner);
    }

    for (r, id) in right.ids.iter().enumerate() {
        if !claimed[r] {
            ids.push(id.clone());
            left_idx.push(None);
            right_idx.push(Some(r as u32));
        }
    }

    let unmatched = ids.len() - left.num_rows();
    if unmatched > 0 {
        info!(unmatched, "category rows without a matching message");
    }

    let left_idx = UInt32Array::from(left_idx);
    let right_idx = UInt32Array::from(right_idx);
    let mut fields: Vec<Field> = Vec::with_capacity(left_schema.fields().len() + right_schema.fields().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (side, idx) in [(left, &left_idx), (right, &right_idx)] {
        for (field, col) in side.batch.schema().fields().iter().zip(side.batch.columns()) {
            // unmatched rows turn into nulls
            fields.push(field.as_ref().clone().with_nullable(true));
            arrays.push(take(col.as_ref(), idx, None).context("aligning joined column")?);
        }
    }

    KeyedTable::try_new(ids, Arc::new(Schema::new(fields)), arrays)
}

/// Read both inputs and join them on `id`.
#[tracing::instrument(level = "info", skip_all)]
pub fn load_data<P: AsRef<Path>, Q: AsRef<Path>>(
    messages_path: P,
    categories_path: Q,
) -> Result<KeyedTable> {
    let messages = read_keyed_csv(messages_path)?;
    let categories = read_keyed_csv(categories_path)?;
    let joined = join_on_id(&messages, &categories)?;
    info!(
        messages = messages.num_rows(),
        categories = categories.num_rows(),
        joined = joined.num_rows(),
        "loaded inputs"
    );
    Ok(joined)
}
