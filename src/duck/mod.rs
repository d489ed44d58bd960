use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, Int64Array, StringArray},
    datatypes::DataType,
};
use duckdb::{appender_params_from_iter, types::Value, Connection};
use std::{path::Path, time::Instant};
use tracing::{debug, info};

use crate::process::keyed_table::KeyedTable;
use crate::process::utils::quote_ident;

/// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    Ok(conn)
}

/// Open a DuckDB in‐memory database
pub fn open_mem_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    Ok(conn)
}

/// Map an Arrow column type to the DuckDB column type it is stored as.
///
/// - Utf8  → VARCHAR
/// - Int64 → BIGINT
pub fn map_to_sql_type(dt: &DataType) -> Result<&'static str> {
    match dt {
        DataType::Utf8 => Ok("VARCHAR"),
        DataType::Int64 => Ok("BIGINT"),
        other => Err(anyhow!("no column type for {:?}", other)),
    }
}

/// `CREATE OR REPLACE TABLE` statement matching the table's columns.
pub fn create_table_sql(table_name: &str, table: &KeyedTable) -> Result<String> {
    let schema = table.batch.schema();
    if schema.fields().is_empty() {
        bail!("table `{}` would have no columns", table_name);
    }
    let cols = schema
        .fields()
        .iter()
        .map(|f| Ok(format!("{} {}", quote_ident(f.name()), map_to_sql_type(f.data_type())?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "CREATE OR REPLACE TABLE {} ({});",
        quote_ident(table_name),
        cols.join(", ")
    ))
}

enum ColumnRef<'a> {
    Text(&'a StringArray),
    Int(&'a Int64Array),
}

impl ColumnRef<'_> {
    fn value(&self, row: usize) -> Value {
        match self {
            ColumnRef::Text(a) if a.is_null(row) => Value::Null,
            ColumnRef::Text(a) => Value::Text(a.value(row).to_string()),
            ColumnRef::Int(a) if a.is_null(row) => Value::Null,
            ColumnRef::Int(a) => Value::BigInt(a.value(row)),
        }
    }
}

fn column_refs(table: &KeyedTable) -> Result<Vec<ColumnRef<'_>>> {
    table
        .batch
        .columns()
        .iter()
        .map(|col| {
            if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
                Ok(ColumnRef::Text(a))
            } else if let Some(a) = col.as_any().downcast_ref::<Int64Array>() {
                Ok(ColumnRef::Int(a))
            } else {
                Err(anyhow!("cannot store column of type {:?}", col.data_type()))
            }
        })
        .collect()
}

/// Replace `table_name` with the contents of `table`, in one transaction.
///
/// The id index is not stored. Returns the number of rows written.
pub fn save_table(conn: &mut Connection, table_name: &str, table: &KeyedTable) -> Result<usize> {
    let start = Instant::now();
    let ddl = create_table_sql(table_name, table)?;
    let columns = column_refs(table)?;

    let tx = conn.transaction().context("starting transaction")?;
    tx.execute_batch(&ddl)
        .with_context(|| format!("creating table `{}`", table_name))?;
    {
        let mut appender = tx
            .appender(table_name)
            .with_context(|| format!("opening appender on `{}`", table_name))?;
        for row in 0..table.num_rows() {
            appender
                .append_row(appender_params_from_iter(columns.iter().map(|c| c.value(row))))
                .with_context(|| format!("appending row {} to `{}`", row, table_name))?;
        }
        appender.flush()?;
    }
    tx.commit()
        .with_context(|| format!("committing table `{}`", table_name))?;

    debug!(table = table_name, rows = table.num_rows(), elapsed = ?start.elapsed(), "stored");
    Ok(table.num_rows())
}

/// Write the cleaned table into the database at `database_path`, under a
/// table named after that same argument.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.num_rows()))]
pub fn save_data(table: &KeyedTable, database_path: &str) -> Result<usize> {
    let mut conn = open_disk_db(database_path)?;
    let rows = save_table(&mut conn, database_path, table)?;
    info!(database = database_path, rows, "saved");
    Ok(rows)
}
