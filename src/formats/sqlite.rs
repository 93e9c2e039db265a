//! Embedded relational-store codec.
//!
//! A store may hold several tables. Reads either select one table or return
//! every table as a relation set. Writes go to a table named after the
//! destination file, typed entirely as `TEXT`, inside one transaction.

use super::{file_stem, value_to_text, Format, FormatAdapter};
use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Loaded, Record, RelationSelector, RelationSet};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use std::path::Path;

pub struct SqliteAdapter;

/// Quote an identifier so any table or column name is usable
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn open_source(source: &Path) -> Result<Connection> {
    // Opening read-write would create a missing file.
    if !source.is_file() {
        return Err(ConvertError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }
    Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| ConvertError::malformed(source, Format::Sqlite, e))
}

fn table_names(conn: &Connection, source: &Path) -> Result<Vec<String>> {
    let malformed = |e: rusqlite::Error| ConvertError::malformed(source, Format::Sqlite, e);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(malformed)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(malformed)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(malformed)?;
    Ok(names)
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn read_table(conn: &Connection, table: &str, source: &Path) -> Result<Dataset> {
    let malformed = |e: rusqlite::Error| ConvertError::malformed(source, Format::Sqlite, e);

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
        .map_err(malformed)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(malformed)?;
    let mut dataset = Dataset::default();
    while let Some(row) = rows.next().map_err(malformed)? {
        let mut record: Record = Map::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(malformed)?;
            record.insert(column.clone(), column_value(value));
        }
        dataset.push(record);
    }

    tracing::debug!(table = %table, rows = dataset.len(), "read sqlite table");
    Ok(dataset)
}

impl SqliteAdapter {
    /// Insert a dataset into `table`, creating it if needed. Every row goes
    /// in under one transaction; any failure leaves the table untouched.
    pub fn write_table(conn: &mut Connection, table: &str, dataset: &Dataset) -> rusqlite::Result<()> {
        let headers = dataset.field_names();
        let columns = headers
            .iter()
            .map(|h| format!("{} TEXT", quote_ident(h)))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = headers.iter().map(|h| quote_ident(h)).collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; headers.len()].join(", ");

        let tx = conn.transaction()?;
        tx.execute(
            &format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), columns),
            [],
        )?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                column_list,
                placeholders
            ))?;
            for record in dataset.records() {
                let row = headers
                    .iter()
                    .map(|h| record.get(h.as_str()).and_then(value_to_text));
                insert.execute(params_from_iter(row))?;
            }
        }
        // Dropping an uncommitted transaction rolls it back.
        tx.commit()
    }
}

impl FormatAdapter for SqliteAdapter {
    fn read(&self, source: &Path, selector: Option<&RelationSelector>) -> Result<Loaded> {
        let conn = open_source(source)?;
        let tables = table_names(&conn, source)?;

        match selector {
            Some(RelationSelector::Named(name)) => {
                if !tables.iter().any(|t| t == name) {
                    return Err(ConvertError::RelationNotFound {
                        name: name.clone(),
                        path: source.to_path_buf(),
                    });
                }
                Ok(Loaded::Single(read_table(&conn, name, source)?))
            }
            Some(RelationSelector::All) | None => {
                let mut relations = RelationSet::new();
                for table in &tables {
                    relations.insert(table.clone(), read_table(&conn, table, source)?);
                }
                Ok(Loaded::Relations(relations))
            }
        }
    }

    fn write(&self, dataset: &Dataset, destination: &Path) -> Result<()> {
        // A table needs at least one column.
        if dataset.is_empty() || dataset.field_names().is_empty() {
            tracing::debug!(path = %destination.display(), "no fields, nothing to write");
            return Ok(());
        }

        let table = file_stem(destination);
        let mut conn = Connection::open(destination).map_err(|e| ConvertError::unwritable(destination, e))?;
        Self::write_table(&mut conn, &table, dataset).map_err(|e| {
            tracing::error!(path = %destination.display(), table = %table, error = %e, "sqlite write rolled back");
            ConvertError::unwritable(destination, e)
        })
    }

    fn list_relations(&self, source: &Path) -> Result<Vec<String>> {
        let conn = open_source(source)?;
        table_names(&conn, source)
    }
}
