//! Live-database schema extraction.
//!
//! A [`DialectCatalog`] knows which metadata queries to run for one dialect
//! and how to read that dialect's flag encodings. A [`MetadataSource`] runs
//! the queries and hands back raw rows. Every catalog aliases its result
//! columns to the same lower-case labels (`column_name`, `data_type`,
//! `index_name`, `seq`, ...), so folding rows into a [`Table`] is shared.

mod mysql;
mod oracle;
mod postgres;
mod sources;
mod sqlserver;

pub use mysql::MySqlCatalog;
pub use oracle::OracleCatalog;
pub use postgres::PostgresCatalog;
pub use sources::{connect_source, MySqlSource, PgSource};
pub use sqlserver::SqlServerCatalog;

use crate::error::Result;
use crate::models::{Column, DbType, ForeignKey, Index, Schema, Table};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// One metadata row keyed by lower-case column label.
pub type MetaRow = HashMap<String, Value>;

/// A metadata query with positional text parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl MetaQuery {
    pub fn new(sql: &str, params: &[&str]) -> Self {
        Self {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Runs metadata queries against a live database.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, query: &MetaQuery) -> Result<Vec<MetaRow>>;
}

/// One index column as reported by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub name: String,
    pub column: String,
    pub seq: i64,
    pub is_unique: bool,
    pub index_type: String,
}

/// Per-dialect metadata queries and row mapping.
pub trait DialectCatalog: Send + Sync {
    fn db_type(&self) -> DbType;

    fn tables_query(&self) -> MetaQuery;
    fn columns_query(&self, table: &str) -> MetaQuery;
    fn indexes_query(&self, table: &str) -> MetaQuery;
    fn foreign_keys_query(&self, table: &str) -> MetaQuery;
    fn primary_key_query(&self, table: &str) -> MetaQuery;

    fn map_column(&self, row: &MetaRow) -> Column;

    fn map_index(&self, row: &MetaRow) -> IndexRow {
        IndexRow {
            name: text(row, "index_name").unwrap_or_default(),
            column: text(row, "column_name").unwrap_or_default(),
            seq: int(row, "seq").unwrap_or(0),
            is_unique: flag(row, "is_unique"),
            index_type: text(row, "index_type").unwrap_or_default().to_uppercase(),
        }
    }

    fn map_foreign_key(&self, row: &MetaRow) -> ForeignKey {
        ForeignKey {
            name: text(row, "constraint_name").unwrap_or_default(),
            column: text(row, "column_name").unwrap_or_default(),
            ref_table: text(row, "ref_table").unwrap_or_default(),
            ref_column: text(row, "ref_column").unwrap_or_default(),
            on_delete: text(row, "on_delete").map(|a| referential_action(&a)),
            on_update: text(row, "on_update").map(|a| referential_action(&a)),
        }
    }
}

/// Pick the catalog for a dialect. `database` scopes the MySQL queries.
pub fn catalog_for(db_type: DbType, database: &str) -> Box<dyn DialectCatalog> {
    match db_type {
        DbType::MySql => Box::new(MySqlCatalog::new(database)),
        DbType::PostgreSql => Box::new(PostgresCatalog::default()),
        DbType::Oracle => Box::new(OracleCatalog),
        DbType::SqlServer => Box::new(SqlServerCatalog),
    }
}

/// Extract every table the catalog lists. Tables are processed one at a
/// time, four queries each; the first failing query aborts the extraction.
pub async fn extract_schema(
    source: &dyn MetadataSource,
    catalog: &dyn DialectCatalog,
    database: &str,
) -> Result<Schema> {
    let mut schema = Schema::new(database, Some(catalog.db_type()));

    let tables: Vec<String> = source
        .fetch(&catalog.tables_query())
        .await?
        .iter()
        .filter_map(|row| text(row, "table_name"))
        .collect();
    info!("Extracting {} tables from {} ({})", tables.len(), database, catalog.db_type());

    for name in tables {
        debug!("Reading metadata for table {}", name);
        let columns = source.fetch(&catalog.columns_query(&name)).await?;
        let indexes = source.fetch(&catalog.indexes_query(&name)).await?;
        let foreign_keys = source.fetch(&catalog.foreign_keys_query(&name)).await?;
        let primary_key = source.fetch(&catalog.primary_key_query(&name)).await?;

        schema.tables.push(assemble_table(
            catalog,
            &name,
            &columns,
            &indexes,
            &foreign_keys,
            &primary_key,
        ));
    }

    Ok(schema)
}

/// Fold the four row sets of one table into a [`Table`].
pub fn assemble_table(
    catalog: &dyn DialectCatalog,
    name: &str,
    columns: &[MetaRow],
    indexes: &[MetaRow],
    foreign_keys: &[MetaRow],
    primary_key: &[MetaRow],
) -> Table {
    let mut table = Table::new(name);
    table.columns = columns.iter().map(|row| catalog.map_column(row)).collect();
    table.indexes = fold_indexes(indexes.iter().map(|row| catalog.map_index(row)).collect());
    table.foreign_keys = fold_foreign_keys(catalog, foreign_keys);
    table.primary_key = ordered_by_seq(primary_key)
        .into_iter()
        .filter_map(|row| text(row, "column_name"))
        .collect();
    table.apply_key_flags();
    table
}

/// Group index rows by name. Indexes keep the order in which they first
/// appear; columns inside an index follow the reported ordinal.
pub fn fold_indexes(rows: Vec<IndexRow>) -> Vec<Index> {
    let mut grouped: Vec<(Index, Vec<(i64, String)>)> = Vec::new();

    for row in rows {
        let pos = match grouped.iter().position(|(index, _)| index.name == row.name) {
            Some(pos) => pos,
            None => {
                grouped.push((
                    Index {
                        name: row.name.clone(),
                        columns: Vec::new(),
                        is_unique: row.is_unique,
                        index_type: row.index_type.clone(),
                    },
                    Vec::new(),
                ));
                grouped.len() - 1
            }
        };
        grouped[pos].1.push((row.seq, row.column));
    }

    grouped
        .into_iter()
        .map(|(mut index, mut columns)| {
            columns.sort_by_key(|(seq, _)| *seq);
            index.columns = columns.into_iter().map(|(_, column)| column).collect();
            index
        })
        .collect()
}

fn fold_foreign_keys(catalog: &dyn DialectCatalog, rows: &[MetaRow]) -> Vec<ForeignKey> {
    let mut first_seen: Vec<String> = Vec::new();
    let mut keyed: Vec<(usize, i64, ForeignKey)> = rows
        .iter()
        .map(|row| {
            let fk = catalog.map_foreign_key(row);
            let group = match first_seen.iter().position(|n| *n == fk.name) {
                Some(pos) => pos,
                None => {
                    first_seen.push(fk.name.clone());
                    first_seen.len() - 1
                }
            };
            (group, int(row, "seq").unwrap_or(0), fk)
        })
        .collect();
    keyed.sort_by_key(|(group, seq, _)| (*group, *seq));
    keyed.into_iter().map(|(_, _, fk)| fk).collect()
}

fn ordered_by_seq(rows: &[MetaRow]) -> Vec<&MetaRow> {
    let mut ordered: Vec<&MetaRow> = rows.iter().collect();
    ordered.sort_by_key(|row| int(row, "seq").unwrap_or(0));
    ordered
}

/// `NO_ACTION` / `no action` / `SET NULL` -> upper-case, space separated.
fn referential_action(action: &str) -> String {
    action.trim().replace('_', " ").to_uppercase()
}

/// Text value of a field. Numbers and booleans are rendered; `NULL` and
/// missing fields are `None`.
pub fn text(row: &MetaRow, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean value of a field: `true`, non-zero numbers, or one of the
/// `YES`/`Y`/`TRUE`/`T`/`1` tokens.
pub fn flag(row: &MetaRow, key: &str) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_uppercase().as_str(),
            "YES" | "Y" | "TRUE" | "T" | "1"
        ),
        _ => false,
    }
}

pub fn int(row: &MetaRow, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text value with empty strings treated as absent.
fn non_empty(row: &MetaRow, key: &str) -> Option<String> {
    text(row, key).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> MetaRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flag_tokens() {
        let r = row(json!({"a": "YES", "b": "N", "c": 1, "d": false, "e": null}));
        assert!(flag(&r, "a"));
        assert!(!flag(&r, "b"));
        assert!(flag(&r, "c"));
        assert!(!flag(&r, "d"));
        assert!(!flag(&r, "e"));
        assert!(!flag(&r, "missing"));
    }

    #[test]
    fn test_fold_indexes_orders_columns_by_seq() {
        let index_row = |name: &str, column: &str, seq: i64, is_unique: bool| IndexRow {
            name: name.into(),
            column: column.into(),
            seq,
            is_unique,
            index_type: "BTREE".into(),
        };
        let rows = vec![
            index_row("idx_b", "y", 2, false),
            index_row("idx_a", "k", 1, true),
            index_row("idx_b", "x", 1, false),
        ];

        let indexes = fold_indexes(rows);

        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "idx_b");
        assert_eq!(indexes[0].columns, vec!["x", "y"]);
        assert!(indexes[1].is_unique);
    }

    #[test]
    fn test_referential_action_normalized() {
        assert_eq!(referential_action("NO_ACTION"), "NO ACTION");
        assert_eq!(referential_action("set null"), "SET NULL");
    }
}
