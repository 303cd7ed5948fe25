use super::{flag, int, non_empty, text, DialectCatalog, IndexRow, MetaQuery, MetaRow};
use crate::models::{Column, DbType};

/// MySQL / MariaDB via `INFORMATION_SCHEMA`, scoped to one database.
///
/// Key membership comes from the single `COLUMN_KEY` field: `PRI`, `UNI`,
/// or `MUL` (first column of a non-unique index, reported as a foreign-key
/// candidate).
pub struct MySqlCatalog {
    database: String,
}

impl MySqlCatalog {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
        }
    }
}

impl DialectCatalog for MySqlCatalog {
    fn db_type(&self) -> DbType {
        DbType::MySql
    }

    fn tables_query(&self) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT TABLE_NAME AS table_name
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#,
            &[self.database.as_str()],
        )
    }

    fn columns_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT COLUMN_NAME AS column_name, COLUMN_TYPE AS data_type,
                   IS_NULLABLE AS is_nullable, COLUMN_DEFAULT AS column_default,
                   COLUMN_KEY AS column_key, EXTRA AS extra,
                   COLUMN_COMMENT AS column_comment
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
            &[self.database.as_str(), table],
        )
    }

    fn indexes_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT INDEX_NAME AS index_name, COLUMN_NAME AS column_name,
                   SEQ_IN_INDEX AS seq, NON_UNIQUE AS non_unique,
                   INDEX_TYPE AS index_type
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#,
            &[self.database.as_str(), table],
        )
    }

    fn foreign_keys_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT k.CONSTRAINT_NAME AS constraint_name, k.COLUMN_NAME AS column_name,
                   k.REFERENCED_TABLE_NAME AS ref_table,
                   k.REFERENCED_COLUMN_NAME AS ref_column,
                   r.DELETE_RULE AS on_delete, r.UPDATE_RULE AS on_update,
                   k.ORDINAL_POSITION AS seq
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
            JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS r
              ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
             AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
            WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
              AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
            "#,
            &[self.database.as_str(), table],
        )
    }

    fn primary_key_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT COLUMN_NAME AS column_name, ORDINAL_POSITION AS seq
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
            "#,
            &[self.database.as_str(), table],
        )
    }

    fn map_column(&self, row: &MetaRow) -> Column {
        let key = text(row, "column_key").unwrap_or_default().to_uppercase();
        Column {
            name: text(row, "column_name").unwrap_or_default(),
            data_type: text(row, "data_type").unwrap_or_default(),
            nullable: flag(row, "is_nullable"),
            default: text(row, "column_default"),
            comment: non_empty(row, "column_comment"),
            is_pk: key == "PRI",
            is_fk: key == "MUL",
            is_unique: key == "UNI",
            is_auto_incr: text(row, "extra")
                .map_or(false, |extra| extra.to_lowercase().contains("auto_increment")),
        }
    }

    fn map_index(&self, row: &MetaRow) -> IndexRow {
        IndexRow {
            name: text(row, "index_name").unwrap_or_default(),
            column: text(row, "column_name").unwrap_or_default(),
            seq: int(row, "seq").unwrap_or(0),
            is_unique: !flag(row, "non_unique"),
            index_type: text(row, "index_type").unwrap_or_default().to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_column_key_categories() {
        let catalog = MySqlCatalog::new("shop");
        let row: MetaRow = serde_json::from_value(json!({
            "column_name": "id", "data_type": "int(11)", "is_nullable": "NO",
            "column_default": null, "column_key": "PRI", "extra": "auto_increment",
            "column_comment": ""
        }))
        .unwrap();

        let column = catalog.map_column(&row);

        assert!(column.is_pk);
        assert!(column.is_auto_incr);
        assert!(!column.nullable);
        assert_eq!(column.comment, None);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_queries_bind_database_and_table() {
        let catalog = MySqlCatalog::new("shop");
        assert_eq!(catalog.columns_query("users").params, vec!["shop", "users"]);
        assert_eq!(catalog.tables_query().params, vec!["shop"]);
    }
}
