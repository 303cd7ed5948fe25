use super::{flag, text, DialectCatalog, MetaQuery, MetaRow};
use crate::models::{Column, DbType};

/// SQL Server via `INFORMATION_SCHEMA` and the `sys` catalog views.
/// Identity columns are found with `COLUMNPROPERTY(..., 'IsIdentity')`.
pub struct SqlServerCatalog;

impl DialectCatalog for SqlServerCatalog {
    fn db_type(&self) -> DbType {
        DbType::SqlServer
    }

    fn tables_query(&self) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT TABLE_NAME AS table_name
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_CATALOG = DB_NAME()
            ORDER BY TABLE_NAME
            "#,
            &[],
        )
    }

    fn columns_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT c.COLUMN_NAME AS column_name, c.DATA_TYPE AS data_type,
                   c.IS_NULLABLE AS is_nullable, c.COLUMN_DEFAULT AS column_default,
                   CASE WHEN EXISTS (
                       SELECT 1 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                       JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
                         ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
                       WHERE tc.TABLE_NAME = c.TABLE_NAME AND ku.COLUMN_NAME = c.COLUMN_NAME
                         AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                   ) THEN 1 ELSE 0 END AS is_pk,
                   CASE WHEN EXISTS (
                       SELECT 1 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                       JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
                         ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
                       WHERE tc.TABLE_NAME = c.TABLE_NAME AND ku.COLUMN_NAME = c.COLUMN_NAME
                         AND tc.CONSTRAINT_TYPE = 'UNIQUE'
                   ) THEN 1 ELSE 0 END AS is_unique,
                   COLUMNPROPERTY(OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME),
                                  c.COLUMN_NAME, 'IsIdentity') AS is_identity
            FROM INFORMATION_SCHEMA.COLUMNS c
            WHERE c.TABLE_NAME = @p1
            ORDER BY c.ORDINAL_POSITION
            "#,
            &[table],
        )
    }

    fn indexes_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT i.name AS index_name, c.name AS column_name,
                   ic.key_ordinal AS seq, i.is_unique AS is_unique,
                   i.type_desc AS index_type
            FROM sys.indexes i
            JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id
            JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
            WHERE i.object_id = OBJECT_ID(@p1) AND i.name IS NOT NULL
            ORDER BY i.name, ic.key_ordinal
            "#,
            &[table],
        )
    }

    fn foreign_keys_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT fk.name AS constraint_name,
                   COL_NAME(fkc.parent_object_id, fkc.parent_column_id) AS column_name,
                   OBJECT_NAME(fkc.referenced_object_id) AS ref_table,
                   COL_NAME(fkc.referenced_object_id, fkc.referenced_column_id) AS ref_column,
                   fk.delete_referential_action_desc AS on_delete,
                   fk.update_referential_action_desc AS on_update,
                   fkc.constraint_column_id AS seq
            FROM sys.foreign_keys fk
            JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id
            WHERE fk.parent_object_id = OBJECT_ID(@p1)
            ORDER BY fk.name, fkc.constraint_column_id
            "#,
            &[table],
        )
    }

    fn primary_key_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT ku.COLUMN_NAME AS column_name, ku.ORDINAL_POSITION AS seq
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
            WHERE tc.TABLE_NAME = @p1 AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
            ORDER BY ku.ORDINAL_POSITION
            "#,
            &[table],
        )
    }

    fn map_column(&self, row: &MetaRow) -> Column {
        Column {
            name: text(row, "column_name").unwrap_or_default(),
            data_type: text(row, "data_type").unwrap_or_default(),
            nullable: flag(row, "is_nullable"),
            default: text(row, "column_default"),
            comment: None,
            is_pk: flag(row, "is_pk"),
            is_fk: false,
            is_unique: flag(row, "is_unique"),
            is_auto_incr: flag(row, "is_identity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_property() {
        let row: MetaRow = serde_json::from_value(json!({
            "column_name": "Id", "data_type": "int", "is_nullable": "NO",
            "column_default": null, "is_pk": 1, "is_unique": 0, "is_identity": 1
        }))
        .unwrap();

        let column = SqlServerCatalog.map_column(&row);

        assert!(column.is_pk);
        assert!(column.is_auto_incr);
        assert!(!column.is_unique);
        assert!(!column.nullable);
    }
}
