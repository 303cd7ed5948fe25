use super::{flag, text, DialectCatalog, MetaQuery, MetaRow};
use crate::models::{Column, DbType};

/// PostgreSQL via `information_schema` and `pg_catalog`.
///
/// Key flags come from correlated `EXISTS` lookups against the constraint
/// tables. Every value is cast to `text`/`int` so rows decode uniformly.
pub struct PostgresCatalog {
    schema: String,
}

impl Default for PostgresCatalog {
    fn default() -> Self {
        Self::new("public")
    }
}

impl PostgresCatalog {
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
        }
    }
}

impl DialectCatalog for PostgresCatalog {
    fn db_type(&self) -> DbType {
        DbType::PostgreSql
    }

    fn tables_query(&self) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
            &[self.schema.as_str()],
        )
    }

    fn columns_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT c.column_name::text AS column_name,
                   c.data_type::text AS data_type,
                   c.is_nullable::text AS is_nullable,
                   c.column_default::text AS column_default,
                   c.is_identity::text AS is_identity,
                   col_description(format('%I.%I', c.table_schema, c.table_name)::regclass::oid,
                                   c.ordinal_position::int) AS column_comment,
                   EXISTS (
                       SELECT 1
                       FROM information_schema.table_constraints tc
                       JOIN information_schema.key_column_usage kcu
                         ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                       WHERE tc.table_schema = c.table_schema AND tc.table_name = c.table_name
                         AND kcu.column_name = c.column_name
                         AND tc.constraint_type = 'PRIMARY KEY'
                   ) AS is_pk,
                   EXISTS (
                       SELECT 1
                       FROM information_schema.table_constraints tc
                       JOIN information_schema.key_column_usage kcu
                         ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                       WHERE tc.table_schema = c.table_schema AND tc.table_name = c.table_name
                         AND kcu.column_name = c.column_name
                         AND tc.constraint_type = 'FOREIGN KEY'
                   ) AS is_fk,
                   EXISTS (
                       SELECT 1
                       FROM information_schema.table_constraints tc
                       JOIN information_schema.key_column_usage kcu
                         ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                       WHERE tc.table_schema = c.table_schema AND tc.table_name = c.table_name
                         AND kcu.column_name = c.column_name
                         AND tc.constraint_type = 'UNIQUE'
                   ) AS is_unique
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
            "#,
            &[self.schema.as_str(), table],
        )
    }

    fn indexes_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT i.relname::text AS index_name,
                   a.attname::text AS column_name,
                   array_position(ix.indkey::int2[], a.attnum)::int AS seq,
                   ix.indisunique AS is_unique,
                   am.amname::text AS index_type
            FROM pg_class t
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_index ix ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_am am ON i.relam = am.oid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = $1 AND t.relname = $2 AND t.relkind = 'r'
            ORDER BY i.relname, seq
            "#,
            &[self.schema.as_str(), table],
        )
    }

    fn foreign_keys_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT tc.constraint_name::text AS constraint_name,
                   kcu.column_name::text AS column_name,
                   ccu.table_name::text AS ref_table,
                   ccu.column_name::text AS ref_column,
                   rc.delete_rule::text AS on_delete,
                   rc.update_rule::text AS on_update,
                   kcu.ordinal_position::int AS seq
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.referential_constraints rc
              ON rc.constraint_name = tc.constraint_name
             AND rc.constraint_schema = tc.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON ccu.constraint_name = tc.constraint_name
             AND ccu.constraint_schema = tc.table_schema
            WHERE tc.table_schema = $1 AND tc.table_name = $2
              AND tc.constraint_type = 'FOREIGN KEY'
            ORDER BY tc.constraint_name, kcu.ordinal_position
            "#,
            &[self.schema.as_str(), table],
        )
    }

    fn primary_key_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT kcu.column_name::text AS column_name,
                   kcu.ordinal_position::int AS seq
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = $1 AND tc.table_name = $2
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
            "#,
            &[self.schema.as_str(), table],
        )
    }

    fn map_column(&self, row: &MetaRow) -> Column {
        let data_type = text(row, "data_type").unwrap_or_default();
        let default = text(row, "column_default");
        let is_auto_incr = default.as_deref().map_or(false, |d| d.contains("nextval("))
            || data_type.to_lowercase().contains("serial")
            || flag(row, "is_identity");

        Column {
            name: text(row, "column_name").unwrap_or_default(),
            nullable: flag(row, "is_nullable"),
            comment: text(row, "column_comment"),
            is_pk: flag(row, "is_pk"),
            is_fk: flag(row, "is_fk"),
            is_unique: flag(row, "is_unique"),
            is_auto_incr,
            default,
            data_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nextval_default_marks_auto_increment() {
        let row: MetaRow = serde_json::from_value(json!({
            "column_name": "id", "data_type": "integer", "is_nullable": "NO",
            "column_default": "nextval('users_id_seq'::regclass)", "is_identity": "NO",
            "column_comment": null, "is_pk": true, "is_fk": false, "is_unique": false
        }))
        .unwrap();

        let column = PostgresCatalog::default().map_column(&row);

        assert!(column.is_auto_incr);
        assert!(column.is_pk);
        assert!(!column.nullable);
        assert_eq!(column.default.as_deref(), Some("nextval('users_id_seq'::regclass)"));
    }

    #[test]
    fn test_identity_column_marks_auto_increment() {
        let row: MetaRow = serde_json::from_value(json!({
            "column_name": "id", "data_type": "bigint", "is_nullable": "NO",
            "column_default": null, "is_identity": "YES"
        }))
        .unwrap();

        assert!(PostgresCatalog::default().map_column(&row).is_auto_incr);
    }
}
