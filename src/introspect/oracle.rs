use super::{flag, int, text, DialectCatalog, IndexRow, MetaQuery, MetaRow};
use crate::models::{Column, DbType};

/// Oracle via the `USER_*` dictionary views of the connected schema.
///
/// Nullability is `Y`/`N`; PK and unique membership come from correlated
/// lookups against `USER_CONSTRAINTS`; identity columns report
/// `IDENTITY_COLUMN = 'YES'`.
pub struct OracleCatalog;

impl DialectCatalog for OracleCatalog {
    fn db_type(&self) -> DbType {
        DbType::Oracle
    }

    fn tables_query(&self) -> MetaQuery {
        MetaQuery::new(
            "SELECT table_name AS table_name FROM user_tables ORDER BY table_name",
            &[],
        )
    }

    fn columns_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT c.column_name AS column_name,
                   c.data_type AS data_type,
                   c.nullable AS is_nullable,
                   c.data_default AS column_default,
                   c.identity_column AS is_identity,
                   cc.comments AS column_comment,
                   NVL((SELECT 'Y' FROM user_cons_columns ucc
                        JOIN user_constraints uc ON ucc.constraint_name = uc.constraint_name
                        WHERE uc.constraint_type = 'P' AND ucc.table_name = c.table_name
                          AND ucc.column_name = c.column_name AND ROWNUM = 1), 'N') AS is_pk,
                   NVL((SELECT 'Y' FROM user_cons_columns ucc
                        JOIN user_constraints uc ON ucc.constraint_name = uc.constraint_name
                        WHERE uc.constraint_type = 'R' AND ucc.table_name = c.table_name
                          AND ucc.column_name = c.column_name AND ROWNUM = 1), 'N') AS is_fk,
                   NVL((SELECT 'Y' FROM user_cons_columns ucc
                        JOIN user_constraints uc ON ucc.constraint_name = uc.constraint_name
                        WHERE uc.constraint_type = 'U' AND ucc.table_name = c.table_name
                          AND ucc.column_name = c.column_name AND ROWNUM = 1), 'N') AS is_unique
            FROM user_tab_columns c
            LEFT JOIN user_col_comments cc
              ON cc.table_name = c.table_name AND cc.column_name = c.column_name
            WHERE c.table_name = :1
            ORDER BY c.column_id
            "#,
            &[table],
        )
    }

    fn indexes_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT ui.index_name AS index_name, uic.column_name AS column_name,
                   uic.column_position AS seq, ui.uniqueness AS uniqueness,
                   ui.index_type AS index_type
            FROM user_indexes ui
            JOIN user_ind_columns uic ON ui.index_name = uic.index_name
            WHERE ui.table_name = :1
            ORDER BY ui.index_name, uic.column_position
            "#,
            &[table],
        )
    }

    fn foreign_keys_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT uc.constraint_name AS constraint_name,
                   ucc.column_name AS column_name,
                   rc.table_name AS ref_table,
                   rcc.column_name AS ref_column,
                   uc.delete_rule AS on_delete,
                   ucc.position AS seq
            FROM user_constraints uc
            JOIN user_cons_columns ucc ON uc.constraint_name = ucc.constraint_name
            JOIN user_constraints rc ON rc.constraint_name = uc.r_constraint_name
            JOIN user_cons_columns rcc
              ON rcc.constraint_name = uc.r_constraint_name AND rcc.position = ucc.position
            WHERE uc.table_name = :1 AND uc.constraint_type = 'R'
            ORDER BY uc.constraint_name, ucc.position
            "#,
            &[table],
        )
    }

    fn primary_key_query(&self, table: &str) -> MetaQuery {
        MetaQuery::new(
            r#"
            SELECT ucc.column_name AS column_name, ucc.position AS seq
            FROM user_constraints uc
            JOIN user_cons_columns ucc ON uc.constraint_name = ucc.constraint_name
            WHERE uc.table_name = :1 AND uc.constraint_type = 'P'
            ORDER BY ucc.position
            "#,
            &[table],
        )
    }

    fn map_column(&self, row: &MetaRow) -> Column {
        Column {
            name: text(row, "column_name").unwrap_or_default(),
            data_type: text(row, "data_type").unwrap_or_default(),
            nullable: flag(row, "is_nullable"),
            // DATA_DEFAULT is a LONG and keeps the trailing newline of the DDL
            default: text(row, "column_default")
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            comment: text(row, "column_comment"),
            is_pk: flag(row, "is_pk"),
            is_fk: flag(row, "is_fk"),
            is_unique: flag(row, "is_unique"),
            is_auto_incr: flag(row, "is_identity"),
        }
    }

    fn map_index(&self, row: &MetaRow) -> IndexRow {
        IndexRow {
            name: text(row, "index_name").unwrap_or_default(),
            column: text(row, "column_name").unwrap_or_default(),
            seq: int(row, "seq").unwrap_or(0),
            is_unique: text(row, "uniqueness")
                .map_or(false, |u| u.eq_ignore_ascii_case("UNIQUE")),
            index_type: text(row, "index_type").unwrap_or_default().to_uppercase(),
        }
    }
}
