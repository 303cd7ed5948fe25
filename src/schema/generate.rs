use crate::models::{Column, DbType, Schema, Table};
use itertools::Itertools;

/// Render a schema back to `CREATE TABLE` / `CREATE INDEX` statements in the
/// schema's dialect.
pub fn generate_ddl(schema: &Schema) -> String {
    let dialect = schema.db_type;
    schema
        .tables
        .iter()
        .map(|table| table_ddl(table, dialect))
        .join("\n")
}

fn table_ddl(table: &Table, dialect: Option<DbType>) -> String {
    let q = |name: &str| quote(name, dialect);

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| format!("    {}", column_ddl(column, dialect)))
        .collect();

    if !table.primary_key.is_empty() {
        lines.push(format!(
            "    PRIMARY KEY ({})",
            table.primary_key.iter().map(|c| q(c)).join(", ")
        ));
    }

    for fk in &table.foreign_keys {
        let mut line = format!(
            "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            q(&fk.name),
            q(&fk.column),
            q(&fk.ref_table),
            q(&fk.ref_column)
        );
        if let Some(action) = &fk.on_delete {
            line.push_str(&format!(" ON DELETE {}", action));
        }
        if let Some(action) = &fk.on_update {
            line.push_str(&format!(" ON UPDATE {}", action));
        }
        lines.push(line);
    }

    let mut out = format!(
        "CREATE TABLE {} (\n{}\n);\n",
        q(&table.name),
        lines.join(",\n")
    );

    for index in table
        .indexes
        .iter()
        .filter(|i| !i.name.eq_ignore_ascii_case("PRIMARY"))
    {
        out.push_str(&format!(
            "CREATE {}INDEX {} ON {} ({});\n",
            if index.is_unique { "UNIQUE " } else { "" },
            q(&index.name),
            q(&table.name),
            index.columns.iter().map(|c| q(c)).join(", ")
        ));
    }

    out
}

fn column_ddl(column: &Column, dialect: Option<DbType>) -> String {
    let mut def = format!("{} {}", quote(&column.name, dialect), column.data_type);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.is_auto_incr {
        match dialect {
            Some(DbType::MySql) => def.push_str(" AUTO_INCREMENT"),
            Some(DbType::SqlServer) => def.push_str(" IDENTITY(1,1)"),
            _ => {}
        }
    }
    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    def
}

fn quote(name: &str, dialect: Option<DbType>) -> String {
    match dialect {
        Some(DbType::MySql) => format!("`{}`", name),
        Some(DbType::PostgreSql) => format!("\"{}\"", name),
        Some(DbType::SqlServer) => format!("[{}]", name),
        Some(DbType::Oracle) => format!("\"{}\"", name.to_uppercase()),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_ddl;

    #[test]
    fn test_generate_quotes_per_dialect() {
        assert_eq!(quote("users", Some(DbType::MySql)), "`users`");
        assert_eq!(quote("users", Some(DbType::SqlServer)), "[users]");
        assert_eq!(quote("users", Some(DbType::Oracle)), "\"USERS\"");
        assert_eq!(quote("users", None), "users");
    }

    #[test]
    fn test_generated_ddl_parses_back() {
        let source = "CREATE TABLE users (id INT AUTO_INCREMENT, email VARCHAR(255) NOT NULL, PRIMARY KEY (id));
            CREATE TABLE orders (id INT, user_id INT, FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE);
            CREATE UNIQUE INDEX idx_email ON users (email);";
        let schema = parse_ddl(source, Some(DbType::MySql));

        let ddl = generate_ddl(&schema);
        assert!(ddl.contains("`id` INT NOT NULL AUTO_INCREMENT"));
        assert!(ddl.contains("CREATE UNIQUE INDEX `idx_email` ON `users` (`email`);"));

        let reparsed = parse_ddl(&ddl, Some(DbType::MySql));
        assert_eq!(reparsed.tables, schema.tables);
    }
}
