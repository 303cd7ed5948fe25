//! Canonical schema and query records shared by the DDL parser, the
//! introspection normalizer and the response extractor.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    MySql,
    PostgreSql,
    Oracle,
    SqlServer,
}

impl DbType {
    pub const ALL: [DbType; 4] = [
        DbType::MySql,
        DbType::PostgreSql,
        DbType::Oracle,
        DbType::SqlServer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::MySql => "mysql",
            DbType::PostgreSql => "postgresql",
            DbType::Oracle => "oracle",
            DbType::SqlServer => "sqlserver",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DbType::MySql => 3306,
            DbType::PostgreSql => 5432,
            DbType::Oracle => 1521,
            DbType::SqlServer => 1433,
        }
    }

    /// Guess the dialect of a DDL dump from header comments and type keywords.
    pub fn detect(ddl: &str) -> Option<Self> {
        let lower = ddl.to_lowercase();

        if lower.contains("postgresql database dump") || lower.contains("pg_dump") {
            return Some(DbType::PostgreSql);
        }
        if lower.contains("mysql dump") || lower.contains("mysqldump") {
            return Some(DbType::MySql);
        }

        if lower.contains("auto_increment") || lower.contains("engine=") || lower.contains('`') {
            return Some(DbType::MySql);
        }
        if lower.contains("serial") || lower.contains("timestamptz") || lower.contains("::") {
            return Some(DbType::PostgreSql);
        }
        if lower.contains("identity(") || lower.contains("nvarchar") || lower.contains('[') {
            return Some(DbType::SqlServer);
        }
        if lower.contains("varchar2") || lower.contains("number(") {
            return Some(DbType::Oracle);
        }

        None
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DbType::MySql),
            "postgresql" | "postgres" | "pg" => Ok(DbType::PostgreSql),
            "oracle" => Ok(DbType::Oracle),
            "sqlserver" | "mssql" => Ok(DbType::SqlServer),
            other => Err(format!("unsupported database type: {}", other)),
        }
    }
}

/// Decoding accepts the same aliases as [`FromStr`]; encoding always writes
/// the canonical lower-case name.
impl<'de> Deserialize<'de> for DbType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// `null` and `""` both mean "no dialect".
fn dialect_or_none<'de, D>(deserializer: D) -> Result<Option<DbType>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(name) if !name.trim().is_empty() => {
            name.parse().map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub database: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tables: Vec<Table>,
    #[serde(
        default,
        deserialize_with = "dialect_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub db_type: Option<DbType>,
}

impl Schema {
    pub fn new(database: impl Into<String>, db_type: Option<DbType>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
            db_type,
        }
    }

    /// Table lookup: an exact name match wins, otherwise the first
    /// case-insensitive match.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.position(name).map(|i| &self.tables[i])
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.position(name).map(move |i| &mut self.tables[i])
    }

    /// Whether a table of this name is already defined. PostgreSQL keeps
    /// `"Users"` and `users` apart; the other dialects compare without case.
    pub fn defines_table(&self, name: &str) -> bool {
        match self.db_type {
            Some(DbType::PostgreSql) => self.tables.iter().any(|t| t.name == name),
            _ => self.position(name).is_some(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .or_else(|| self.tables.iter().position(|t| t.name.eq_ignore_ascii_case(name)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub columns: Vec<Column>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub primary_key: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Set `is_pk` from the primary-key list and `is_fk` from foreign-key
    /// source columns. Flags already set by other origins are kept.
    pub fn apply_key_flags(&mut self) {
        for column in &mut self.columns {
            if self
                .primary_key
                .iter()
                .any(|pk| pk.eq_ignore_ascii_case(&column.name))
            {
                column.is_pk = true;
            }
            if self
                .foreign_keys
                .iter()
                .any(|fk| fk.column.eq_ignore_ascii_case(&column.name))
            {
                column.is_fk = true;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_pk: bool,
    #[serde(default)]
    pub is_fk: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_auto_incr: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_unique: bool,
    /// BTREE, HASH, FULLTEXT, ...
    #[serde(rename = "type", default)]
    pub index_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

impl ForeignKey {
    /// Name used when the DDL carries no `CONSTRAINT <name>` clause.
    pub fn synthesized_name(column: &str, ref_table: &str) -> String {
        format!("fk_{}_{}", column, ref_table)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub explanation: String,
    pub tips: Vec<String>,
    /// Model round-trip time in milliseconds.
    pub execute_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryValidation {
    pub is_valid: bool,
    /// Performance score, 0-100.
    pub score: u8,
    pub original_query: String,
    pub optimized_query: String,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
    pub index_usage: Vec<String>,
    pub execution_plan: String,
    pub estimated_time: String,
    pub ai_response_time: u64,
}

impl QueryValidation {
    pub const DEFAULT_SCORE: u8 = 50;

    /// Defaults seeded before a model response is scanned: valid, unscored,
    /// optimized query equal to the original.
    pub fn seeded(original_query: &str) -> Self {
        Self {
            is_valid: true,
            score: Self::DEFAULT_SCORE,
            original_query: original_query.to_string(),
            optimized_query: original_query.to_string(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            index_usage: Vec::new(),
            execution_plan: String::new(),
            estimated_time: String::new(),
            ai_response_time: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    pub location: String,
    pub suggestion: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_type_from_str() {
        assert_eq!("postgres".parse::<DbType>(), Ok(DbType::PostgreSql));
        assert_eq!("MySQL".parse::<DbType>(), Ok(DbType::MySql));
        assert_eq!("mssql".parse::<DbType>(), Ok(DbType::SqlServer));
        assert!("sqlite".parse::<DbType>().is_err());
    }

    #[test]
    fn test_detect_dialect() {
        assert_eq!(
            DbType::detect("CREATE TABLE `t` (id INT AUTO_INCREMENT)"),
            Some(DbType::MySql)
        );
        assert_eq!(
            DbType::detect("CREATE TABLE t (id SERIAL PRIMARY KEY)"),
            Some(DbType::PostgreSql)
        );
        assert_eq!(DbType::detect("CREATE TABLE t (id INT)"), None);
    }

    #[test]
    fn test_null_lists_decode_as_empty() {
        let table: Table = serde_json::from_str(
            r#"{"name":"t","columns":null,"primary_key":null,"foreign_keys":null,"indexes":null}"#,
        )
        .unwrap();
        assert!(table.columns.is_empty());
        assert!(table.primary_key.is_empty());
    }

    #[test]
    fn test_apply_key_flags() {
        let mut table = Table::new("orders");
        table.columns.push(Column {
            name: "id".into(),
            data_type: "INT".into(),
            ..Default::default()
        });
        table.columns.push(Column {
            name: "user_id".into(),
            data_type: "INT".into(),
            ..Default::default()
        });
        table.primary_key.push("ID".into());
        table.foreign_keys.push(ForeignKey {
            name: ForeignKey::synthesized_name("user_id", "users"),
            column: "user_id".into(),
            ref_table: "users".into(),
            ref_column: "id".into(),
            ..Default::default()
        });

        table.apply_key_flags();

        assert!(table.columns[0].is_pk);
        assert!(!table.columns[0].is_fk);
        assert!(table.columns[1].is_fk);
        assert_eq!(table.foreign_keys[0].name, "fk_user_id_users");
    }
}
