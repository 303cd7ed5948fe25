//! Schema loading: DDL text, JSON documents and DDL regeneration.

mod ddl;
mod generate;
mod scanner;

pub use ddl::parse_ddl;
pub use generate::generate_ddl;

use crate::error::{GeniusError, Result};
use crate::models::{DbType, Schema};
use std::path::Path;
use tracing::info;

/// Decode a JSON schema document.
pub fn parse_json(data: &[u8]) -> Result<Schema> {
    serde_json::from_slice(data)
        .map_err(|e| GeniusError::Schema(format!("Invalid schema document: {}", e)))
}

/// Encode a schema as pretty-printed JSON.
pub fn to_json(schema: &Schema) -> Result<String> {
    Ok(serde_json::to_string_pretty(schema)?)
}

/// Load a schema file. `.json` files are decoded as schema documents,
/// anything else is parsed as DDL. A missing dialect on a DDL file is
/// guessed from its contents.
pub fn load_schema_file(path: &Path, db_type: Option<DbType>) -> Result<Schema> {
    let data = std::fs::read(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let mut schema = if is_json {
        let mut schema = parse_json(&data)?;
        if db_type.is_some() {
            schema.db_type = db_type;
        }
        schema
    } else {
        let text = String::from_utf8_lossy(&data);
        parse_ddl(&text, db_type.or_else(|| DbType::detect(&text)))
    };

    if schema.database.is_empty() {
        schema.database = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
    }
    info!("Loaded schema {} from {}", schema.database, path.display());
    Ok(schema)
}
