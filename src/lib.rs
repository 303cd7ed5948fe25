pub mod assistant;
pub mod config;
pub mod error;
pub mod extract;
pub mod introspect;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod schema;

pub use error::{GeniusError, Result};
pub use models::{
    Column, DbType, ForeignKey, Index, Issue, QueryResponse, QueryValidation, Schema, Severity,
    Table,
};
