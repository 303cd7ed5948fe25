//! sqlx-backed metadata sources for PostgreSQL and MySQL.

use super::{MetaQuery, MetaRow, MetadataSource};
use crate::config::DbConfig;
use crate::error::{GeniusError, Result};
use crate::models::DbType;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use std::time::Duration;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

/// Open a metadata source for `config`. Only PostgreSQL and MySQL ship with
/// a driver; other dialects need a caller-provided [`MetadataSource`].
pub async fn connect_source(config: &DbConfig) -> Result<Box<dyn MetadataSource>> {
    match config.db_type {
        DbType::PostgreSql => Ok(Box::new(PgSource::connect(config).await?)),
        DbType::MySql => Ok(Box::new(MySqlSource::connect(config).await?)),
        other => Err(GeniusError::Database(format!(
            "no bundled driver for {}; supply a MetadataSource",
            other
        ))),
    }
}

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| GeniusError::Database(format!("PostgreSQL connection failed: {}", e)))?;

        info!("Connected to PostgreSQL {}:{}/{}", config.host, config.port(), config.database);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataSource for PgSource {
    async fn fetch(&self, query: &MetaQuery) -> Result<Vec<MetaRow>> {
        debug!("PostgreSQL metadata query with {} params", query.params.len());
        let mut q = sqlx::query(&query.sql);
        for param in &query.params {
            q = q.bind(param.as_str());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeniusError::Database(format!("Metadata query failed: {}", e)))?;
        Ok(rows.iter().map(pg_row).collect())
    }
}

fn pg_row(row: &PgRow) -> MetaRow {
    row.columns()
        .iter()
        .map(|col| {
            let i = col.ordinal();
            let value = if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else {
                Value::Null
            };
            (col.name().to_lowercase(), value)
        })
        .collect()
}

pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| GeniusError::Database(format!("MySQL connection failed: {}", e)))?;

        info!("Connected to MySQL {}:{}/{}", config.host, config.port(), config.database);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataSource for MySqlSource {
    async fn fetch(&self, query: &MetaQuery) -> Result<Vec<MetaRow>> {
        debug!("MySQL metadata query with {} params", query.params.len());
        let mut q = sqlx::query(&query.sql);
        for param in &query.params {
            q = q.bind(param.as_str());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GeniusError::Database(format!("Metadata query failed: {}", e)))?;
        Ok(rows.iter().map(mysql_row).collect())
    }
}

fn mysql_row(row: &MySqlRow) -> MetaRow {
    row.columns()
        .iter()
        .map(|col| {
            let i = col.ordinal();
            let value = if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
                v.map_or(Value::Null, Value::from)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
                // information_schema reports some text columns as binary
                v.map_or(Value::Null, |bytes| {
                    Value::from(String::from_utf8_lossy(&bytes).into_owned())
                })
            } else {
                Value::Null
            };
            (col.name().to_lowercase(), value)
        })
        .collect()
}
