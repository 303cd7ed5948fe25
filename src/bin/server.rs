//! HTTP API for sql-genius.
//! Minimal HTTP/1.1 handling on a tokio listener; every request carries the
//! schema it works on, so the server keeps no per-client state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sql_genius::assistant::{QueryAssistant, QueryRequest};
use sql_genius::config::{AiConfig, DbConfig};
use sql_genius::introspect::{catalog_for, connect_source, extract_schema};
use sql_genius::llm::provider_from_config;
use sql_genius::models::{DbType, Schema};
use sql_genius::schema;
use sql_genius::{GeniusError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

struct AppState {
    ai: AiConfig,
    assistant: Option<QueryAssistant>,
    started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ParseRequest {
    ddl: String,
    #[serde(default)]
    db_type: Option<DbType>,
}

#[derive(Deserialize)]
struct ExportRequest {
    schema: Schema,
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Json,
    Ddl,
}

#[derive(Deserialize)]
struct QueryWithSchema {
    query: String,
    #[serde(default = "empty_schema")]
    schema: Schema,
}

#[derive(Deserialize)]
struct ExplainRequest {
    query: String,
}

fn empty_schema() -> Schema {
    Schema::new("", None)
}

struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ai = AiConfig::from_env()?;
    let assistant = match provider_from_config(&ai) {
        Ok(provider) => Some(QueryAssistant::new(provider)),
        Err(e) => {
            warn!("AI features disabled: {}", e);
            None
        }
    };
    let state = Arc::new(AppState {
        ai,
        assistant,
        started_at: Utc::now(),
    });

    let addr = std::env::var("SQL_GENIUS_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("sql-genius API listening on http://{}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Connection from {}", peer);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let response = match read_request(&mut stream).await {
        Ok(Some(request)) => {
            info!("{} {}", request.method, request.path);
            route(&request, &state).await
        }
        Ok(None) => return,
        Err(e) => error_response(&e),
    };

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

/// Read the request head, then exactly `Content-Length` bytes of body.
async fn read_request(stream: &mut TcpStream) -> Result<Option<HttpRequest>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buffer.len() > MAX_BODY_BYTES {
            return Err(GeniusError::Request("request head too large".to_string()));
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(GeniusError::Request("malformed request line".to_string()));
    };

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(GeniusError::Request("request body too large".to_string()));
    }

    let mut body = buffer[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    let path = target.split('?').next().unwrap_or_default().trim_end_matches('/');
    Ok(Some(HttpRequest {
        method: method.to_string(),
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        body,
    }))
}

async fn route(request: &HttpRequest, state: &AppState) -> String {
    let result = match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => return create_response(204, "No Content", ""),
        ("GET", "/api/status") => status(state).await,
        ("POST", "/api/schema/parse") => handle_parse(&request.body),
        ("POST", "/api/schema/export") => handle_export(&request.body),
        ("POST", "/api/schema/extract") => handle_extract(&request.body).await,
        ("POST", "/api/generate") => handle_generate(&request.body, state).await,
        ("POST", "/api/optimize") => handle_optimize(&request.body, state).await,
        ("POST", "/api/explain") => handle_explain(&request.body, state).await,
        ("POST", "/api/validate") => handle_validate(&request.body, state).await,
        _ => {
            let message = format!("no route for {} {}", request.method, request.path);
            let body = envelope::<()>(None, Some(message));
            return create_response(404, "Not Found", &body);
        }
    };

    match result {
        Ok(data) => create_response(200, "OK", &envelope(Some(data), None)),
        Err(e) => error_response(&e),
    }
}

fn envelope<T: Serialize>(data: Option<T>, error: Option<String>) -> String {
    let response = ApiResponse {
        success: error.is_none(),
        data,
        error,
    };
    serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.to_string())
}

fn error_response(e: &GeniusError) -> String {
    let (status, text) = match e {
        GeniusError::Request(_) | GeniusError::Schema(_) | GeniusError::Json(_) => {
            (400, "Bad Request")
        }
        GeniusError::Config(_) => (503, "Service Unavailable"),
        GeniusError::Llm(_) | GeniusError::Database(_) => (502, "Bad Gateway"),
        GeniusError::Io(_) => (500, "Internal Server Error"),
    };
    warn!("Request failed: {}", e);
    create_response(status, text, &envelope::<()>(None, Some(e.to_string())))
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| GeniusError::Request(format!("invalid JSON body: {}", e)))
}

fn assistant(state: &AppState) -> Result<&QueryAssistant> {
    state
        .assistant
        .as_ref()
        .ok_or_else(|| GeniusError::Config("no AI provider configured".to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

async fn status(state: &AppState) -> Result<serde_json::Value> {
    let available = match &state.assistant {
        Some(assistant) => assistant.provider().is_available().await,
        None => false,
    };
    Ok(serde_json::json!({
        "provider": state.ai.provider,
        "model": state.ai.model(),
        "available": available,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

fn handle_parse(body: &[u8]) -> Result<serde_json::Value> {
    let request: ParseRequest = decode(body)?;
    let dialect = request.db_type.or_else(|| DbType::detect(&request.ddl));
    to_value(&schema::parse_ddl(&request.ddl, dialect))
}

fn handle_export(body: &[u8]) -> Result<serde_json::Value> {
    let request: ExportRequest = decode(body)?;
    let content = match request.format {
        ExportFormat::Json => schema::to_json(&request.schema)?,
        ExportFormat::Ddl => schema::generate_ddl(&request.schema),
    };
    Ok(serde_json::json!({ "content": content }))
}

async fn handle_extract(body: &[u8]) -> Result<serde_json::Value> {
    let config: DbConfig = decode(body)?;
    let source = connect_source(&config).await?;
    let catalog = catalog_for(config.db_type, &config.database);
    let extracted = extract_schema(source.as_ref(), catalog.as_ref(), &config.database).await?;
    to_value(&extracted)
}

async fn handle_generate(body: &[u8], state: &AppState) -> Result<serde_json::Value> {
    let request: QueryRequest = decode(body)?;
    to_value(&assistant(state)?.generate(&request).await?)
}

async fn handle_optimize(body: &[u8], state: &AppState) -> Result<serde_json::Value> {
    let request: QueryWithSchema = decode(body)?;
    to_value(&assistant(state)?.optimize(&request.query, &request.schema).await?)
}

async fn handle_explain(body: &[u8], state: &AppState) -> Result<serde_json::Value> {
    let request: ExplainRequest = decode(body)?;
    let explanation = assistant(state)?.explain(&request.query).await?;
    Ok(serde_json::json!({ "explanation": explanation }))
}

async fn handle_validate(body: &[u8], state: &AppState) -> Result<serde_json::Value> {
    let request: QueryWithSchema = decode(body)?;
    to_value(&assistant(state)?.validate(&request.query, &request.schema).await?)
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json; charset=utf-8\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
