//! Schema-aware query operations on top of an [`LlmProvider`].
//!
//! The assistant holds no schema of its own: each call receives the schema
//! it should reason about, so concurrent sessions never share one.

use crate::error::{GeniusError, Result};
use crate::extract::{extract_generation, extract_validation};
use crate::llm::LlmProvider;
use crate::models::{QueryResponse, QueryValidation, Schema};
use crate::prompt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    #[default]
    #[serde(alias = "select")]
    Select,
    #[serde(alias = "insert")]
    Insert,
    #[serde(alias = "update")]
    Update,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "alter")]
    Alter,
    #[serde(alias = "create")]
    Create,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Update => "UPDATE",
            QueryType::Delete => "DELETE",
            QueryType::Alter => "ALTER",
            QueryType::Create => "CREATE",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = GeniusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(QueryType::Select),
            "INSERT" => Ok(QueryType::Insert),
            "UPDATE" => Ok(QueryType::Update),
            "DELETE" => Ok(QueryType::Delete),
            "ALTER" => Ok(QueryType::Alter),
            "CREATE" => Ok(QueryType::Create),
            other => Err(GeniusError::Request(format!("unknown query type: {}", other))),
        }
    }
}

/// A natural-language request together with the schema it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    pub schema: Schema,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

fn default_optimize() -> bool {
    true
}

pub struct QueryAssistant {
    provider: Arc<dyn LlmProvider>,
}

impl QueryAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Generate SQL for a natural-language request.
    pub async fn generate(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.prompt.trim().is_empty() {
            return Err(GeniusError::Request("prompt is empty".to_string()));
        }
        let prompt = prompt::build_query_prompt(
            &request.prompt,
            request.query_type.as_str(),
            &request.schema,
            request.optimize,
        );
        let (reply, elapsed) = self.timed_complete(&prompt).await?;

        let mut response = extract_generation(&reply);
        response.execute_time = elapsed;
        info!(
            "Generated {} query in {} ms ({} tips)",
            request.query_type,
            elapsed,
            response.tips.len()
        );
        Ok(response)
    }

    /// Ask for a faster equivalent of `query`.
    pub async fn optimize(&self, query: &str, schema: &Schema) -> Result<QueryResponse> {
        require_query(query)?;
        let (reply, elapsed) = self
            .timed_complete(&prompt::build_optimize_prompt(query, schema))
            .await?;

        let mut response = extract_generation(&reply);
        response.execute_time = elapsed;
        info!("Optimized query in {} ms", elapsed);
        Ok(response)
    }

    /// Plain-language explanation of `query`, returned as the model wrote it.
    pub async fn explain(&self, query: &str) -> Result<String> {
        require_query(query)?;
        let (reply, elapsed) = self
            .timed_complete(&prompt::build_explain_prompt(query))
            .await?;
        info!("Explained query in {} ms", elapsed);
        Ok(reply.trim().to_string())
    }

    /// Score and review `query` against `schema`.
    pub async fn validate(&self, query: &str, schema: &Schema) -> Result<QueryValidation> {
        require_query(query)?;
        let (reply, elapsed) = self
            .timed_complete(&prompt::build_validate_prompt(query, schema))
            .await?;

        let mut validation = extract_validation(&reply, query);
        validation.ai_response_time = elapsed;
        info!(
            "Validated query in {} ms: valid={}, score={}, {} issues",
            elapsed,
            validation.is_valid,
            validation.score,
            validation.issues.len()
        );
        Ok(validation)
    }

    async fn timed_complete(&self, prompt: &str) -> Result<(String, u64)> {
        let start = Instant::now();
        let reply = self.provider.complete(prompt).await?;
        Ok((reply, start.elapsed().as_millis() as u64))
    }
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(GeniusError::Request("query is empty".to_string()));
    }
    Ok(())
}
