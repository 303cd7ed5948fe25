use async_trait::async_trait;
use sql_genius::assistant::{QueryAssistant, QueryRequest, QueryType};
use sql_genius::llm::LlmProvider;
use sql_genius::models::{DbType, Schema, Severity};
use sql_genius::schema::parse_ddl;
use sql_genius::{GeniusError, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replies with a fixed text after a short delay and keeps the prompts it got.
struct ScriptedProvider {
    reply: std::result::Result<String, String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: Duration::from_millis(15),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        tokio::time::sleep(self.delay).await;
        self.reply.clone().map_err(GeniusError::Llm)
    }
}

fn shop_schema() -> Schema {
    parse_ddl(
        "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255) UNIQUE);
         CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users (id));",
        Some(DbType::MySql),
    )
}

#[tokio::test]
async fn test_generate_fills_elapsed_time_and_prompt() {
    let provider = ScriptedProvider::replying(
        "SQL:\nSELECT * FROM users\n\n설명:\nall users\n\n최적화 팁:\n- add LIMIT",
    );
    let assistant = QueryAssistant::new(provider.clone());

    let request = QueryRequest {
        prompt: "모든 사용자".to_string(),
        schema: shop_schema(),
        query_type: QueryType::Select,
        optimize: true,
    };
    let response = assistant.generate(&request).await.unwrap();

    assert_eq!(response.query, "SELECT * FROM users");
    assert_eq!(response.tips, vec!["add LIMIT"]);
    assert!(response.execute_time >= 15);

    let prompt = provider.last_prompt();
    assert!(prompt.contains("모든 사용자"));
    assert!(prompt.contains("## 쿼리 타입: SELECT"));
    assert!(prompt.contains("테이블: orders"));
    assert!(prompt.contains("user_id -> users.id"));
}

#[tokio::test]
async fn test_each_call_uses_its_own_schema() {
    let provider = ScriptedProvider::replying("SQL:\nSELECT 1");
    let assistant = QueryAssistant::new(provider.clone());

    assistant.optimize("SELECT 1", &shop_schema()).await.unwrap();
    assert!(provider.last_prompt().contains("테이블: users"));

    let empty = Schema::new("scratch", None);
    assistant.optimize("SELECT 1", &empty).await.unwrap();
    assert!(!provider.last_prompt().contains("테이블: users"));
}

#[tokio::test]
async fn test_validate_reads_reply_and_timing() {
    let provider = ScriptedProvider::replying(
        "유효성: true\n점수: 80\n\n문제점:\n- [warning] no LIMIT | location: SELECT | suggestion: add LIMIT",
    );
    let assistant = QueryAssistant::new(provider);

    let validation = assistant
        .validate("SELECT * FROM users", &shop_schema())
        .await
        .unwrap();

    assert_eq!(validation.score, 80);
    assert_eq!(validation.optimized_query, "SELECT * FROM users");
    assert_eq!(validation.issues[0].severity, Severity::Warning);
    assert!(validation.ai_response_time >= 15);
}

#[tokio::test]
async fn test_explain_returns_trimmed_reply() {
    let provider = ScriptedProvider::replying("\n  사용자 목록을 조회합니다.  \n");
    let assistant = QueryAssistant::new(provider);
    let text = assistant.explain("SELECT * FROM users").await.unwrap();
    assert_eq!(text, "사용자 목록을 조회합니다.");
}

#[tokio::test]
async fn test_empty_input_is_rejected_before_the_model() {
    let provider = ScriptedProvider::replying("SQL:\nSELECT 1");
    let assistant = QueryAssistant::new(provider.clone());

    assert!(matches!(
        assistant.validate("   ", &shop_schema()).await,
        Err(GeniusError::Request(_))
    ));
    let request = QueryRequest {
        prompt: String::new(),
        schema: shop_schema(),
        query_type: QueryType::Delete,
        optimize: false,
    };
    assert!(matches!(assistant.generate(&request).await, Err(GeniusError::Request(_))));
    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_errors_propagate() {
    let assistant = QueryAssistant::new(ScriptedProvider::failing("model unavailable"));
    let err = assistant.explain("SELECT 1").await.unwrap_err();
    assert!(matches!(err, GeniusError::Llm(ref msg) if msg == "model unavailable"));
}
