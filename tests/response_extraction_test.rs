use sql_genius::extract::{extract_generation, extract_validation};
use sql_genius::models::{QueryValidation, Severity};

#[test]
fn test_generation_sections() {
    let reply = "SQL:\nSELECT 1\n\n설명:\nok\n\n최적화 팁:\n- use index\n- avoid scan";
    let parsed = extract_generation(reply);

    assert_eq!(parsed.query, "SELECT 1");
    assert_eq!(parsed.explanation, "ok");
    assert_eq!(parsed.tips, vec!["use index", "avoid scan"]);
    assert_eq!(parsed.execute_time, 0);
}

#[test]
fn test_generation_keeps_multiline_sql_and_strips_fences() {
    let reply = "Here you go.

**SQL:**
```sql
SELECT u.id,
       u.email
  FROM users u
 WHERE u.active = 1
```

설명:
Active users
with their email.

최적화 팁:
• uses idx_active
not a bullet, ignored
- keep the projection narrow
";
    let parsed = extract_generation(reply);

    assert_eq!(
        parsed.query,
        "SELECT u.id,\n       u.email\n  FROM users u\n WHERE u.active = 1"
    );
    assert_eq!(parsed.explanation, "Active users with their email.");
    assert_eq!(parsed.tips, vec!["uses idx_active", "keep the projection narrow"]);
}

#[test]
fn test_generation_without_headers_is_empty() {
    let parsed = extract_generation("I cannot help with that.");
    assert!(parsed.query.is_empty());
    assert!(parsed.explanation.is_empty());
    assert!(parsed.tips.is_empty());
}

#[test]
fn test_validation_without_score_keeps_defaults() {
    let original = "SELECT * FROM users";
    let parsed = extract_validation("문제점:\n- 없음\n\n실행 계획:\nfull scan", original);

    assert_eq!(parsed.score, QueryValidation::DEFAULT_SCORE);
    assert!(parsed.is_valid);
    assert!(parsed.issues.is_empty());
    assert_eq!(parsed.optimized_query, original);
    assert_eq!(parsed.execution_plan, "full scan");
}

#[test]
fn test_validation_issue_fields() {
    let reply = "문제점:\n- [warning] missing index | location: users.email | suggestion: add index";
    let parsed = extract_validation(reply, "SELECT 1");

    assert_eq!(parsed.issues.len(), 1);
    let issue = &parsed.issues[0];
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.message, "missing index");
    assert_eq!(issue.location, "users.email");
    assert_eq!(issue.suggestion, "add index");
}

#[test]
fn test_validation_full_reply() {
    let original = "SELECT * FROM orders WHERE YEAR(created_at) = 2024";
    let reply = "유효성: true
점수: 35점

문제점:
- [error] function on indexed column | location: WHERE | suggestion: use a range
- [info] selects every column
- | location: nowhere

인덱스 활용:
- none

최적화된 쿼리:
```sql
SELECT id, total FROM orders
WHERE created_at >= '2024-01-01' AND created_at < '2025-01-01'
```

실행 계획:
Full table scan on orders.
Filter evaluated per row.

예상 시간: 느림

개선 제안:
- add an index on created_at
- list the needed columns
";
    let parsed = extract_validation(reply, original);

    assert!(parsed.is_valid);
    assert_eq!(parsed.score, 35);
    assert_eq!(parsed.original_query, original);

    assert_eq!(parsed.issues.len(), 2);
    assert_eq!(parsed.issues[0].severity, Severity::Error);
    assert_eq!(parsed.issues[0].suggestion, "use a range");
    assert_eq!(parsed.issues[1].severity, Severity::Info);
    assert_eq!(parsed.issues[1].message, "selects every column");
    assert!(parsed.issues[1].location.is_empty());

    assert!(parsed.index_usage.is_empty());
    assert_eq!(
        parsed.optimized_query,
        "SELECT id, total FROM orders\nWHERE created_at >= '2024-01-01' AND created_at < '2025-01-01'"
    );
    assert_eq!(
        parsed.execution_plan,
        "Full table scan on orders. Filter evaluated per row."
    );
    assert_eq!(parsed.estimated_time, "느림");
    assert_eq!(
        parsed.suggestions,
        vec!["add an index on created_at", "list the needed columns"]
    );
}

#[test]
fn test_validation_score_out_of_range_is_ignored() {
    for score in ["0", "150", "high", ""] {
        let parsed = extract_validation(&format!("점수: {}", score), "SELECT 1");
        assert_eq!(parsed.score, QueryValidation::DEFAULT_SCORE, "score {:?}", score);
    }
    assert_eq!(extract_validation("점수: 100", "SELECT 1").score, 100);
}

#[test]
fn test_validation_validity_tokens() {
    assert!(!extract_validation("유효성: false", "q").is_valid);
    assert!(extract_validation("유효성: 유효함", "q").is_valid);
    assert!(!extract_validation("유효성: 유효하지 않음", "q").is_valid);
    assert!(extract_validation("유효성: TRUE", "q").is_valid);
}

#[test]
fn test_no_better_query_keeps_original() {
    let parsed = extract_validation(
        "최적화된 쿼리:\n원본 쿼리가 최적입니다\n\n실행 계획:\nindex lookup",
        "SELECT id FROM users WHERE id = 1",
    );
    assert_eq!(parsed.optimized_query, "SELECT id FROM users WHERE id = 1");
    assert_eq!(parsed.execution_plan, "index lookup");
}
