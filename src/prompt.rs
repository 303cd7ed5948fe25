//! Outbound prompts for the language model.
//!
//! The section headers in [`headers`] are written into every prompt and
//! read back by the extractors in [`crate::extract`]; both sides must use
//! the same strings.

use crate::models::Schema;
use std::fmt::Write;

pub mod headers {
    pub const SQL: &str = "SQL:";
    pub const EXPLANATION: &str = "설명:";
    pub const TIPS: &str = "최적화 팁:";

    pub const VALIDITY: &str = "유효성:";
    pub const SCORE: &str = "점수:";
    pub const ISSUES: &str = "문제점:";
    pub const INDEX_USAGE: &str = "인덱스 활용:";
    pub const OPTIMIZED: &str = "최적화된 쿼리:";
    pub const PLAN: &str = "실행 계획:";
    pub const ESTIMATED_TIME: &str = "예상 시간:";
    pub const SUGGESTIONS: &str = "개선 제안:";

    /// Issue field labels, English first as emitted in prompts.
    pub const LOCATION_LABELS: [&str; 2] = ["location:", "위치:"];
    pub const SUGGESTION_LABELS: [&str; 2] = ["suggestion:", "해결:"];

    /// List placeholders meaning "nothing to report".
    pub const NONE_MARKERS: [&str; 2] = ["none", "없음"];

    /// Phrases the model uses when it has no better query than the original.
    pub const NO_BETTER_QUERY: [&str; 2] = ["원본 쿼리가 최적", "original query is optimal"];
}

/// Render a schema as the compact table listing embedded in prompts.
pub fn format_schema(schema: &Schema) -> String {
    let mut out = String::new();

    for table in &schema.tables {
        let _ = writeln!(out, "테이블: {}", table.name);
        out.push_str("컬럼:\n");
        for column in &table.columns {
            let mut flags = String::new();
            if column.is_pk {
                flags.push_str(" [PK]");
            }
            if column.is_fk {
                flags.push_str(" [FK]");
            }
            if column.is_unique {
                flags.push_str(" [UNIQUE]");
            }
            let _ = writeln!(out, "  - {} {}{}", column.name, column.data_type, flags);
        }

        if !table.indexes.is_empty() {
            out.push_str("인덱스:\n");
            for index in &table.indexes {
                let _ = writeln!(out, "  - {} ({})", index.name, index.columns.join(", "));
            }
        }

        if !table.foreign_keys.is_empty() {
            out.push_str("외래키:\n");
            for fk in &table.foreign_keys {
                let _ = writeln!(out, "  - {} -> {}.{}", fk.column, fk.ref_table, fk.ref_column);
            }
        }
        out.push('\n');
    }

    out
}

fn dialect_name(schema: &Schema) -> &'static str {
    schema.db_type.map_or("SQL", |t| t.as_str())
}

fn generation_format(sql_hint: &str, explain_hint: &str) -> String {
    format!(
        "## 응답 형식:\n{}\n({})\n\n{}\n({})\n\n{}\n- (팁1)\n- (팁2)\n",
        headers::SQL,
        sql_hint,
        headers::EXPLANATION,
        explain_hint,
        headers::TIPS
    )
}

pub fn build_query_prompt(
    request: &str,
    query_type: &str,
    schema: &Schema,
    optimize: bool,
) -> String {
    let dialect = dialect_name(schema);
    let requirements = if optimize {
        format!(
            "1. 인덱스를 최대한 활용하세요\n2. 불필요한 서브쿼리를 피하세요\n3. 적절한 JOIN을 사용하세요\n4. {} 문법에 맞게 작성하세요",
            dialect
        )
    } else {
        format!("1. {} 문법에 맞게 작성하세요", dialect)
    };
    format!(
        "당신은 SQL 전문가입니다. 주어진 데이터베이스 스키마를 분석하고, 사용자 요청에 맞는 최적화된 SQL 쿼리를 생성해주세요.

## 데이터베이스 타입: {dialect}

## 스키마 정보:
{schema}
## 사용자 요청:
{request}

## 쿼리 타입: {query_type}

## 요구사항:
{requirements}

{format}",
        dialect = dialect,
        schema = format_schema(schema),
        request = request,
        query_type = query_type,
        requirements = requirements,
        format = generation_format("쿼리", "간단한 설명"),
    )
}

pub fn build_optimize_prompt(query: &str, schema: &Schema) -> String {
    format!(
        "당신은 SQL 최적화 전문가입니다. 다음 쿼리를 분석하고 더 빠르게 실행될 수 있도록 최적화해주세요.

## 원본 쿼리:
{query}

## 스키마 정보:
{schema}
{format}",
        query = query,
        schema = format_schema(schema),
        format = generation_format("최적화된 쿼리", "변경 사항 설명"),
    )
}

pub fn build_explain_prompt(query: &str) -> String {
    format!(
        "다음 SQL 쿼리를 한국어로 설명해주세요:\n\n{}\n\n{}",
        query,
        headers::EXPLANATION
    )
}

pub fn build_validate_prompt(query: &str, schema: &Schema) -> String {
    let issue_line = |severity: &str| {
        format!(
            "- [{}] (문제 설명) | {} (위치) | {} (해결방안)\n",
            severity,
            headers::LOCATION_LABELS[0],
            headers::SUGGESTION_LABELS[0]
        )
    };

    format!(
        "당신은 SQL 성능 분석 전문가입니다. 다음 쿼리를 분석하고 성능을 평가해주세요.

## 분석할 쿼리:
{query}

## 데이터베이스 스키마:
{schema}
## 다음 항목들을 분석해주세요:
1. 쿼리 문법이 올바른지 (유효성)
2. 성능 점수 (0-100점)
3. 발견된 문제점 (type: error/warning/info)
4. 인덱스 활용 여부
5. 더 최적화된 쿼리가 있다면 제안
6. 예상 실행 계획

## 응답 형식 (반드시 이 형식을 따라주세요):
{validity} (true 또는 false)
{score} (0-100 숫자만)

{issues}
{error}{warning}{info}
{index_usage}
- (사용 가능한 인덱스1)
- (사용 가능한 인덱스2)

{optimized}
(더 나은 쿼리가 있으면 작성, 없으면 \"{no_better}입니다\")

{plan}
(예상 실행 계획 설명)

{estimated} (빠름/보통/느림)

{suggestions}
- (제안1)
- (제안2)
",
        query = query,
        schema = format_schema(schema),
        validity = headers::VALIDITY,
        score = headers::SCORE,
        issues = headers::ISSUES,
        error = issue_line("error"),
        warning = issue_line("warning"),
        info = issue_line("info"),
        index_usage = headers::INDEX_USAGE,
        optimized = headers::OPTIMIZED,
        no_better = headers::NO_BETTER_QUERY[0],
        plan = headers::PLAN,
        estimated = headers::ESTIMATED_TIME,
        suggestions = headers::SUGGESTIONS,
    )
}
