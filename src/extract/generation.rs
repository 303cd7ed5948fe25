use super::{bullet, header_value, is_fence, strip_fences};
use crate::models::QueryResponse;
use crate::prompt::headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Sql,
    Explain,
    Tips,
}

fn section_of(line: &str) -> Option<Section> {
    [
        (headers::SQL, Section::Sql),
        (headers::EXPLANATION, Section::Explain),
        (headers::TIPS, Section::Tips),
    ]
    .into_iter()
    .find_map(|(header, section)| header_value(line, header).map(|_| section))
}

/// Extract query, explanation and tips from a generation or optimization
/// reply. `execute_time` is left at zero for the caller to fill in.
pub fn extract_generation(response: &str) -> QueryResponse {
    let mut section = Section::None;
    let mut query_lines: Vec<&str> = Vec::new();
    let mut explain_lines: Vec<&str> = Vec::new();
    let mut tips: Vec<String> = Vec::new();

    for line in response.lines() {
        if let Some(next) = section_of(line) {
            section = next;
            continue;
        }

        let trimmed = line.trim();
        match section {
            Section::Sql => {
                if !trimmed.is_empty() && !is_fence(trimmed) {
                    query_lines.push(line);
                }
            }
            Section::Explain => {
                if !trimmed.is_empty() {
                    explain_lines.push(trimmed);
                }
            }
            Section::Tips => {
                if let Some(tip) = bullet(trimmed).filter(|t| !t.is_empty()) {
                    tips.push(tip.to_string());
                }
            }
            Section::None => {}
        }
    }

    QueryResponse {
        query: strip_fences(&query_lines.join("\n")),
        explanation: explain_lines.join(" "),
        tips,
        execute_time: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic_sections() {
        let response = "SQL:\nSELECT 1\n\n설명:\nok\n\n최적화 팁:\n- use index\n- avoid scan";

        let parsed = extract_generation(response);

        assert_eq!(parsed.query, "SELECT 1");
        assert_eq!(parsed.explanation, "ok");
        assert_eq!(parsed.tips, vec!["use index", "avoid scan"]);
    }

    #[test]
    fn test_sql_lines_keep_indentation_and_drop_fences() {
        let response = "SQL:\n```sql\nSELECT id\n  FROM users\n```\n설명:\nfirst\n  second\n";

        let parsed = extract_generation(response);

        assert_eq!(parsed.query, "SELECT id\n  FROM users");
        assert_eq!(parsed.explanation, "first second");
    }

    #[test]
    fn test_non_bulleted_tips_are_ignored() {
        let parsed = extract_generation("최적화 팁:\nintro text\n• keep it\n-\n");
        assert_eq!(parsed.tips, vec!["keep it"]);
    }

    #[test]
    fn test_unrecognized_reply_yields_empty_record() {
        let parsed = extract_generation("I cannot help with that.");
        assert!(parsed.query.is_empty());
        assert!(parsed.explanation.is_empty());
        assert!(parsed.tips.is_empty());
    }

    #[test]
    fn test_markdown_headers() {
        let parsed = extract_generation("### SQL:\nSELECT 2;\n**설명:**\ntwo");
        assert_eq!(parsed.query, "SELECT 2;");
        assert_eq!(parsed.explanation, "two");
    }
}
