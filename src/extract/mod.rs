//! Turn free-form model replies into [`QueryResponse`] and
//! [`QueryValidation`] records.
//!
//! Both extractors are line classifiers: a line starting with one of the
//! section headers from [`crate::prompt::headers`] switches the current
//! section, and the lines that follow are read according to that section.
//! Neither extractor fails; text that matches nothing leaves the seeded
//! defaults in place.
//!
//! [`QueryResponse`]: crate::models::QueryResponse
//! [`QueryValidation`]: crate::models::QueryValidation

mod generation;
mod validation;

pub use generation::extract_generation;
pub use validation::extract_validation;

/// If `line` starts with `header` (ignoring indentation and markdown `#`/`*`
/// decoration), return the rest of the line, trimmed.
fn header_value<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    line.trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace())
        .strip_prefix(header)
        .map(|rest| rest.trim_matches(|c: char| c == '*' || c.is_whitespace()))
}

/// Body of a `-` / `•` bullet line, trimmed.
fn bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('•'))
        .map(str::trim)
}

fn is_fence(line: &str) -> bool {
    line.trim().starts_with("```")
}

/// Remove a leading ```` ```sql ````/```` ``` ```` and a trailing ```` ``` ````.
fn strip_fences(text: &str) -> String {
    let text = text.trim();
    let text = text
        .strip_prefix("```sql")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_ignores_markdown() {
        assert_eq!(header_value("## SQL:", "SQL:"), Some(""));
        assert_eq!(header_value("**점수:** 85", "점수:"), Some("85"));
        assert_eq!(header_value("  유효성: true", "유효성:"), Some("true"));
        assert_eq!(header_value("SELECT SQL:", "SQL:"), None);
    }

    #[test]
    fn test_bullet() {
        assert_eq!(bullet("  - use index "), Some("use index"));
        assert_eq!(bullet("• avoid scan"), Some("avoid scan"));
        assert_eq!(bullet("plain"), None);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_fences("SELECT 1"), "SELECT 1");
    }
}
