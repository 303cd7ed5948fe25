use super::{bullet, header_value, is_fence, strip_fences};
use crate::models::{Issue, QueryValidation, Severity};
use crate::prompt::headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Issues,
    Indexes,
    Optimized,
    Plan,
    Suggestions,
}

fn section_of(line: &str) -> Option<Section> {
    [
        (headers::ISSUES, Section::Issues),
        (headers::INDEX_USAGE, Section::Indexes),
        (headers::OPTIMIZED, Section::Optimized),
        (headers::PLAN, Section::Plan),
        (headers::SUGGESTIONS, Section::Suggestions),
    ]
    .into_iter()
    .find_map(|(header, section)| header_value(line, header).map(|_| section))
}

/// Extract an analysis record from a validation reply.
///
/// Validity, score and estimated time are single-line fields picked up
/// wherever they appear and do not change the current section. Anything
/// the reply leaves out keeps the [`QueryValidation::seeded`] default.
pub fn extract_validation(response: &str, original_query: &str) -> QueryValidation {
    let mut validation = QueryValidation::seeded(original_query);
    let mut section = Section::None;
    let mut optimized_lines: Vec<&str> = Vec::new();
    let mut plan_lines: Vec<&str> = Vec::new();

    for line in response.lines() {
        if let Some(value) = header_value(line, headers::VALIDITY) {
            validation.is_valid = parse_validity(value);
            continue;
        }
        if let Some(value) = header_value(line, headers::SCORE) {
            if let Some(score) = parse_score(value) {
                validation.score = score;
            }
            continue;
        }
        if let Some(value) = header_value(line, headers::ESTIMATED_TIME) {
            validation.estimated_time = value.to_string();
            continue;
        }
        if let Some(next) = section_of(line) {
            section = next;
            continue;
        }

        let trimmed = line.trim();
        match section {
            Section::Issues => {
                if let Some(issue) = bullet(trimmed).and_then(parse_issue) {
                    validation.issues.push(issue);
                }
            }
            Section::Indexes => {
                if let Some(entry) = list_entry(trimmed) {
                    validation.index_usage.push(entry);
                }
            }
            Section::Suggestions => {
                if let Some(entry) = list_entry(trimmed) {
                    validation.suggestions.push(entry);
                }
            }
            Section::Optimized => {
                if !trimmed.is_empty() && !is_fence(trimmed) && !is_no_better_query(trimmed) {
                    optimized_lines.push(trimmed);
                }
            }
            Section::Plan => {
                if !trimmed.is_empty() {
                    plan_lines.push(trimmed);
                }
            }
            Section::None => {}
        }
    }

    let optimized = strip_fences(&optimized_lines.join("\n"));
    if !optimized.is_empty() {
        validation.optimized_query = optimized;
    }
    validation.execution_plan = plan_lines.join(" ");
    validation
}

/// `true`/`yes` anywhere, or the Korean "valid" affirmation unless negated.
fn parse_validity(value: &str) -> bool {
    let lower = value.to_lowercase();
    if lower.contains("true") || lower.contains("yes") {
        return true;
    }
    value.contains("유효") && !value.contains("않")
}

/// Leading integer of the value (a trailing `점` or `/100` is ignored).
/// Only 1..=100 is accepted.
fn parse_score(value: &str) -> Option<u8> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let score: u32 = digits.parse().ok()?;
    (1..=100).contains(&score).then_some(score as u8)
}

/// `[severity] message | location: ... | suggestion: ...`
fn parse_issue(text: &str) -> Option<Issue> {
    let mut line = text.to_string();
    let mut severity = Severity::Info;

    let lower = line.to_ascii_lowercase();
    for candidate in [Severity::Error, Severity::Warning, Severity::Info] {
        let tag = format!("[{}]", candidate.as_str());
        if let Some(pos) = lower.find(&tag) {
            severity = candidate;
            line.replace_range(pos..pos + tag.len(), "");
            break;
        }
    }

    let mut parts = line.split('|').map(str::trim);
    let message = parts.next().unwrap_or_default().to_string();
    if message.is_empty() {
        return None;
    }
    let location = parts
        .next()
        .map(|p| strip_label(p, &headers::LOCATION_LABELS))
        .unwrap_or_default();
    let suggestion = parts
        .next()
        .map(|p| strip_label(p, &headers::SUGGESTION_LABELS))
        .unwrap_or_default();

    Some(Issue {
        severity,
        message,
        location,
        suggestion,
    })
}

fn strip_label(field: &str, labels: &[&str]) -> String {
    for label in labels {
        if let Some(head) = field.get(..label.len()) {
            if head.eq_ignore_ascii_case(label) {
                return field[label.len()..].trim().to_string();
            }
        }
    }
    field.to_string()
}

fn list_entry(line: &str) -> Option<String> {
    let entry = bullet(line)?;
    let is_placeholder = headers::NONE_MARKERS
        .iter()
        .any(|marker| entry.trim_end_matches('.').eq_ignore_ascii_case(marker));
    if entry.is_empty() || is_placeholder {
        None
    } else {
        Some(entry.to_string())
    }
}

fn is_no_better_query(line: &str) -> bool {
    let lower = line.to_lowercase();
    headers::NO_BETTER_QUERY
        .iter()
        .any(|phrase| lower.contains(&phrase.to_lowercase()))
}
