//! Quote- and paren-aware text scanning used by the DDL parser.
//!
//! All helpers understand the four identifier/literal quoting styles seen
//! in DDL dumps: `'literal'`, `"ident"`, `` `ident` `` and `[ident]`.
//! Parentheses inside any of them never change the nesting depth.

/// Closing character for an opening quote, if `c` opens one.
fn closing_quote(c: char) -> Option<char> {
    match c {
        '\'' => Some('\''),
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Visit every character outside quotes together with the paren depth after
/// that character. Stops early when `visit` returns `false`.
fn walk<F>(text: &str, mut visit: F)
where
    F: FnMut(usize, char, usize) -> bool,
{
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(close) = quote {
            if c == close {
                // '' and "" stay inside the literal
                if close != ']' && chars.peek().map(|&(_, n)| n) == Some(close) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        if let Some(close) = closing_quote(c) {
            quote = Some(close);
            continue;
        }

        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if !visit(i, c, depth) {
            return;
        }
    }
}

/// Byte offset of the `)` matching the `(` that `text` starts with.
pub fn find_closing_paren(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }
    let mut found = None;
    walk(text, |i, c, depth| {
        if c == ')' && depth == 0 {
            found = Some(i);
            return false;
        }
        true
    });
    found
}

/// Split on commas that sit at paren depth zero and outside quotes.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    walk(text, |i, c, depth| {
        if c == ',' && depth == 0 {
            parts.push(&text[start..i]);
            start = i + 1;
        }
        true
    });
    parts.push(&text[start..]);
    parts
}

/// Remove `-- line`, `# line` (only at line start, so `#temp` tables survive)
/// and `/* block */` comments, keeping string literals and quoted
/// identifiers intact.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(close) = quote {
            out.push(c);
            if c == close {
                if close != ']' && chars.peek() == Some(&close) {
                    if let Some(n) = chars.next() {
                        out.push(n);
                    }
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '#' if out.rsplit('\n').next().map_or(true, |line| line.trim().is_empty()) => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => {
                if let Some(close) = closing_quote(c) {
                    quote = Some(close);
                }
                out.push(c);
            }
        }
    }

    out
}

/// Replace the contents of `'...'` literals with spaces. Byte offsets are
/// preserved so matches on the masked text index into the original.
pub fn mask_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_literal = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_literal {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push_str("  ");
                    continue;
                }
                in_literal = false;
                out.push('\'');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            continue;
        }
        if c == '\'' {
            in_literal = true;
        }
        out.push(c);
    }

    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '#'
}

/// Read one identifier (bare or quoted) from the start of `text`, skipping
/// leading whitespace. Returns the unquoted name and the remainder.
pub fn read_identifier(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    let first = text.chars().next()?;

    if let Some(close) = closing_quote(first) {
        let inner = &text[first.len_utf8()..];
        let end = inner.find(close)?;
        let name = inner[..end].to_string();
        if name.is_empty() {
            return None;
        }
        return Some((name, &inner[end + close.len_utf8()..]));
    }

    let end = text.find(|c: char| !is_ident_char(c)).unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    Some((text[..end].to_string(), &text[end..]))
}

/// Read a possibly schema-qualified name (`db.schema.table`) and keep the
/// last segment.
pub fn read_qualified_name(text: &str) -> Option<(String, &str)> {
    let (mut name, mut rest) = read_identifier(text)?;
    while let Some(after_dot) = rest.strip_prefix('.') {
        let (next, next_rest) = read_identifier(after_dot)?;
        name = next;
        rest = next_rest;
    }
    Some((name, rest))
}

/// Match a sequence of keywords at the start of `text` (case-insensitive,
/// whole words) and return what follows.
pub fn strip_keywords<'a>(text: &'a str, words: &[&str]) -> Option<&'a str> {
    let mut rest = text;
    for word in words {
        let trimmed = rest.trim_start();
        let head = trimmed.get(..word.len())?;
        if !head.eq_ignore_ascii_case(word) {
            return None;
        }
        let tail = &trimmed[word.len()..];
        if tail.chars().next().map_or(false, is_ident_char) {
            return None;
        }
        rest = tail;
    }
    Some(rest)
}

/// Parse `( a, b DESC, "c" )` at the start of `text` into bare column names.
/// Anything after the leading identifier of each entry (sort order, prefix
/// length, operator class) is dropped.
pub fn paren_list(text: &str) -> Option<(Vec<String>, &str)> {
    let text = text.trim_start();
    let close = find_closing_paren(text)?;
    let columns = split_top_level(&text[1..close])
        .into_iter()
        .filter_map(|entry| read_identifier(entry).map(|(name, _)| name))
        .collect();
    Some((columns, &text[close + 1..]))
}

/// Read a value token: a run of characters up to whitespace or a comma at
/// paren depth zero, with quoted sections kept whole.
pub fn read_value_token(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let mut end = text.len();
    walk(text, |i, c, depth| {
        if depth == 0 && (c.is_whitespace() || c == ',') {
            end = i;
            return false;
        }
        true
    });
    let token = &text[..end];
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Read a `'...'` literal at the start of `text` and unescape doubled quotes.
pub fn read_string_literal(text: &str) -> Option<String> {
    let text = text.trim_start();
    let inner = text.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                value.push('\'');
                continue;
            }
            return Some(value);
        }
        value.push(c);
    }
    None
}
