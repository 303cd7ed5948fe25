//! `CREATE TABLE` / `CREATE INDEX` parsing.
//!
//! The parser is deliberately lenient: it never fails, and text it cannot
//! place is skipped with a debug log entry. Table bodies are cut out with a
//! depth-aware paren scan and split into clauses on top-level commas, so
//! `DECIMAL(10,2)`, `DEFAULT (now())` or `CHECK (a IN (1, 2))` never end a
//! body or a clause early.

use super::scanner::{
    find_closing_paren, mask_literals, paren_list, read_identifier, read_qualified_name,
    read_string_literal, read_value_token, split_top_level, strip_comments, strip_keywords,
};
use crate::models::{Column, DbType, ForeignKey, Index, Schema, Table};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

const DEFAULT_INDEX_TYPE: &str = "BTREE";

lazy_static! {
    static ref CREATE_TABLE: Regex = Regex::new(
        r"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMPORARY|TEMP|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?"
    )
    .expect("valid CREATE TABLE pattern");
    static ref CREATE_INDEX: Regex = Regex::new(
        r"(?i)\bCREATE\s+(UNIQUE\s+)?(?:(CLUSTERED|NONCLUSTERED|BITMAP|FULLTEXT|SPATIAL)\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?"
    )
    .expect("valid CREATE INDEX pattern");
    static ref NOT_NULL: Regex = Regex::new(r"(?i)\bNOT\s+NULL\b").expect("valid pattern");
    static ref PRIMARY_KEY: Regex = Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("valid pattern");
    static ref UNIQUE: Regex = Regex::new(r"(?i)\bUNIQUE\b").expect("valid pattern");
    static ref AUTO_INCREMENT: Regex =
        Regex::new(r"(?i)\b(?:AUTO_INCREMENT|AUTOINCREMENT|IDENTITY)\b").expect("valid pattern");
    static ref DEFAULT_KW: Regex = Regex::new(r"(?i)\bDEFAULT\s+").expect("valid pattern");
    static ref COMMENT_KW: Regex = Regex::new(r"(?i)\bCOMMENT\s*=?\s*").expect("valid pattern");
    static ref REFERENCES_KW: Regex = Regex::new(r"(?i)\bREFERENCES\b").expect("valid pattern");
    static ref REFERENTIAL_ACTION: Regex = Regex::new(
        r"(?i)\bON\s+(DELETE|UPDATE)\s+(SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION|CASCADE|RESTRICT)\b"
    )
    .expect("valid pattern");
}

/// Parse DDL text into a [`Schema`]. Text without any `CREATE TABLE` yields
/// a schema with no tables.
pub fn parse_ddl(ddl: &str, db_type: Option<DbType>) -> Schema {
    let cleaned = strip_comments(ddl);
    let mut schema = Schema::new("", db_type);

    for m in CREATE_TABLE.find_iter(&cleaned) {
        let Some((name, after_name)) = read_qualified_name(&cleaned[m.end()..]) else {
            continue;
        };
        let body_start = cleaned.len() - after_name.trim_start().len();
        let Some(close) = find_closing_paren(&cleaned[body_start..]) else {
            debug!("Skipping CREATE TABLE {} without a closed column list", name);
            continue;
        };
        let body = &cleaned[body_start + 1..body_start + close];

        if schema.defines_table(&name) {
            debug!("Skipping duplicate definition of table {}", name);
            continue;
        }
        schema.tables.push(parse_table_body(&name, body));
    }

    attach_create_indexes(&cleaned, &mut schema);

    info!(
        "Parsed DDL: {} tables, {} indexes",
        schema.tables.len(),
        schema.tables.iter().map(|t| t.indexes.len()).sum::<usize>()
    );
    schema
}

/// Accumulates one table while its clauses are classified.
#[derive(Default)]
struct TableBuilder {
    table: Table,
    table_pk: Option<Vec<String>>,
    inline_pk: Vec<String>,
    unique_columns: Vec<String>,
}

fn parse_table_body(name: &str, body: &str) -> Table {
    let mut builder = TableBuilder {
        table: Table::new(name),
        ..Default::default()
    };

    for clause in split_top_level(body) {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        if is_constraint_clause(clause) && !is_keyword_named_column(clause) {
            parse_table_constraint(clause, &mut builder);
        } else {
            parse_column(clause, &mut builder);
        }
    }

    let TableBuilder {
        mut table,
        table_pk,
        inline_pk,
        unique_columns,
    } = builder;

    table.primary_key = table_pk.unwrap_or(inline_pk);
    for column in &mut table.columns {
        if unique_columns
            .iter()
            .any(|u| u.eq_ignore_ascii_case(&column.name))
        {
            column.is_unique = true;
        }
    }
    table.apply_key_flags();
    for column in table.columns.iter_mut().filter(|c| c.is_pk) {
        column.nullable = false;
    }
    table
}

fn is_constraint_clause(clause: &str) -> bool {
    const LEADING: [&[&str]; 11] = [
        &["PRIMARY", "KEY"],
        &["FOREIGN", "KEY"],
        &["CONSTRAINT"],
        &["INDEX"],
        &["KEY"],
        &["UNIQUE"],
        &["CHECK"],
        &["EXCLUDE"],
        &["FULLTEXT"],
        &["SPATIAL"],
        &["PERIOD"],
    ];
    LEADING
        .iter()
        .any(|words| strip_keywords(clause, words).is_some())
}

/// A column called `key` or `index`: `key VARCHAR(50)`, `index INT NOT NULL`.
/// An index clause has its column list right after the (optional) name and
/// `USING` method, and that list holds identifiers, not type arguments.
fn is_keyword_named_column(clause: &str) -> bool {
    let Some(after) =
        strip_keywords(clause, &["KEY"]).or_else(|| strip_keywords(clause, &["INDEX"]))
    else {
        return false;
    };
    if after.trim_start().starts_with('(') {
        return false;
    }
    let Some((_, rest)) = read_identifier(after) else {
        return false;
    };
    let (_, rest) = read_using(rest);
    match paren_list(rest) {
        Some((columns, _)) => {
            columns.is_empty()
                || columns
                    .iter()
                    .any(|c| c.starts_with(|ch: char| ch.is_ascii_digit()))
        }
        None => true,
    }
}

fn parse_table_constraint(clause: &str, builder: &mut TableBuilder) {
    let (constraint_name, rest) = match strip_keywords(clause, &["CONSTRAINT"]) {
        Some(after) => match read_identifier(after) {
            Some((name, rest)) => (Some(name), rest),
            None => return,
        },
        None => (None, clause),
    };

    if let Some(after) = strip_keywords(rest, &["PRIMARY", "KEY"]) {
        let after = strip_keywords(after, &["CLUSTERED"])
            .or_else(|| strip_keywords(after, &["NONCLUSTERED"]))
            .unwrap_or(after);
        if let Some((columns, _)) = paren_list(after) {
            builder.table_pk = Some(columns);
        }
    } else if let Some(after) = strip_keywords(rest, &["FOREIGN", "KEY"]) {
        let fks = parse_foreign_key(after, constraint_name.as_deref());
        if fks.is_empty() {
            debug!("Unrecognized foreign key clause in {}: {}", builder.table.name, clause);
        }
        builder.table.foreign_keys.extend(fks);
    } else if let Some(after) = strip_keywords(rest, &["UNIQUE"]) {
        let after = strip_keywords(after, &["KEY"])
            .or_else(|| strip_keywords(after, &["INDEX"]))
            .unwrap_or(after);
        if let Some(index) = parse_inline_index(after, constraint_name, true, None) {
            if index.columns.len() == 1 {
                builder.unique_columns.push(index.columns[0].clone());
            }
            builder.table.indexes.push(index);
        }
    } else if let Some(after) =
        strip_keywords(rest, &["KEY"]).or_else(|| strip_keywords(rest, &["INDEX"]))
    {
        if let Some(index) = parse_inline_index(after, constraint_name, false, None) {
            builder.table.indexes.push(index);
        }
    } else if let Some((kind, after)) = ["FULLTEXT", "SPATIAL"]
        .iter()
        .find_map(|kind| strip_keywords(rest, &[*kind]).map(|after| (kind.to_string(), after)))
    {
        let after = strip_keywords(after, &["KEY"])
            .or_else(|| strip_keywords(after, &["INDEX"]))
            .unwrap_or(after);
        if let Some(index) = parse_inline_index(after, constraint_name, false, Some(kind)) {
            builder.table.indexes.push(index);
        }
    } else {
        debug!("Dropping unsupported table clause in {}: {}", builder.table.name, clause);
    }
}

/// `[name] [USING method] (cols) [USING method]` after `KEY`/`INDEX`/`UNIQUE`.
fn parse_inline_index(
    text: &str,
    constraint_name: Option<String>,
    is_unique: bool,
    kind: Option<String>,
) -> Option<Index> {
    let (name, rest) = if text.trim_start().starts_with('(') {
        (constraint_name, text)
    } else {
        let (name, rest) = read_identifier(text)?;
        (Some(name), rest)
    };
    let (method, rest) = read_using(rest);
    let (columns, tail) = paren_list(rest)?;
    let method = method.or_else(|| read_using(tail).0);
    let name = name.or_else(|| columns.first().cloned())?;

    Some(Index {
        name,
        columns,
        is_unique,
        index_type: kind
            .or(method)
            .unwrap_or_else(|| DEFAULT_INDEX_TYPE.to_string()),
    })
}

fn read_using(text: &str) -> (Option<String>, &str) {
    match strip_keywords(text, &["USING"]).and_then(read_identifier) {
        Some((method, rest)) => (Some(method.to_uppercase()), rest),
        None => (None, text),
    }
}

/// `(cols) REFERENCES table (cols) [ON DELETE ..] [ON UPDATE ..]`, one FK per
/// column pair.
fn parse_foreign_key(text: &str, constraint_name: Option<&str>) -> Vec<ForeignKey> {
    let Some((columns, rest)) = paren_list(text) else {
        return Vec::new();
    };
    let Some(rest) = strip_keywords(rest, &["REFERENCES"]) else {
        return Vec::new();
    };
    references(&columns, rest, constraint_name)
}

/// Resolve `table (cols) [actions]` following a `REFERENCES` keyword.
fn references(columns: &[String], text: &str, constraint_name: Option<&str>) -> Vec<ForeignKey> {
    let Some((ref_table, rest)) = read_qualified_name(text) else {
        return Vec::new();
    };
    let Some((ref_columns, rest)) = paren_list(rest) else {
        return Vec::new();
    };

    let mut on_delete = None;
    let mut on_update = None;
    for caps in REFERENTIAL_ACTION.captures_iter(rest) {
        let action = caps[2].split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        if caps[1].eq_ignore_ascii_case("DELETE") {
            on_delete = Some(action);
        } else {
            on_update = Some(action);
        }
    }

    columns
        .iter()
        .zip(ref_columns.iter())
        .map(|(column, ref_column)| ForeignKey {
            name: constraint_name
                .map(str::to_string)
                .unwrap_or_else(|| ForeignKey::synthesized_name(column, &ref_table)),
            column: column.clone(),
            ref_table: ref_table.clone(),
            ref_column: ref_column.clone(),
            on_delete: on_delete.clone(),
            on_update: on_update.clone(),
        })
        .collect()
}

fn parse_column(clause: &str, builder: &mut TableBuilder) {
    let Some((name, rest)) = read_identifier(clause) else {
        debug!("Dropping unparseable clause in {}: {}", builder.table.name, clause);
        return;
    };
    if !rest.starts_with(char::is_whitespace) {
        debug!("Dropping unparseable clause in {}: {}", builder.table.name, clause);
        return;
    }
    let Some((data_type, constraints)) = read_type(rest) else {
        debug!("Dropping column {}.{} without a type", builder.table.name, name);
        return;
    };

    // Flags are matched on masked text so COMMENT/DEFAULT literals cannot
    // contribute keywords; offsets still line up with `constraints`.
    let masked = mask_literals(constraints);
    let is_pk = PRIMARY_KEY.is_match(&masked);
    let is_auto_incr =
        AUTO_INCREMENT.is_match(&masked) || data_type.to_uppercase().contains("SERIAL");

    let column = Column {
        nullable: !(NOT_NULL.is_match(&masked) || is_pk),
        default: column_default(constraints, &masked),
        comment: COMMENT_KW
            .find(&masked)
            .and_then(|m| read_string_literal(&constraints[m.end()..])),
        is_pk,
        is_fk: false,
        is_unique: UNIQUE.is_match(&masked),
        is_auto_incr,
        name,
        data_type,
    };

    if let Some(m) = REFERENCES_KW.find(&masked) {
        let fks = references(
            std::slice::from_ref(&column.name),
            &constraints[m.end()..],
            None,
        );
        builder.table.foreign_keys.extend(fks);
    }
    if is_pk {
        builder.inline_pk.push(column.name.clone());
    }
    builder.table.columns.push(column);
}

fn column_default(constraints: &str, masked: &str) -> Option<String> {
    DEFAULT_KW
        .find_iter(masked)
        // GENERATED BY DEFAULT AS IDENTITY is not a default value
        .find(|m| {
            !masked[..m.start()]
                .trim_end()
                .to_ascii_uppercase()
                .ends_with("BY")
        })
        .and_then(|m| read_value_token(&constraints[m.end()..]))
        .map(str::to_string)
}

/// Split `<type>[(...)] rest` into the declared type and the trailing
/// constraint text. Multi-word types and array suffixes stay in the type.
fn read_type(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    if end == 0 || !text.starts_with(|c: char| c.is_alphabetic()) {
        return None;
    }
    let base = &text[..end];
    let mut data_type = base.to_string();
    let mut rest = &text[end..];

    let continuation: &[&str] = match base.to_ascii_uppercase().as_str() {
        "DOUBLE" => &["PRECISION"],
        "CHARACTER" | "CHAR" | "BIT" => &["VARYING"],
        "LONG" => &["RAW"],
        _ => &[],
    };
    if let Some(after) = strip_keywords(rest, continuation).filter(|_| !continuation.is_empty()) {
        data_type.push(' ');
        data_type.push_str(&rest.trim_start()[..continuation[0].len()]);
        rest = after;
    }

    let trimmed = rest.trim_start();
    if let Some(close) = find_closing_paren(trimmed) {
        data_type.push_str(&trimmed[..=close]);
        rest = &trimmed[close + 1..];
    }

    while let Some(after) = rest.strip_prefix("[]") {
        data_type.push_str("[]");
        rest = after;
    }

    let upper_base = base.to_ascii_uppercase();
    if upper_base == "TIMESTAMP" || upper_base == "TIME" {
        for words in [["WITH", "TIME", "ZONE"], ["WITHOUT", "TIME", "ZONE"]] {
            if let Some(after) = strip_keywords(rest, &words) {
                data_type.push(' ');
                data_type.push_str(&words.join(" "));
                rest = after;
                break;
            }
        }
    }

    for modifier in ["UNSIGNED", "ZEROFILL"] {
        if let Some(after) = strip_keywords(rest, &[modifier]) {
            data_type.push(' ');
            data_type.push_str(modifier);
            rest = after;
        }
    }

    Some((data_type, rest))
}

/// Scan the whole document for `CREATE [UNIQUE] INDEX ... ON table (...)`
/// and attach each index to its table, independent of statement order.
fn attach_create_indexes(ddl: &str, schema: &mut Schema) {
    for caps in CREATE_INDEX.captures_iter(ddl) {
        let Some(whole) = caps.get(0) else { continue };
        let is_unique = caps.get(1).is_some();
        let kind = caps.get(2).map(|k| k.as_str().to_uppercase());

        let Some((table_name, index)) = parse_create_index(&ddl[whole.end()..], is_unique, kind)
        else {
            continue;
        };
        match schema.table_mut(&table_name) {
            Some(table) => table.indexes.push(index),
            None => debug!("Index {} references unknown table {}", index.name, table_name),
        }
    }
}

fn parse_create_index(
    text: &str,
    is_unique: bool,
    kind: Option<String>,
) -> Option<(String, Index)> {
    let (name, rest) = read_qualified_name(text)?;
    let rest = strip_keywords(rest, &["ON"])?;
    let rest = strip_keywords(rest, &["ONLY"]).unwrap_or(rest);
    let (table_name, rest) = read_qualified_name(rest)?;
    let (method, rest) = read_using(rest);
    let (columns, _) = paren_list(rest)?;

    Some((
        table_name,
        Index {
            name,
            columns,
            is_unique,
            index_type: kind
                .or(method)
                .unwrap_or_else(|| DEFAULT_INDEX_TYPE.to_string()),
        },
    ))
}
