//! Identifier normalization between application field names and wire names.
//!
//! Application code declares columns in its own casing (`userId`,
//! `LastSeen`); the store only ever sees lowercased, underscored identifiers
//! (`user_id`, `last_seen`), with a trailing underscore appended when the
//! lowered form collides with a reserved CQL keyword. [`to_identifier`] and
//! [`from_identifier`] are mutual inverses for every valid field name under a
//! fixed [`CaseMode`]; the whole marshalling layer leans on that property.

use serde::{Deserialize, Serialize};

/// CQL keywords (plus a few driver-special column names) that may not be used
/// as bare identifiers. Colliding names are suffixed with `_` on the wire.
pub const RESERVED_WORDS: &[&str] = &[
    "partition_key",
    "cluster_key",
    "key",
    "column1",
    "value",
    "writetime",
    "ttl",
    "add",
    "all",
    "allow",
    "alter",
    "and",
    "apply",
    "asc",
    "authorize",
    "batch",
    "begin",
    "by",
    "columnfamily",
    "create",
    "delete",
    "desc",
    "drop",
    "from",
    "grant",
    "in",
    "index",
    "insert",
    "into",
    "keyspace",
    "limit",
    "modify",
    "of",
    "on",
    "order",
    "primary",
    "rename",
    "revoke",
    "schema",
    "select",
    "set",
    "table",
    "to",
    "token",
    "truncate",
    "update",
    "use",
    "using",
    "where",
    "with",
];

/// True when `word` is a reserved identifier on the wire.
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Casing convention for application-level field names of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaseMode {
    /// Field names are already `snake_case`; wire names pass through.
    #[default]
    Snake,
    /// `camelCase` field names.
    Camel,
    /// `PascalCase` field names.
    Pascal,
}

/// True when `name` is acceptable as a table or column name: a letter or
/// underscore followed by word characters.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lower an application field name to its wire identifier.
///
/// Inserts an underscore before every non-initial uppercase character,
/// lowercases the result, and appends exactly one trailing underscore when
/// the lowered form is reserved.
pub fn to_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    if is_reserved(&out) {
        out.push('_');
    }
    out
}

/// Raise a wire identifier back to the application field name for `mode`.
///
/// Strips one trailing underscore first when the stripped form is reserved
/// (the inverse of the collision suffix), then rejoins the underscore
/// segments according to the case mode.
pub fn from_identifier(name: &str, mode: CaseMode) -> String {
    let base = match name.strip_suffix('_') {
        Some(stripped) if is_reserved(stripped) => stripped,
        _ => name,
    };

    match mode {
        CaseMode::Snake => base.to_string(),
        CaseMode::Camel => recase(base, false),
        CaseMode::Pascal => recase(base, true),
    }
}

fn recase(name: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(name.len());
    for (idx, part) in name.split('_').enumerate() {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if idx > 0 || capitalize_first => {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
            Some(first) => {
                out.push(first);
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    out
}
