//! Data statements: select, insert, update, delete.
//!
//! Column names and filter keys arriving here are wire-level. Values are
//! bound as `?` parameters, with one exception: the version marker is
//! rendered as a literal so version-only rewrites stay a fixed statement
//! shape per table version.

use siren_commons::{Statement, Value};

fn where_clause(filter: &[(String, Value)]) -> String {
    if filter.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filter.iter().map(|(key, _)| format!("{key} = ?")).collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn filter_params(filter: &[(String, Value)]) -> Vec<Value> {
    filter.iter().map(|(_, value)| value.clone()).collect()
}

/// A `SELECT` over the given wire columns (or `*` when `fields` is `None`),
/// with an equality filter per entry. An empty filter selects the whole
/// table; no `WHERE` clause is emitted for it.
pub fn select(
    table: &str,
    fields: Option<&[String]>,
    filter: &[(String, Value)],
    allow_filtering: bool,
    limit: Option<u32>,
) -> Statement {
    let projection = match fields {
        Some(fields) if !fields.is_empty() => fields.join(", "),
        _ => "*".to_string(),
    };
    let query = format!(
        "SELECT {} FROM {}{}{}{};",
        projection,
        table,
        where_clause(filter),
        if allow_filtering { " ALLOW FILTERING" } else { "" },
        match limit {
            Some(n) => format!(" LIMIT {n}"),
            None => String::new(),
        },
    );
    Statement::new(query, filter_params(filter))
}

/// An `INSERT` over the given wire columns. When a version marker is given
/// it is appended as an extra column with a literal value.
pub fn insert(table: &str, columns: &[(String, Value)], version: Option<(&str, i32)>) -> Statement {
    let mut names: Vec<String> = columns.iter().map(|(key, _)| key.clone()).collect();
    let mut placeholders: Vec<String> = columns.iter().map(|_| "?".to_string()).collect();
    if let Some((column, value)) = version {
        names.push(column.to_string());
        placeholders.push(value.to_string());
    }
    let query = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        names.join(", "),
        placeholders.join(", ")
    );
    Statement::new(query, filter_params(columns))
}

/// An `UPDATE` setting the given wire columns, plus the version marker as a
/// literal when given. Either `assignments` or `version` must be non-empty;
/// the caller guarantees it.
pub fn update(
    table: &str,
    assignments: &[(String, Value)],
    version: Option<(&str, i32)>,
    filter: &[(String, Value)],
) -> Statement {
    let mut parts: Vec<String> = assignments
        .iter()
        .map(|(key, _)| format!("{key} = ?"))
        .collect();
    if let Some((column, value)) = version {
        parts.push(format!("{column} = {value}"));
    }
    let query = format!(
        "UPDATE {} SET {}{};",
        table,
        parts.join(", "),
        where_clause(filter)
    );
    let mut params = filter_params(assignments);
    params.extend(filter_params(filter));
    Statement::new(query, params)
}

/// A `DELETE` filtered by the given wire columns (primary key columns; the
/// caller enforces that).
pub fn delete(table: &str, filter: &[(String, Value)]) -> Statement {
    Statement::new(
        format!("DELETE FROM {}{};", table, where_clause(filter)),
        filter_params(filter),
    )
}
