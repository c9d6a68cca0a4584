//! Column type descriptors and their wire names.
//!
//! `ColumnType` is a closed tagged variant: every declared column resolves to
//! one of these shapes at schema-build time, and the DDL compiler is a total
//! pattern match over them. Nothing here is inferred at query time.

use crate::identifiers::to_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive scalar column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// 64-bit signed integer (`bigint`)
    BigInt,
    /// Boolean (`boolean`)
    Boolean,
    /// 32-bit signed integer (`int`)
    Int,
    /// UTF-8 string (`text`)
    Text,
    /// Point in time (`timestamp`)
    Timestamp,
}

impl ScalarKind {
    /// The lowercase wire token for this scalar.
    pub fn wire_token(&self) -> &'static str {
        match self {
            ScalarKind::BigInt => "bigint",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Int => "int",
            ScalarKind::Text => "text",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

/// Declared type of a column: a scalar, a list, a frozen (immutable,
/// comparably-equal) wrapper, or a reference to a named nested type declared
/// on the same table schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Scalar(ScalarKind),
    List(Box<ColumnType>),
    Frozen(Box<ColumnType>),
    Named(String),
}

impl ColumnType {
    pub fn bigint() -> Self {
        ColumnType::Scalar(ScalarKind::BigInt)
    }

    pub fn boolean() -> Self {
        ColumnType::Scalar(ScalarKind::Boolean)
    }

    pub fn int() -> Self {
        ColumnType::Scalar(ScalarKind::Int)
    }

    pub fn text() -> Self {
        ColumnType::Scalar(ScalarKind::Text)
    }

    pub fn timestamp() -> Self {
        ColumnType::Scalar(ScalarKind::Timestamp)
    }

    pub fn list(inner: ColumnType) -> Self {
        ColumnType::List(Box::new(inner))
    }

    pub fn frozen(inner: ColumnType) -> Self {
        ColumnType::Frozen(Box::new(inner))
    }

    pub fn named(name: impl Into<String>) -> Self {
        ColumnType::Named(name.into())
    }

    /// The wire type name. Total and deterministic:
    /// scalar → token, list → `list<inner>`, frozen → `frozen<inner>`,
    /// named type → its lowercased underscored name.
    pub fn wire_name(&self) -> String {
        match self {
            ColumnType::Scalar(kind) => kind.wire_token().to_string(),
            ColumnType::List(inner) => format!("list<{}>", inner.wire_name()),
            ColumnType::Frozen(inner) => format!("frozen<{}>", inner.wire_name()),
            ColumnType::Named(name) => to_identifier(name),
        }
    }

    /// True when values of this type are lists on the wire, including a
    /// frozen wrapper around a list. Drives null-list normalization: the
    /// store returns null for empty collections and the application always
    /// sees `[]`.
    pub fn is_list(&self) -> bool {
        match self {
            ColumnType::List(_) => true,
            ColumnType::Frozen(inner) => inner.is_list(),
            ColumnType::Scalar(_) | ColumnType::Named(_) => false,
        }
    }

    /// The named nested type this column ultimately refers to, if any.
    pub fn named_ref(&self) -> Option<&str> {
        match self {
            ColumnType::Named(name) => Some(name),
            ColumnType::List(inner) | ColumnType::Frozen(inner) => inner.named_ref(),
            ColumnType::Scalar(_) => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}
