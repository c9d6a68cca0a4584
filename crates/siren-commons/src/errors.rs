//! Shared error types for siren.
//!
//! Every error that reaches a caller carries enough context to act on it:
//! query and migration failures are qualified with the table name, and the
//! original store error is preserved as a `source` so driver detail is never
//! lost.

use thiserror::Error;

/// Error surfaced by a [`StoreSession`](crate::session::StoreSession)
/// implementation.
///
/// The session seam deliberately has a single opaque variant: the underlying
/// driver's error taxonomy is not this layer's concern, but its message is.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("store error: {0}")]
    Backend(String),
}

impl SessionError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Main error type for siren operations.
#[derive(Error, Debug)]
pub enum SirenError {
    /// Invalid schema declaration, caught at build/registration time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection or keyspace setup failure during startup.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation was attempted before `connect` completed.
    #[error("The client is not connected yet")]
    NotConnected,

    /// A table handle was requested for a name the registry does not know.
    #[error("Table not registered: {0}")]
    UnknownTable(String),

    /// Declared and live primary keys differ. Never auto-corrected: changing
    /// a table's partition or clustering keys requires moving data.
    #[error("[{table}] Primary key drift: {detail}")]
    PrimaryKeyDrift { table: String, detail: String },

    /// A reconciliation step (metadata fetch or DDL) failed.
    #[error("[{table}] Reconciliation failed: {detail}")]
    Reconcile { table: String, detail: String },

    /// A SELECT/INSERT/UPDATE/DELETE failed at the store.
    #[error("[{table}] Query failed: {source}")]
    Query {
        table: String,
        #[source]
        source: SessionError,
    },

    /// The caller asked for something the table cannot do (empty patch,
    /// delete by non-key columns, ...).
    #[error("[{table}] Invalid operation: {detail}")]
    InvalidOperation { table: String, detail: String },

    /// A migration script or the migration engine itself failed.
    #[error("[{table}] Migration failed: {detail}")]
    Migration { table: String, detail: String },
}

impl SirenError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(table: impl Into<String>, source: SessionError) -> Self {
        Self::Query {
            table: table.into(),
            source,
        }
    }

    pub fn reconcile(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Reconcile {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn primary_key_drift(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::PrimaryKeyDrift {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_operation(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidOperation {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn migration(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Migration {
            table: table.into(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias used across the siren crates.
pub type Result<T> = std::result::Result<T, SirenError>;
