//! Siren: schema-first access to a wide-column store.
//!
//! Tables are declared in code, registered in a [`TableRegistry`], and
//! reconciled against the live cluster when the [`Client`] connects. Reads
//! run stored rows through per-version migration scripts lazily, so schema
//! changes roll out row by row as data is touched.

pub mod client;
pub mod confirm;
mod marshal;
mod migrate;
mod reconciler;
pub mod registry;
pub mod table;
pub mod testing;

pub use client::Client;
pub use confirm::{AlwaysNo, AlwaysYes, ConfirmationSink, FailFast, StdinConfirmation};
pub use registry::TableRegistry;
pub use table::{FindOptions, Finder, GetOptions, TableHandle, WriteOptions};

pub use siren_commons::{
    migration_fn, migration_fn_with_changes, row, CaseMode, ClientConfig, ColumnKind, ColumnType,
    FieldSet, LiveColumn, LiveIndex, LiveSchemaSnapshot, MigrationHandle, ReplicationStrategy,
    Result, Row, RowMigration, RowSet, ScalarKind, SessionError, SirenError, Statement,
    StoreSession, TableSchema, TableSchemaBuilder, Value,
};
