//! Shared foundation for the Siren data-access layer.
//!
//! This crate holds the pieces every other crate depends on: the error
//! type, identifier conversion, the closed column-type model, runtime
//! values, table schema declarations, the session abstraction over a live
//! cluster, and the row-migration trait.

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod migration;
pub mod schema;
pub mod session;
pub mod types;
pub mod value;

pub use config::{ClientConfig, ReplicationStrategy};
pub use errors::{Result, SessionError, SirenError};
pub use identifiers::{from_identifier, is_reserved, is_valid_identifier, to_identifier, CaseMode};
pub use migration::{
    migration_fn, migration_fn_with_changes, FieldSet, MigrationHandle, RowMigration,
};
pub use schema::{
    ColumnDef, IndexSpec, NestedType, PrimaryKey, TableSchema, TableSchemaBuilder, VersionSpec,
    WireColumn, WithValue, DEFAULT_VERSION_COLUMN,
};
pub use session::{
    ColumnKind, LiveColumn, LiveIndex, LiveSchemaSnapshot, RowSet, Statement, StoreSession,
};
pub use types::{ColumnType, ScalarKind};
pub use value::{row, Row, Value};
