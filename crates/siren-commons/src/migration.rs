//! Per-version row migration scripts.
//!
//! A table schema carries a map from source version to [`RowMigration`]; the
//! migration engine in `siren-core` drives a stored row through these scripts
//! one version at a time on the read path.

use crate::errors::{Result, SessionError};
use crate::session::{RowSet, Statement, StoreSession};
use crate::value::Row;
use async_trait::async_trait;

/// Which columns a migration script reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSet {
    /// The script touches the whole row (wildcard).
    All,
    /// The script touches exactly these application-level fields.
    Named(Vec<String>),
}

impl FieldSet {
    pub fn named<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSet::Named(fields.into_iter().map(Into::into).collect())
    }
}

/// Store access handed to a running migration script.
///
/// Scripts that need to read or write other rows (the delete-and-reinsert
/// pattern) execute statements through this rather than holding the client.
pub struct MigrationHandle<'a> {
    session: &'a dyn StoreSession,
}

impl<'a> MigrationHandle<'a> {
    pub fn new(session: &'a dyn StoreSession) -> Self {
        Self { session }
    }

    pub async fn execute(&self, statement: &Statement) -> std::result::Result<RowSet, SessionError> {
        self.session.execute(statement).await
    }
}

/// A migration from one row version to the next.
///
/// `migrate` receives a deep copy of the row and the version it was stored
/// at. Returning `Some(row)` hands the result back to the engine for
/// persistence; returning `None` signals that the script rewrote the row
/// itself (deleted and reinserted it) and the engine must re-fetch.
#[async_trait]
pub trait RowMigration: Send + Sync {
    /// The fields this script is declared over.
    fn fields(&self) -> FieldSet;

    /// Optional human-readable description, logged when the script runs.
    fn changes(&self) -> Option<&str> {
        None
    }

    async fn migrate(
        &self,
        handle: &MigrationHandle<'_>,
        row: Row,
        source_version: i32,
    ) -> Result<Option<Row>>;
}

/// Adapter turning a pure function into a [`RowMigration`]. Most scripts
/// only reshape the row and never touch the store.
pub struct FnMigration<F> {
    fields: FieldSet,
    changes: Option<String>,
    func: F,
}

#[async_trait]
impl<F> RowMigration for FnMigration<F>
where
    F: Fn(Row, i32) -> Row + Send + Sync,
{
    fn fields(&self) -> FieldSet {
        self.fields.clone()
    }

    fn changes(&self) -> Option<&str> {
        self.changes.as_deref()
    }

    async fn migrate(
        &self,
        _handle: &MigrationHandle<'_>,
        row: Row,
        source_version: i32,
    ) -> Result<Option<Row>> {
        Ok(Some((self.func)(row, source_version)))
    }
}

/// Build a migration script from a pure closure.
pub fn migration_fn<F>(fields: FieldSet, func: F) -> std::sync::Arc<dyn RowMigration>
where
    F: Fn(Row, i32) -> Row + Send + Sync + 'static,
{
    std::sync::Arc::new(FnMigration {
        fields,
        changes: None,
        func,
    })
}

/// Build a migration script from a pure closure with a description.
pub fn migration_fn_with_changes<F>(
    fields: FieldSet,
    changes: impl Into<String>,
    func: F,
) -> std::sync::Arc<dyn RowMigration>
where
    F: Fn(Row, i32) -> Row + Send + Sync + 'static,
{
    std::sync::Arc::new(FnMigration {
        fields,
        changes: Some(changes.into()),
        func,
    })
}
