//! The seam to the external wide-column store.
//!
//! siren never speaks the store's wire protocol itself; it generates
//! statements and interprets metadata through [`StoreSession`]. A production
//! implementation wraps a driver; tests use the recording session from
//! `siren-core`.

use crate::errors::SessionError;
use crate::value::{Row, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A parameterized statement: CQL text with `?` placeholders and positional
/// bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub query: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// A statement with no bind parameters (DDL, metadata queries).
    pub fn simple(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}

/// Result rows of an executed statement, keyed by wire column name.
pub type RowSet = Vec<Row>;

/// Role of a live column within its table's key structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    PartitionKey,
    Clustering,
    Regular,
}

/// A column as reported by the store's schema metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveColumn {
    pub name: String,
    pub kind: ColumnKind,
    /// Ordinal position within the column's kind group.
    pub position: i32,
}

/// A secondary index as reported by the store's schema metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveIndex {
    pub name: String,
    /// The indexed column.
    pub target: String,
}

/// Snapshot of a table's live schema, created fresh per reconciliation pass
/// and discarded after use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSchemaSnapshot {
    pub exists: bool,
    pub columns: Vec<LiveColumn>,
    pub indexes: Vec<LiveIndex>,
}

impl LiveSchemaSnapshot {
    /// Snapshot for a table that does not exist yet.
    pub fn absent() -> Self {
        Self {
            exists: false,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn new(columns: Vec<LiveColumn>, indexes: Vec<LiveIndex>) -> Self {
        Self {
            exists: true,
            columns,
            indexes,
        }
    }

    /// The live primary key as ordered (partition, clustering) name lists,
    /// each sorted by reported position.
    pub fn primary_key(&self) -> (Vec<String>, Vec<String>) {
        let mut partition: Vec<&LiveColumn> = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::PartitionKey)
            .collect();
        let mut clustering: Vec<&LiveColumn> = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Clustering)
            .collect();
        partition.sort_by_key(|c| c.position);
        clustering.sort_by_key(|c| c.position);

        (
            partition.into_iter().map(|c| c.name.clone()).collect(),
            clustering.into_iter().map(|c| c.name.clone()).collect(),
        )
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn has_index_on(&self, target: &str) -> bool {
        self.indexes.iter().any(|i| i.target == target)
    }
}

/// Connection to the wide-column store.
///
/// One shared handle per process; all table operations execute independent,
/// unordered statements against it. Implementations own per-statement
/// atomicity and timeouts; this layer never wraps calls in transactions.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Execute one statement, returning its result rows (empty for DDL and
    /// mutations).
    async fn execute(&self, statement: &Statement) -> Result<RowSet, SessionError>;

    /// Fetch the live schema for `table` in `keyspace`.
    async fn schema_snapshot(
        &self,
        keyspace: &str,
        table: &str,
    ) -> Result<LiveSchemaSnapshot, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_ordering() {
        let snapshot = LiveSchemaSnapshot::new(
            vec![
                LiveColumn {
                    name: "bucket".into(),
                    kind: ColumnKind::PartitionKey,
                    position: 1,
                },
                LiveColumn {
                    name: "guild_id".into(),
                    kind: ColumnKind::PartitionKey,
                    position: 0,
                },
                LiveColumn {
                    name: "message_id".into(),
                    kind: ColumnKind::Clustering,
                    position: 0,
                },
                LiveColumn {
                    name: "author_id".into(),
                    kind: ColumnKind::Regular,
                    position: 0,
                },
            ],
            Vec::new(),
        );

        let (partition, clustering) = snapshot.primary_key();
        assert_eq!(partition, vec!["guild_id", "bucket"]);
        assert_eq!(clustering, vec!["message_id"]);
    }

    #[test]
    fn test_absent_snapshot() {
        let snapshot = LiveSchemaSnapshot::absent();
        assert!(!snapshot.exists);
        assert_eq!(snapshot.primary_key(), (vec![], vec![]));
    }
}
