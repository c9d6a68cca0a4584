//! Table schema declarations, the single source of truth for a table.
//!
//! A `TableSchema` is constructed once at process start through
//! [`TableSchemaBuilder`], validated in `build()`, and frozen behind an `Arc`
//! in the registry. Everything derived from the declaration that queries need
//! repeatedly (the wire table name and the wire-column conversion table) is
//! precomputed here rather than rebuilt per call.

use crate::errors::{Result, SirenError};
use crate::identifiers::{is_reserved, is_valid_identifier, to_identifier, CaseMode};
use crate::migration::RowMigration;
use crate::types::ColumnType;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default name of the injected version marker column.
pub const DEFAULT_VERSION_COLUMN: &str = "int_tbl_ver";

/// A declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Precomputed wire-side view of a declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct WireColumn {
    pub wire_name: String,
    pub app_name: String,
    pub data_type: ColumnType,
}

/// Ordered primary key: one partition-key group followed by clustering
/// columns, all application-level names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKey {
    pub partition: Vec<String>,
    pub clustering: Vec<String>,
}

impl PrimaryKey {
    /// All key columns, partition group first.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.partition.iter().chain(self.clustering.iter())
    }

    /// The key as wire-level (partition, clustering) name lists, the shape
    /// the reconciler compares against live metadata.
    pub fn wire(&self) -> (Vec<String>, Vec<String>) {
        (
            self.partition.iter().map(|c| to_identifier(c)).collect(),
            self.clustering.iter().map(|c| to_identifier(c)).collect(),
        )
    }
}

/// A declared secondary index. Without an explicit name the wire name is
/// generated as `{table}_inx_{column}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: Option<String>,
    pub column: String,
}

impl IndexSpec {
    pub fn wire_name(&self, wire_table: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}_inx_{}", wire_table, to_identifier(&self.column)),
        }
    }
}

/// Version marker declaration: the column that records which migration
/// version last wrote each row, and the schema's current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    pub column: String,
    pub current: i32,
}

/// A named nested (user-defined) type declared alongside the table.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedType {
    pub name: String,
    pub fields: Vec<ColumnDef>,
}

/// A value in the table's `WITH` options clause.
#[derive(Debug, Clone, PartialEq)]
pub enum WithValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Rendered as `{'k': 'v', ...}` (caching, compaction, compression).
    Map(Vec<(String, String)>),
    List(Vec<String>),
}

/// Complete declaration of one table.
pub struct TableSchema {
    name: String,
    wire_table: String,
    wire_target: String,
    columns: Vec<ColumnDef>,
    primary_key: PrimaryKey,
    indexes: Vec<IndexSpec>,
    version: Option<VersionSpec>,
    migrations: BTreeMap<i32, Arc<dyn RowMigration>>,
    mode: CaseMode,
    types: Vec<NestedType>,
    with_options: Vec<(String, WithValue)>,
    keyspace: Option<String>,
    if_not_exists: bool,
    wire_columns: Vec<WireColumn>,
}

impl fmt::Debug for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("primary_key", &self.primary_key)
            .field("version", &self.version)
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl TableSchema {
    pub fn builder(name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder::new(name)
    }

    /// Application-level table name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire-level table name (lowercased, underscored).
    pub fn wire_table(&self) -> &str {
        &self.wire_table
    }

    /// The name statements address the table by: the wire table name,
    /// prefixed with the keyspace override when one is declared.
    pub fn wire_target(&self) -> &str {
        &self.wire_target
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, app_name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == app_name)
    }

    /// Precomputed wire-name → column conversion table, in declaration order.
    pub fn wire_columns(&self) -> &[WireColumn] {
        &self.wire_columns
    }

    pub fn wire_column(&self, wire_name: &str) -> Option<&WireColumn> {
        self.wire_columns.iter().find(|c| c.wire_name == wire_name)
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn version(&self) -> Option<&VersionSpec> {
        self.version.as_ref()
    }

    /// Wire name of the forced index on the version column, when a version
    /// is declared.
    pub fn version_index_name(&self) -> Option<String> {
        self.version
            .as_ref()
            .map(|v| format!("{}_inx_{}", self.wire_table, to_identifier(&v.column)))
    }

    pub fn migration(&self, source_version: i32) -> Option<&Arc<dyn RowMigration>> {
        self.migrations.get(&source_version)
    }

    pub fn mode(&self) -> CaseMode {
        self.mode
    }

    pub fn nested_types(&self) -> &[NestedType] {
        &self.types
    }

    pub fn nested_type(&self, name: &str) -> Option<&NestedType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn with_options(&self) -> &[(String, WithValue)] {
        &self.with_options
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }
}

/// Builder for [`TableSchema`]. `build()` performs all declaration-time
/// validation; nothing is checked again at query time.
pub struct TableSchemaBuilder {
    name: String,
    columns: Vec<ColumnDef>,
    partition: Vec<String>,
    clustering: Vec<String>,
    indexes: Vec<IndexSpec>,
    version: Option<VersionSpec>,
    migrations: BTreeMap<i32, Arc<dyn RowMigration>>,
    mode: CaseMode,
    types: Vec<NestedType>,
    with_options: Vec<(String, WithValue)>,
    keyspace: Option<String>,
    if_not_exists: bool,
}

impl TableSchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            partition: Vec::new(),
            clustering: Vec::new(),
            indexes: Vec::new(),
            version: None,
            migrations: BTreeMap::new(),
            mode: CaseMode::default(),
            types: Vec::new(),
            with_options: Vec::new(),
            keyspace: None,
            if_not_exists: false,
        }
    }

    pub fn column(mut self, name: impl Into<String>, data_type: ColumnType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    /// The partition-key group, in order.
    pub fn partition_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Clustering columns, in order.
    pub fn clustering_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clustering = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.indexes.push(IndexSpec {
            name: None,
            column: column.into(),
        });
        self
    }

    pub fn named_index(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.indexes.push(IndexSpec {
            name: Some(name.into()),
            column: column.into(),
        });
        self
    }

    /// Declare the schema's current version with the default marker column.
    pub fn version(mut self, current: i32) -> Self {
        self.version = Some(VersionSpec {
            column: DEFAULT_VERSION_COLUMN.to_string(),
            current,
        });
        self
    }

    /// Declare the schema's current version with a custom marker column.
    pub fn version_as(mut self, column: impl Into<String>, current: i32) -> Self {
        self.version = Some(VersionSpec {
            column: column.into(),
            current,
        });
        self
    }

    /// Register the migration script run for rows stored at
    /// `source_version`. Version 0 is the "row predates versioning" slot.
    pub fn migration(mut self, source_version: i32, script: Arc<dyn RowMigration>) -> Self {
        self.migrations.insert(source_version, script);
        self
    }

    pub fn mode(mut self, mode: CaseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn nested_type<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        self.types.push(NestedType {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| ColumnDef::new(name, ty))
                .collect(),
        });
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: WithValue) -> Self {
        self.with_options.push((key.into(), value));
        self
    }

    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn if_not_exists(mut self, yes: bool) -> Self {
        self.if_not_exists = yes;
        self
    }

    pub fn build(self) -> Result<TableSchema> {
        if self.name.is_empty() {
            return Err(SirenError::config("Table name is required"));
        }
        if !is_valid_identifier(&self.name) {
            return Err(SirenError::config(format!(
                "The table name {} is invalid; names must start with a letter or underscore and contain only word characters",
                self.name
            )));
        }
        if is_reserved(&self.name) {
            return Err(SirenError::config(format!(
                "The table name {} is a reserved word; rename it (for example {}_)",
                self.name, self.name
            )));
        }
        if self.columns.is_empty() {
            return Err(SirenError::config(format!(
                "Table {} declares no columns",
                self.name
            )));
        }

        for column in &self.columns {
            if !is_valid_identifier(&column.name) {
                return Err(SirenError::config(format!(
                    "The column name {} on table {} is invalid",
                    column.name, self.name
                )));
            }
            if is_reserved(&column.name.to_lowercase()) {
                log::warn!(
                    "[{}] The column name {} is a reserved word; it will be suffixed with an underscore on the wire",
                    self.name,
                    column.name
                );
            }
            if let Some(named) = column.data_type.named_ref() {
                if !self.types.iter().any(|t| t.name == named) {
                    return Err(SirenError::config(format!(
                        "Column {} on table {} references undeclared nested type {}",
                        column.name, self.name, named
                    )));
                }
            }
        }

        if self.partition.is_empty() {
            return Err(SirenError::config(format!(
                "Table {} declares no partition key",
                self.name
            )));
        }
        let key_count = self.partition.len() + self.clustering.len();
        if key_count >= self.columns.len() {
            return Err(SirenError::config(format!(
                "Table {} declares all columns as primary keys; this is not allowed",
                self.name
            )));
        }
        for key in self.partition.iter().chain(self.clustering.iter()) {
            if !self.columns.iter().any(|c| &c.name == key) {
                return Err(SirenError::config(format!(
                    "Primary key column {} is not declared on table {}",
                    key, self.name
                )));
            }
        }

        for index in &self.indexes {
            if !self.columns.iter().any(|c| c.name == index.column) {
                return Err(SirenError::config(format!(
                    "Index target {} is not declared on table {}",
                    index.column, self.name
                )));
            }
        }
        if self.indexes.len() > self.columns.len() * 3 / 4 {
            log::warn!(
                "[{}] More than 75% of the columns are indexed; keep the index set minimal",
                self.name
            );
        }

        if let Some(version) = &self.version {
            if version.current == 0 || version.current == -1 {
                return Err(SirenError::config(format!(
                    "Table {} declares version {}, which is reserved for internal migration bookkeeping; use a positive version",
                    self.name, version.current
                )));
            }
            if version.current < 0 {
                return Err(SirenError::config(format!(
                    "Table {} declares a negative version {}",
                    self.name, version.current
                )));
            }
            if !is_valid_identifier(&version.column) {
                return Err(SirenError::config(format!(
                    "The version column name {} on table {} is invalid",
                    version.column, self.name
                )));
            }
        } else if !self.migrations.is_empty() {
            return Err(SirenError::config(format!(
                "Table {} registers migration scripts but declares no version",
                self.name
            )));
        }

        if let Some(keyspace) = &self.keyspace {
            if !is_valid_identifier(keyspace) {
                return Err(SirenError::config(format!(
                    "The keyspace override {} on table {} is invalid",
                    keyspace, self.name
                )));
            }
        }

        for nested in &self.types {
            if !is_valid_identifier(&nested.name) {
                return Err(SirenError::config(format!(
                    "The nested type name {} on table {} is invalid",
                    nested.name, self.name
                )));
            }
            for field in &nested.fields {
                if !is_valid_identifier(&field.name) {
                    return Err(SirenError::config(format!(
                        "The field name {} on nested type {} is invalid",
                        field.name, nested.name
                    )));
                }
            }
        }

        let wire_table = to_identifier(&self.name);
        let wire_target = match &self.keyspace {
            Some(keyspace) => format!("{keyspace}.{wire_table}"),
            None => wire_table.clone(),
        };
        let wire_columns = self
            .columns
            .iter()
            .map(|c| WireColumn {
                wire_name: to_identifier(&c.name),
                app_name: c.name.clone(),
                data_type: c.data_type.clone(),
            })
            .collect();

        Ok(TableSchema {
            name: self.name,
            wire_table,
            wire_target,
            columns: self.columns,
            primary_key: PrimaryKey {
                partition: self.partition,
                clustering: self.clustering,
            },
            indexes: self.indexes,
            version: self.version,
            migrations: self.migrations,
            mode: self.mode,
            types: self.types,
            with_options: self.with_options,
            keyspace: self.keyspace,
            if_not_exists: self.if_not_exists,
            wire_columns,
        })
    }
}
