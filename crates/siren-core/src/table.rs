//! Per-table operation handles.
//!
//! A [`TableHandle`] borrows the client and one registered schema and
//! exposes the read/write surface. Reads unmarshal to application rows and
//! run the lazy migration engine before returning; writes marshal to wire
//! form and stamp the version marker.

use crate::client::Client;
use crate::marshal;
use crate::migrate;
use siren_commons::{
    to_identifier, Result, Row, SirenError, TableSchema, Value,
};
use siren_cql::dml;
use std::sync::Arc;

/// Options for [`TableHandle::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Application-level fields to return. `None` fetches every column.
    pub fields: Option<Vec<String>>,
    pub allow_filtering: bool,
}

/// Options for [`TableHandle::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub fields: Option<Vec<String>>,
    pub allow_filtering: bool,
    pub limit: Option<u32>,
}

/// Options for writes. The version override exists for repair tooling;
/// normal writes stamp the schema's current version.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub version: Option<i32>,
}

/// Result collection of a [`TableHandle::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Finder {
    rows: Vec<Row>,
}

impl Finder {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_vec(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for Finder {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Finder {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Handle over one registered table.
#[derive(Clone)]
pub struct TableHandle {
    client: Arc<Client>,
    schema: Arc<TableSchema>,
}

impl TableHandle {
    pub(crate) fn new(client: Arc<Client>, schema: Arc<TableSchema>) -> Self {
        Self { client, schema }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Fetch at most one row matching `filter`.
    pub async fn get(&self, filter: &Row, options: GetOptions) -> Result<Option<Row>> {
        self.warn_on_full_fetch(options.fields.as_deref());
        self.client.ensure_connected()?;

        let projection = self.projection(options.fields.as_deref());
        let statement = dml::select(
            self.schema.wire_target(),
            projection.as_deref(),
            &marshal::to_wire_pairs(filter),
            options.allow_filtering,
            Some(1),
        );
        let rows = self.execute(&statement).await?;
        let Some(wire_row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let row = self.raise_and_migrate(wire_row, filter).await?;
        Ok(Some(self.shape_to_fields(row, options.fields.as_deref())))
    }

    /// Fetch every row matching `filter`, up to `limit`.
    pub async fn find(&self, filter: &Row, options: FindOptions) -> Result<Finder> {
        self.warn_on_full_fetch(options.fields.as_deref());
        self.client.ensure_connected()?;

        let projection = self.projection(options.fields.as_deref());
        let statement = dml::select(
            self.schema.wire_target(),
            projection.as_deref(),
            &marshal::to_wire_pairs(filter),
            options.allow_filtering,
            options.limit,
        );
        let rows = self.execute(&statement).await?;

        let mut out = Vec::with_capacity(rows.len());
        for wire_row in rows {
            let row = self.raise_and_migrate(wire_row, filter).await?;
            out.push(self.shape_to_fields(row, options.fields.as_deref()));
        }
        Ok(Finder::new(out))
    }

    /// Insert a row, stamping the version marker.
    pub async fn create(&self, data: Row, options: WriteOptions) -> Result<Row> {
        if data.is_empty() {
            return Err(SirenError::invalid_operation(
                self.schema.name(),
                "You are trying to create with no values, this is not allowed",
            ));
        }
        self.client.ensure_connected()?;

        let version = self.schema.version().map(|spec| {
            (
                to_identifier(&spec.column),
                options.version.unwrap_or(spec.current),
            )
        });
        let statement = dml::insert(
            self.schema.wire_target(),
            &marshal::to_wire_pairs(&data),
            version.as_ref().map(|(col, v)| (col.as_str(), *v)),
        );
        self.execute(&statement).await?;
        log::debug!("[{}] The data has been created", self.schema.name());
        Ok(data)
    }

    /// Alias of [`create`](Self::create).
    pub async fn insert(&self, data: Row, options: WriteOptions) -> Result<Row> {
        self.create(data, options).await
    }

    /// Apply `patch` to the rows matching `filter`. The version marker is
    /// only rewritten when an explicit override is given; a plain update is
    /// not a migration.
    pub async fn update(&self, filter: &Row, patch: Row, options: WriteOptions) -> Result<()> {
        if patch.is_empty() {
            return Err(SirenError::invalid_operation(
                self.schema.name(),
                "You are trying to update with no values, this is not allowed",
            ));
        }
        self.client.ensure_connected()?;

        let version = match (options.version, self.schema.version()) {
            (Some(v), Some(spec)) => Some((to_identifier(&spec.column), v)),
            _ => None,
        };
        let statement = dml::update(
            self.schema.wire_target(),
            &marshal::to_wire_pairs(&patch),
            version.as_ref().map(|(col, v)| (col.as_str(), *v)),
            &marshal::to_wire_pairs(filter),
        );
        self.execute(&statement).await?;
        log::debug!("[{}] The data has been updated", self.schema.name());
        Ok(())
    }

    /// Delete the rows matching `filter`. Only primary key columns may be
    /// filtered on; the store rejects anything else anyway, this just fails
    /// earlier and clearer.
    pub async fn delete(&self, filter: &Row) -> Result<()> {
        self.client.ensure_connected()?;

        for key in filter.keys() {
            if !self.schema.primary_key().columns().any(|c| c == key) {
                return Err(SirenError::invalid_operation(
                    self.schema.name(),
                    format!("Cannot delete by non-key column {key}"),
                ));
            }
        }
        let statement = dml::delete(self.schema.wire_target(), &marshal::to_wire_pairs(filter));
        self.execute(&statement).await?;
        log::debug!("[{}] The data has been deleted", self.schema.name());
        Ok(())
    }

    /// Alias of [`delete`](Self::delete).
    pub async fn remove(&self, filter: &Row) -> Result<()> {
        self.delete(filter).await
    }

    async fn execute(
        &self,
        statement: &siren_commons::Statement,
    ) -> Result<siren_commons::RowSet> {
        self.client
            .session()
            .execute(statement)
            .await
            .map_err(|e| SirenError::query(self.schema.name(), e))
    }

    /// Unmarshal one wire row and run it through the migration engine when
    /// its stored version trails the schema.
    async fn raise_and_migrate(&self, wire_row: Row, filter: &Row) -> Result<Row> {
        let stored_version = self.schema.version().map(|spec| {
            wire_row
                .get(&to_identifier(&spec.column))
                .and_then(Value::as_i32)
                .unwrap_or(0)
        });
        let row = marshal::from_wire_row(&self.schema, &wire_row);

        match (stored_version, self.schema.version()) {
            (Some(version), Some(spec)) if version < spec.current => {
                migrate::migrate_row(self.client.session(), &self.schema, row, version, filter)
                    .await
            }
            _ => Ok(row),
        }
    }

    /// Wire-level projection for an explicit field list: the version marker
    /// is always fetched alongside so the read path can see it.
    fn projection(&self, fields: Option<&[String]>) -> Option<Vec<String>> {
        let fields = match fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => return None,
        };
        let mut wire: Vec<String> = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            let name = to_identifier(field);
            if !wire.contains(&name) {
                wire.push(name);
            }
        }
        if let Some(spec) = self.schema.version() {
            let column = to_identifier(&spec.column);
            if !wire.contains(&column) {
                wire.push(column);
            }
        }
        Some(wire)
    }

    /// Trim the row to the requested fields and backfill requested fields
    /// the store had nothing for: lists as empty lists, everything else as
    /// null. Requested fields that are not declared columns are dropped.
    fn shape_to_fields(&self, mut row: Row, fields: Option<&[String]>) -> Row {
        let fields = match fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => return row,
        };
        row.retain(|key, _| fields.iter().any(|f| f == key));
        for field in fields {
            if row.contains_key(field) {
                continue;
            }
            let Some(column) = self.schema.column(field) else {
                continue;
            };
            let value = if column.data_type.is_list() {
                Value::List(Vec::new())
            } else {
                Value::Null
            };
            row.insert(field.clone(), value);
        }
        row
    }

    fn warn_on_full_fetch(&self, fields: Option<&[String]>) {
        let all = match fields {
            None => true,
            Some(fields) => fields.is_empty() || fields.len() == self.schema.columns().len(),
        };
        if all {
            log::warn!(
                "[{}] You are fetching all fields, this is not recommended, please specify the fields you want to fetch",
                self.schema.name()
            );
        }
    }
}
