// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Immutable per-catalog model snapshots
//!
//! A snapshot is handed to each request and never changes afterwards. A
//! refresh builds a new `ModelSnapshot` and swaps it into the registry, so
//! requests holding the old one keep a consistent view.

use super::graph::{ModelGraph, Schema, Table};
use super::ids::{CatalogId, SnapshotId, TableName};
use crate::error::{CatalogError, CatalogResult};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    graph: Arc<ModelGraph>,
    /// Unqualified table name -> schemas containing a table of that name
    tables_by_name: HashMap<String, Vec<String>>,
}

impl ModelSnapshot {
    pub fn new(graph: ModelGraph) -> Self {
        let mut tables_by_name: HashMap<String, Vec<String>> = HashMap::new();
        for schema in graph.schemas.values() {
            for table in schema.tables.keys() {
                tables_by_name
                    .entry(table.clone())
                    .or_default()
                    .push(schema.name.clone());
            }
        }
        Self {
            graph: Arc::new(graph),
            tables_by_name,
        }
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn catalog(&self) -> &CatalogId {
        &self.graph.catalog
    }

    /// Read point this snapshot reflects
    pub fn snapshot(&self) -> SnapshotId {
        self.graph.snapshot
    }

    /// Model version current at the read point
    pub fn version(&self) -> SnapshotId {
        self.graph.version
    }

    pub fn schema(&self, name: &str) -> CatalogResult<&Schema> {
        self.graph
            .schema(name)
            .ok_or_else(|| CatalogError::NotFound(format!("schema {}", name)))
    }

    pub fn table(&self, name: &TableName) -> CatalogResult<&Table> {
        let schema = self.schema(&name.schema)?;
        schema
            .tables
            .get(&name.table)
            .ok_or_else(|| CatalogError::NotFound(format!("table {}", name)))
    }

    /// Find a table by optional schema qualifier
    ///
    /// An unqualified name resolves only when exactly one schema holds a
    /// table of that name.
    pub fn lookup_table(&self, schema: Option<&str>, table: &str) -> CatalogResult<&Table> {
        if let Some(schema) = schema {
            return self.table(&TableName::new(schema, table));
        }
        match self.tables_by_name.get(table).map(Vec::as_slice) {
            None | Some([]) => Err(CatalogError::NotFound(format!("table {}", table))),
            Some([schema]) => self.table(&TableName::new(schema.as_str(), table)),
            Some(schemas) => Err(CatalogError::AmbiguousName(format!(
                "table name {} exists in schemas {}; qualify it as schema:table",
                table,
                schemas.join(", ")
            ))),
        }
    }
}
