// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Column resolution inside a data context
//!
//! A data request binds a sequence of tables, optionally under aliases. A
//! column name resolves against a bound alias first, then against an explicit
//! `table:column` or `schema:table:column` qualifier, and otherwise against
//! the current (most recently bound) table.

use super::path::{percent_decode, TableRef};
use super::reference::Reference;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{ModelSnapshot, Table, TableName};

#[derive(Debug, Clone)]
struct Binding {
    alias: Option<String>,
    table: TableName,
}

pub struct DataContext<'s> {
    snapshot: &'s ModelSnapshot,
    bindings: Vec<Binding>,
}

impl<'s> DataContext<'s> {
    pub fn new(snapshot: &'s ModelSnapshot) -> Self {
        Self {
            snapshot,
            bindings: Vec::new(),
        }
    }

    /// Bind a table, making it the current table
    pub fn bind(&mut self, table: &TableRef, alias: Option<&str>) -> CatalogResult<&'s Table> {
        if let Some(alias) = alias {
            if self.bindings.iter().any(|b| b.alias.as_deref() == Some(alias)) {
                return Err(CatalogError::MalformedName(format!(
                    "alias {} is already bound",
                    alias
                )));
            }
        }
        let found = self
            .snapshot
            .lookup_table(table.schema.as_deref(), &table.table)?;
        self.bindings.push(Binding {
            alias: alias.map(str::to_string),
            table: found.name.clone(),
        });
        Ok(found)
    }

    /// Resolve a raw (percent-encoded) column name
    pub fn resolve_column(&self, raw: &str) -> CatalogResult<Reference> {
        let parts = raw
            .split(':')
            .map(|p| -> CatalogResult<String> {
                let decoded = percent_decode(p).ok_or_else(|| {
                    CatalogError::MalformedName(format!("{}: invalid percent-encoding", raw))
                })?;
                if decoded.is_empty() {
                    return Err(CatalogError::MalformedName(format!("{}: empty name", raw)));
                }
                Ok(decoded)
            })
            .collect::<CatalogResult<Vec<String>>>()?;

        let (table, column) = match parts.as_slice() {
            [column] => (self.current()?, column),
            [qualifier, column] => match self.aliased(qualifier) {
                Some(table) => (table, column),
                None => (self.bound_table(None, qualifier)?, column),
            },
            [schema, table, column] => (self.bound_table(Some(schema), table)?, column),
            _ => {
                return Err(CatalogError::MalformedName(format!(
                    "{}: expected column, table:column or schema:table:column",
                    raw
                )))
            }
        };

        let t = self.snapshot.table(table)?;
        let c = t
            .column(column)
            .ok_or_else(|| CatalogError::NotFound(format!("column {}:{}", table, column)))?;
        Ok(Reference::Column {
            catalog: self.snapshot.catalog().clone(),
            table: t.name.clone(),
            column: c.name.clone(),
        })
    }

    fn current(&self) -> CatalogResult<&TableName> {
        self.bindings
            .last()
            .map(|b| &b.table)
            .ok_or_else(|| CatalogError::NotFound("no table is bound in this context".to_string()))
    }

    fn aliased(&self, alias: &str) -> Option<&TableName> {
        self.bindings
            .iter()
            .find(|b| b.alias.as_deref() == Some(alias))
            .map(|b| &b.table)
    }

    /// A bound table by name; unqualified names must be unique among bindings
    fn bound_table(&self, schema: Option<&String>, table: &str) -> CatalogResult<&TableName> {
        let mut candidates: Vec<&TableName> = self
            .bindings
            .iter()
            .map(|b| &b.table)
            .filter(|t| t.table == table && schema.map_or(true, |s| &t.schema == s))
            .collect();
        candidates.sort();
        candidates.dedup();
        match candidates.as_slice() {
            [] => Err(CatalogError::NotFound(format!(
                "table {} is not bound in this context",
                table
            ))),
            [only] => Ok(*only),
            _ => Err(CatalogError::AmbiguousName(format!(
                "table {} is bound from several schemas; qualify it as schema:table",
                table
            ))),
        }
    }
}
