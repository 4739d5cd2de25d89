// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed references to catalog resources

use super::path::{encode_name, encode_list};
use crate::model::{CatalogId, MetadataTarget, TableName};
use serde::Serialize;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Ordered column list whose identity is its set of names
///
/// The textual order is kept for re-serializing the resource name, but two
/// lists with the same members compare equal.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ColumnList(Vec<String>);

impl ColumnList {
    pub fn new(columns: Vec<String>) -> Self {
        ColumnList(columns)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn members(&self) -> BTreeSet<&String> {
        self.0.iter().collect()
    }
}

impl PartialEq for ColumnList {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.members() == other.members()
    }
}

impl Eq for ColumnList {}

impl Hash for ColumnList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members().hash(state);
    }
}

/// Foreign key column pairing, identified by its set of pairs
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ColumnMapping(Vec<(String, String)>);

impl ColumnMapping {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        ColumnMapping(pairs)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn from_columns(&self) -> Vec<String> {
        self.0.iter().map(|(from, _)| from.clone()).collect()
    }

    pub fn to_columns(&self) -> Vec<String> {
        self.0.iter().map(|(_, to)| to.clone()).collect()
    }

    fn members(&self) -> BTreeSet<&(String, String)> {
        self.0.iter().collect()
    }
}

impl PartialEq for ColumnMapping {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.members() == other.members()
    }
}

impl Eq for ColumnMapping {}

impl Hash for ColumnMapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members().hash(state);
    }
}

/// A resolved resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    Catalog {
        catalog: CatalogId,
    },
    Schema {
        catalog: CatalogId,
        schema: String,
    },
    Table {
        catalog: CatalogId,
        table: TableName,
    },
    Column {
        catalog: CatalogId,
        table: TableName,
        column: String,
    },
    Key {
        catalog: CatalogId,
        table: TableName,
        columns: ColumnList,
    },
    ForeignKey {
        catalog: CatalogId,
        table: TableName,
        mapping: ColumnMapping,
        referenced: TableName,
    },
    Annotation {
        subject: Box<Reference>,
        key: String,
    },
    Comment {
        subject: Box<Reference>,
    },
}

/// Result of resolving a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    One(Reference),
    /// Listing forms and partially specified foreign keys
    Many(Vec<Reference>),
}

impl Resolution {
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Resolution::One(r) => vec![r],
            Resolution::Many(refs) => refs.iter().collect(),
        }
    }

    pub fn into_references(self) -> Vec<Reference> {
        match self {
            Resolution::One(r) => vec![r],
            Resolution::Many(refs) => refs,
        }
    }

    /// The single reference, if this is not a listing
    ///
    /// A listing with one member is still a listing.
    pub fn single(self) -> Option<Reference> {
        match self {
            Resolution::One(r) => Some(r),
            Resolution::Many(_) => None,
        }
    }
}

impl Reference {
    pub fn catalog(&self) -> &CatalogId {
        match self {
            Reference::Catalog { catalog }
            | Reference::Schema { catalog, .. }
            | Reference::Table { catalog, .. }
            | Reference::Column { catalog, .. }
            | Reference::Key { catalog, .. }
            | Reference::ForeignKey { catalog, .. } => catalog,
            Reference::Annotation { subject, .. } | Reference::Comment { subject } => {
                subject.catalog()
            }
        }
    }

    /// The object a comment or annotation hangs off; the object itself otherwise
    pub fn subject(&self) -> &Reference {
        match self {
            Reference::Annotation { subject, .. } | Reference::Comment { subject } => subject,
            other => other,
        }
    }

    /// Metadata row address of this (non-metadata) object
    pub fn metadata_target(&self) -> MetadataTarget {
        match self.subject() {
            Reference::Catalog { .. } => MetadataTarget::Catalog,
            Reference::Schema { schema, .. } => MetadataTarget::schema(schema.as_str()),
            Reference::Table { table, .. } => MetadataTarget::table(table.clone()),
            Reference::Column { table, column, .. } => {
                MetadataTarget::column(table.clone(), column.as_str())
            }
            Reference::Key { table, columns, .. } => {
                MetadataTarget::key(table.clone(), columns.as_slice())
            }
            Reference::ForeignKey {
                table,
                mapping,
                referenced,
                ..
            } => MetadataTarget::foreign_key(table.clone(), mapping.pairs(), referenced.clone()),
            Reference::Annotation { .. } | Reference::Comment { .. } => MetadataTarget::Catalog,
        }
    }

    /// Canonical resource name; resolving it yields this reference again
    pub fn to_path(&self) -> String {
        match self {
            Reference::Catalog { catalog } => format!("/catalog/{}", encode_name(catalog.as_str())),
            Reference::Schema { catalog, schema } => format!(
                "/catalog/{}/schema/{}",
                encode_name(catalog.as_str()),
                encode_name(schema)
            ),
            Reference::Table { catalog, table } => table_path(catalog, table),
            Reference::Column {
                catalog,
                table,
                column,
            } => format!("{}/column/{}", table_path(catalog, table), encode_name(column)),
            Reference::Key {
                catalog,
                table,
                columns,
            } => format!(
                "{}/key/{}",
                table_path(catalog, table),
                encode_list(columns.as_slice())
            ),
            Reference::ForeignKey {
                catalog,
                table,
                mapping,
                referenced,
            } => format!(
                "{}/foreignkey/{}/reference/{}:{}/{}",
                table_path(catalog, table),
                encode_list(&mapping.from_columns()),
                encode_name(&referenced.schema),
                encode_name(&referenced.table),
                encode_list(&mapping.to_columns())
            ),
            Reference::Annotation { subject, key } => {
                format!("{}/annotation/{}", subject.to_path(), encode_name(key))
            }
            Reference::Comment { subject } => format!("{}/comment", subject.to_path()),
        }
    }
}

fn table_path(catalog: &CatalogId, table: &TableName) -> String {
    format!(
        "/catalog/{}/schema/{}/table/{}",
        encode_name(catalog.as_str()),
        encode_name(&table.schema),
        encode_name(&table.table)
    )
}
