// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Addressing of comment and annotation rows
//!
//! Metadata rows live beside the native catalog and point at the object they
//! describe by name. Constraint targets are stored in canonical (sorted) form
//! so that two spellings of the same column set address the same row.

use super::ids::TableName;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetadataTarget {
    Catalog,
    Schema {
        schema: String,
    },
    Table {
        table: TableName,
    },
    Column {
        table: TableName,
        column: String,
    },
    Key {
        table: TableName,
        columns: Vec<String>,
    },
    ForeignKey {
        table: TableName,
        pairs: Vec<(String, String)>,
        referenced: TableName,
    },
}

impl MetadataTarget {
    pub fn schema(schema: impl Into<String>) -> Self {
        MetadataTarget::Schema {
            schema: schema.into(),
        }
    }

    pub fn table(table: TableName) -> Self {
        MetadataTarget::Table { table }
    }

    pub fn column(table: TableName, column: impl Into<String>) -> Self {
        MetadataTarget::Column {
            table,
            column: column.into(),
        }
    }

    pub fn key(table: TableName, columns: &[String]) -> Self {
        let mut columns = columns.to_vec();
        columns.sort();
        MetadataTarget::Key { table, columns }
    }

    pub fn foreign_key(
        table: TableName,
        pairs: &[(String, String)],
        referenced: TableName,
    ) -> Self {
        let mut pairs = pairs.to_vec();
        pairs.sort();
        MetadataTarget::ForeignKey {
            table,
            pairs,
            referenced,
        }
    }

    /// Schema the target belongs to, if any
    pub fn schema_name(&self) -> Option<&str> {
        match self {
            MetadataTarget::Catalog => None,
            MetadataTarget::Schema { schema } => Some(schema),
            MetadataTarget::Table { table }
            | MetadataTarget::Column { table, .. }
            | MetadataTarget::Key { table, .. }
            | MetadataTarget::ForeignKey { table, .. } => Some(&table.schema),
        }
    }
}

impl fmt::Display for MetadataTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataTarget::Catalog => write!(f, "catalog"),
            MetadataTarget::Schema { schema } => write!(f, "schema {}", schema),
            MetadataTarget::Table { table } => write!(f, "table {}", table),
            MetadataTarget::Column { table, column } => write!(f, "column {}:{}", table, column),
            MetadataTarget::Key { table, columns } => {
                write!(f, "key {}({})", table, columns.join(","))
            }
            MetadataTarget::ForeignKey {
                table,
                pairs,
                referenced,
            } => {
                let from: Vec<&str> = pairs.iter().map(|(c, _)| c.as_str()).collect();
                let to: Vec<&str> = pairs.iter().map(|(_, c)| c.as_str()).collect();
                write!(
                    f,
                    "foreign key {}({}) -> {}({})",
                    table,
                    from.join(","),
                    referenced,
                    to.join(",")
                )
            }
        }
    }
}
