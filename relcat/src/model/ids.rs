// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identifier newtypes shared across the catalog core

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn new(id: impl Into<String>) -> Self {
        CatalogId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CatalogId {
    fn from(id: &str) -> Self {
        CatalogId(id.to_string())
    }
}

impl From<String> for CatalogId {
    fn from(id: String) -> Self {
        CatalogId(id)
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction-ordering token
///
/// Snapshot ids are assigned by the metadata store at commit time and are
/// strictly increasing across the whole store. A read pinned to snapshot `s`
/// observes every transaction committed with an id `<= s` and nothing else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SnapshotId(u64);

impl SnapshotId {
    pub const ZERO: SnapshotId = SnapshotId(0);

    pub fn new(id: u64) -> Self {
        SnapshotId(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        SnapshotId(self.0 + 1)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(SnapshotId)
            .map_err(|e| format!("Invalid snapshot id '{}': {}", s, e))
    }
}

/// Schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.table)
    }
}
