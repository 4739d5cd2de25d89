// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metadata store adapter
//!
//! The only component that knows how catalog state is stored. Everything
//! above it works on `ModelGraph`s, `CatalogRows` and `Statement`s, and every
//! read names its read point explicitly.

pub mod error;
pub mod introspect;
pub mod kv;
pub mod liveness;
pub mod mvcc;
pub mod pin;
pub mod rows;
pub mod statement;

pub use error::{StoreError, StoreResult};
pub use liveness::{find_orphans, Orphans};
pub use mvcc::MvccStore;
pub use pin::SnapshotPin;
pub use rows::{
    CatalogRows, DataVersionRow, ModelVersionRow, NativeColumn, NativeForeignKey, NativeKey,
    NativeSchema, NativeTable, PseudoForeignKeyRow, PseudoKeyRow,
};
pub use statement::{Statement, Transaction};

use crate::model::{CatalogId, ModelGraph, SnapshotId};
use std::sync::Arc;

/// Snapshot a read executes against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPoint {
    /// The newest committed state
    Latest,
    /// The state as of a given snapshot
    At(SnapshotId),
}

impl From<Option<SnapshotId>> for ReadPoint {
    fn from(snapshot: Option<SnapshotId>) -> Self {
        snapshot.map_or(ReadPoint::Latest, ReadPoint::At)
    }
}

/// Rows of one catalog as seen from a read point
#[derive(Debug, Clone)]
pub struct CatalogState {
    /// The snapshot the rows were read at
    pub snapshot: SnapshotId,
    pub rows: Arc<CatalogRows>,
}

pub trait MetadataStore: Send + Sync {
    fn list_catalogs(&self) -> StoreResult<Vec<CatalogId>>;

    /// Create an empty catalog; returns the snapshot of its first model version
    fn create_catalog(&self, catalog: &CatalogId) -> StoreResult<SnapshotId>;

    fn drop_catalog(&self, catalog: &CatalogId) -> StoreResult<()>;

    fn read(&self, catalog: &CatalogId, at: ReadPoint) -> StoreResult<CatalogState>;

    /// Apply a transaction atomically; returns its commit snapshot
    fn execute(&self, txn: Transaction) -> StoreResult<SnapshotId>;

    /// Oldest snapshot id still visible to any in-flight reader
    fn current_xmin(&self) -> StoreResult<SnapshotId>;

    /// Pin the latest committed snapshot
    fn pin(&self) -> StoreResult<SnapshotPin>;

    fn introspect(&self, catalog: &CatalogId, at: ReadPoint) -> StoreResult<ModelGraph> {
        let state = self.read(catalog, at)?;
        Ok(introspect::build_graph(catalog, state.snapshot, &state.rows))
    }

    fn model_version(&self, catalog: &CatalogId, at: ReadPoint) -> StoreResult<SnapshotId> {
        Ok(self.read(catalog, at)?.rows.model_version())
    }
}
