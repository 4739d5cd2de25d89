// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Purge planning
//!
//! Pure functions from one committed catalog state and `xmin` to the rows a
//! collection pass deletes.

use crate::model::{CatalogId, SnapshotId, TableName};
use crate::store::{find_orphans, CatalogRows, Orphans, Statement};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows one pass over a catalog will delete
#[derive(Debug, Clone, Serialize)]
pub struct PurgePlan {
    pub catalog: CatalogId,
    /// Snapshot the rows were read at; the purge commits only if the model
    /// has not changed since
    pub snapshot: SnapshotId,
    pub xmin: SnapshotId,
    pub model_versions: Vec<SnapshotId>,
    pub data_versions: BTreeMap<TableName, Vec<SnapshotId>>,
    #[serde(skip)]
    pub orphans: Orphans,
}

impl PurgePlan {
    pub fn is_empty(&self) -> bool {
        self.model_versions.is_empty() && self.data_versions.is_empty() && self.orphans.is_empty()
    }

    pub fn data_version_count(&self) -> usize {
        self.data_versions.values().map(Vec::len).sum()
    }

    /// Statements that carry out the plan in one transaction
    pub fn statements(&self) -> Vec<Statement> {
        let mut statements = Vec::new();
        if !self.model_versions.is_empty() {
            statements.push(Statement::DeleteModelVersions {
                snapshots: self.model_versions.clone(),
            });
        }
        for (table, snapshots) in &self.data_versions {
            statements.push(Statement::DeleteDataVersions {
                table: table.clone(),
                snapshots: snapshots.clone(),
            });
        }
        if !self.orphans.is_empty() {
            statements.push(Statement::PurgeOrphans);
        }
        statements
    }
}

/// Version rows that no reader at or after `xmin` can need
///
/// Keeps the newest version below `xmin` and everything from there on, so
/// the most recent row always survives.
pub fn superseded_versions(versions: &[SnapshotId], xmin: SnapshotId) -> Vec<SnapshotId> {
    let Some(floor) = versions.iter().copied().filter(|v| *v < xmin).max() else {
        return Vec::new();
    };
    let mut purged: Vec<SnapshotId> = versions.iter().copied().filter(|v| *v < floor).collect();
    purged.sort();
    purged.dedup();
    purged
}

pub fn plan_purge(
    catalog: &CatalogId,
    snapshot: SnapshotId,
    rows: &CatalogRows,
    xmin: SnapshotId,
) -> PurgePlan {
    let model: Vec<SnapshotId> = rows.model_versions.iter().map(|r| r.snapshot).collect();

    let mut per_table: BTreeMap<TableName, Vec<SnapshotId>> = BTreeMap::new();
    for row in &rows.data_versions {
        per_table
            .entry(row.table.clone())
            .or_default()
            .push(row.snapshot);
    }
    let mut data_versions = BTreeMap::new();
    for (table, versions) in per_table {
        let purged = if rows.table(&table).is_none() {
            // the table is gone, so is every version of its data
            let mut all = versions;
            all.sort();
            all.dedup();
            all
        } else {
            superseded_versions(&versions, xmin)
        };
        if !purged.is_empty() {
            data_versions.insert(table, purged);
        }
    }

    PurgePlan {
        catalog: catalog.clone(),
        snapshot,
        xmin,
        model_versions: superseded_versions(&model, xmin),
        data_versions,
        orphans: find_orphans(rows),
    }
}
