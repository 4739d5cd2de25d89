// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Garbage collector implementation

use super::plan::{plan_purge, PurgePlan};
use super::GcPolicy;
use crate::error::CatalogResult;
use crate::model::CatalogId;
use crate::store::{MetadataStore, ReadPoint, Transaction};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of a collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcResult {
    pub catalogs_collected: u64,
    pub model_versions_purged: u64,
    pub data_versions_purged: u64,
    pub comments_purged: u64,
    pub annotations_purged: u64,
    pub pseudo_keys_purged: u64,
    pub pseudo_foreign_keys_purged: u64,
    /// Catalogs left for the next pass, with the reason
    pub skipped: Vec<(CatalogId, String)>,
}

impl GcResult {
    fn from_plan(plan: &PurgePlan) -> Self {
        Self {
            catalogs_collected: 1,
            model_versions_purged: plan.model_versions.len() as u64,
            data_versions_purged: plan.data_version_count() as u64,
            comments_purged: plan.orphans.comments.len() as u64,
            annotations_purged: plan.orphans.annotations.len() as u64,
            pseudo_keys_purged: plan.orphans.pseudo_keys.len() as u64,
            pseudo_foreign_keys_purged: plan.orphans.pseudo_foreign_keys.len() as u64,
            skipped: Vec::new(),
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.catalogs_collected += other.catalogs_collected;
        self.model_versions_purged += other.model_versions_purged;
        self.data_versions_purged += other.data_versions_purged;
        self.comments_purged += other.comments_purged;
        self.annotations_purged += other.annotations_purged;
        self.pseudo_keys_purged += other.pseudo_keys_purged;
        self.pseudo_foreign_keys_purged += other.pseudo_foreign_keys_purged;
        self.skipped.extend(other.skipped);
    }

    /// Total rows purged across all kinds
    pub fn total_purged(&self) -> u64 {
        self.model_versions_purged
            + self.data_versions_purged
            + self.comments_purged
            + self.annotations_purged
            + self.pseudo_keys_purged
            + self.pseudo_foreign_keys_purged
    }

    pub fn has_skips(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Purges superseded version rows and orphaned metadata
///
/// Each catalog is collected in its own transaction, based on the snapshot
/// its rows were read at. A failure on one catalog (timeout, conflicting
/// model change, catalog dropped mid-pass) skips that catalog only.
///
/// # Example
///
/// ```rust,ignore
/// let collector = GarbageCollector::new(store, GcPolicy::default());
/// let plan = collector.plan(&CatalogId::from("1"))?;
/// let result = collector.run_once()?;
/// ```
pub struct GarbageCollector {
    store: Arc<dyn MetadataStore>,
    policy: GcPolicy,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn MetadataStore>, policy: GcPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &GcPolicy {
        &self.policy
    }

    /// What a pass would purge from `catalog` right now
    pub fn plan(&self, catalog: &CatalogId) -> CatalogResult<PurgePlan> {
        let xmin = self.store.current_xmin()?;
        let state = self.store.read(catalog, ReadPoint::Latest)?;
        Ok(plan_purge(catalog, state.snapshot, &state.rows, xmin))
    }

    /// Collect one catalog in a single transaction
    pub fn collect_catalog(&self, catalog: &CatalogId) -> CatalogResult<GcResult> {
        let plan = self.plan(catalog)?;
        let result = GcResult::from_plan(&plan);
        if plan.is_empty() || self.policy.dry_run {
            return Ok(result);
        }
        let txn = Transaction::new(catalog.clone(), plan.statements()).based_on(plan.snapshot);
        let committed = self.store.execute(txn)?;
        log::debug!(
            "Catalog {} collected at {} (xmin {}): {} rows purged",
            catalog,
            committed,
            plan.xmin,
            result.total_purged()
        );
        Ok(result)
    }

    /// One pass over every catalog
    ///
    /// Only a failure to list catalogs fails the pass; per-catalog failures
    /// are logged and reported in `GcResult::skipped`.
    pub fn run_once(&self) -> CatalogResult<GcResult> {
        let start = Instant::now();
        let mut result = GcResult::default();
        let catalogs = self.store.list_catalogs()?;

        log::info!(
            "Starting garbage collection over {} catalogs (dry_run={})",
            catalogs.len(),
            self.policy.dry_run
        );

        for catalog in &catalogs {
            match self.collect_catalog(catalog) {
                Ok(collected) => result.merge(collected),
                Err(e) => {
                    log::warn!("Garbage collection skipped catalog {}: {}", catalog, e);
                    result.skipped.push((catalog.clone(), e.to_string()));
                }
            }
        }

        log::info!(
            "Garbage collection finished in {:.3}s: {} model versions, {} data versions, \
             {} comments, {} annotations, {} pseudo keys, {} pseudo foreign keys purged; {} skipped",
            start.elapsed().as_secs_f64(),
            result.model_versions_purged,
            result.data_versions_purged,
            result.comments_purged,
            result.annotations_purged,
            result.pseudo_keys_purged,
            result.pseudo_foreign_keys_purged,
            result.skipped.len()
        );
        Ok(result)
    }
}
