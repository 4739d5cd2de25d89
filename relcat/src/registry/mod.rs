// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Model registry - the catalog service's entry point for model access
//!
//! The registry hands out immutable [`ModelSnapshot`]s, one cached per
//! catalog, and replaces a cached snapshot wholesale when the store reports a
//! newer model version. Readers holding an older `Arc` keep a consistent view
//! until they drop it.
//!
//! Mutations are planned against a freshly introspected snapshot, authorized,
//! and committed as one store transaction based on that snapshot. A concurrent
//! model change between planning and commit surfaces as
//! [`CatalogError::ConcurrentModification`].

pub mod mutation;
pub mod naming;
pub mod plan;
pub mod representation;

pub use mutation::{ColumnDef, ForeignKeyDef, KeyDef, Mutation, TableDef};

use crate::authz::{require, Action, Authorizer, Principal};
use crate::config::RegistryConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{CatalogId, ModelSnapshot, SnapshotId};
use crate::resolver::{parse, resolve, Reference, Resolution};
use crate::store::{MetadataStore, ReadPoint, Transaction};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ModelRegistry {
    store: Arc<dyn MetadataStore>,
    authorizer: Arc<dyn Authorizer>,
    config: RegistryConfig,
    snapshots: RwLock<HashMap<CatalogId, Arc<ModelSnapshot>>>,
}

impl ModelRegistry {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        authorizer: Arc<dyn Authorizer>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            authorizer,
            config,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn list_catalogs(&self) -> CatalogResult<Vec<CatalogId>> {
        Ok(self.store.list_catalogs()?)
    }

    /// Create an empty catalog
    ///
    /// # Returns
    /// * `Ok(SnapshotId)` - the catalog's first model version
    /// * `Err(CatalogError::InvalidModel)` if the catalog already exists
    /// * `Err(CatalogError::Forbidden)` if `principal` may not create it
    pub fn create_catalog(
        &self,
        principal: &Principal,
        catalog: &CatalogId,
    ) -> CatalogResult<SnapshotId> {
        let object = Reference::Catalog {
            catalog: catalog.clone(),
        };
        require(self.authorizer.as_ref(), principal, &object, Action::Create)?;
        let version = self.store.create_catalog(catalog)?;
        log::info!("Catalog {} created by {} at version {}", catalog, principal, version);
        Ok(version)
    }

    /// Drop a catalog with its whole history
    pub fn drop_catalog(&self, principal: &Principal, catalog: &CatalogId) -> CatalogResult<()> {
        let object = Reference::Catalog {
            catalog: catalog.clone(),
        };
        require(self.authorizer.as_ref(), principal, &object, Action::Drop)?;
        self.store.drop_catalog(catalog)?;
        self.invalidate(catalog);
        log::info!("Catalog {} dropped by {}", catalog, principal);
        Ok(())
    }

    /// Current model snapshot of `catalog`
    ///
    /// Returns the cached snapshot while its model version is still the
    /// newest one in the store; re-introspects otherwise.
    ///
    /// # Returns
    /// * `Err(CatalogError::NotFound)` if the catalog does not exist
    /// * `Err(CatalogError::StoreUnavailable)` if the store cannot be read
    pub fn load(&self, catalog: &CatalogId) -> CatalogResult<Arc<ModelSnapshot>> {
        let cached = self.snapshots.read().get(catalog).cloned();
        let current = self.store.model_version(catalog, ReadPoint::Latest)?;
        if let Some(snapshot) = cached {
            if snapshot.version() == current {
                return Ok(snapshot);
            }
            log::debug!(
                "Model of catalog {} moved from {} to {}",
                catalog,
                snapshot.version(),
                current
            );
        }
        self.refresh(catalog)
    }

    /// Model snapshot of `catalog` as of `snapshot`; never cached
    pub fn load_at(
        &self,
        catalog: &CatalogId,
        snapshot: SnapshotId,
    ) -> CatalogResult<Arc<ModelSnapshot>> {
        let graph = self.store.introspect(catalog, ReadPoint::At(snapshot))?;
        Ok(Arc::new(ModelSnapshot::new(graph)))
    }

    /// Introspect the latest model and swap it into the cache
    pub fn refresh(&self, catalog: &CatalogId) -> CatalogResult<Arc<ModelSnapshot>> {
        let graph = self.store.introspect(catalog, ReadPoint::Latest)?;
        let fresh = Arc::new(ModelSnapshot::new(graph));
        let mut snapshots = self.snapshots.write();
        match snapshots.get(catalog) {
            // already cached at this snapshot, or a concurrent refresh
            // installed something newer
            Some(existing) if existing.snapshot() >= fresh.snapshot() => Ok(existing.clone()),
            _ => {
                snapshots.insert(catalog.clone(), fresh.clone());
                log::debug!(
                    "Cached model of catalog {} at snapshot {} (version {})",
                    catalog,
                    fresh.snapshot(),
                    fresh.version()
                );
                Ok(fresh)
            }
        }
    }

    pub fn invalidate(&self, catalog: &CatalogId) {
        self.snapshots.write().remove(catalog);
    }

    /// Resolve `path` against the current model of the catalog it names
    pub fn resolve(&self, path: &str) -> CatalogResult<Resolution> {
        let parsed = parse(path)?;
        let snapshot = self.load(&parsed.catalog)?;
        resolve(&snapshot, &parsed)
    }

    /// Resolve `path` against the model as of `snapshot`
    pub fn resolve_at(&self, path: &str, snapshot: SnapshotId) -> CatalogResult<Resolution> {
        let parsed = parse(path)?;
        let model = self.load_at(&parsed.catalog, snapshot)?;
        resolve(&model, &parsed)
    }

    /// JSON representation of the resource(s) at `path`
    ///
    /// # Arguments
    /// * `principal` - must be allowed to enumerate every resolved resource
    /// * `path` - resource path, listing forms included
    /// * `at` - historical snapshot to read; the current model when `None`
    pub fn describe(
        &self,
        principal: &Principal,
        path: &str,
        at: Option<SnapshotId>,
    ) -> CatalogResult<serde_json::Value> {
        let parsed = parse(path)?;
        let snapshot = match at {
            Some(s) => self.load_at(&parsed.catalog, s)?,
            None => self.load(&parsed.catalog)?,
        };
        let resolution = resolve(&snapshot, &parsed)?;
        for reference in resolution.references() {
            require(self.authorizer.as_ref(), principal, reference, Action::Enumerate)?;
        }
        representation::render(&snapshot, &resolution)
    }

    /// Comment text at a `.../comment` path
    pub fn read_comment(&self, principal: &Principal, path: &str) -> CatalogResult<String> {
        match self.describe_single(principal, path)? {
            (Reference::Comment { .. }, serde_json::Value::String(text)) => Ok(text),
            (other, _) => Err(CatalogError::MalformedName(format!(
                "{} is not a comment resource",
                other.to_path()
            ))),
        }
    }

    /// Annotation document at a `.../annotation/<key>` path
    pub fn read_annotation(
        &self,
        principal: &Principal,
        path: &str,
    ) -> CatalogResult<serde_json::Value> {
        match self.describe_single(principal, path)? {
            (Reference::Annotation { .. }, document) => Ok(document),
            (other, _) => Err(CatalogError::MalformedName(format!(
                "{} is not an annotation resource",
                other.to_path()
            ))),
        }
    }

    fn describe_single(
        &self,
        principal: &Principal,
        path: &str,
    ) -> CatalogResult<(Reference, serde_json::Value)> {
        let parsed = parse(path)?;
        if parsed.is_listing() {
            return Err(CatalogError::MalformedName(format!(
                "{} is a listing, not a single resource",
                path
            )));
        }
        let snapshot = self.load(&parsed.catalog)?;
        let reference = resolve(&snapshot, &parsed)?.single().ok_or_else(|| {
            CatalogError::MalformedName(format!("{} names more than one resource", path))
        })?;
        require(self.authorizer.as_ref(), principal, &reference, Action::Enumerate)?;
        let document = representation::render_reference(&snapshot, &reference)?;
        Ok((reference, document))
    }

    /// Apply one model mutation
    ///
    /// The mutation is validated and authorized before anything is written;
    /// on any error the model is left untouched.
    ///
    /// # Returns
    /// * `Ok(SnapshotId)` - the new model version
    /// * `Err(CatalogError::ConcurrentModification)` if another model change
    ///   committed after this one was planned
    pub fn mutate(
        &self,
        principal: &Principal,
        catalog: &CatalogId,
        mutation: &Mutation,
    ) -> CatalogResult<SnapshotId> {
        let snapshot = self.refresh(catalog)?;
        let (object, action) = plan::authorization_target(&snapshot, mutation)?;
        require(self.authorizer.as_ref(), principal, &object, action)?;
        let statements = plan::plan_mutation(&snapshot, mutation, &self.config)?;

        let txn = Transaction::new(catalog.clone(), statements).based_on(snapshot.snapshot());
        let version = self.store.execute(txn).map_err(|e| {
            log::warn!("{} on catalog {} failed: {}", mutation.name(), catalog, e);
            CatalogError::from(e)
        })?;
        self.invalidate(catalog);
        log::info!(
            "{} on catalog {} by {} committed as version {}",
            mutation.name(),
            catalog,
            principal,
            version
        );
        Ok(version)
    }
}
