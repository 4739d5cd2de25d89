// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relcat - versioned, addressable relational catalog models
//!
//! Relcat exposes the relational model of a dataset (schemas, tables, columns,
//! keys, foreign keys, comments and annotations) as named resources and keeps
//! that model consistent with a transactional metadata store.
//!
//! The main entry points are:
//!
//! - [`ModelRegistry`]: load catalog snapshots, resolve resource paths,
//!   describe resources and apply model mutations.
//! - [`VersionTracker`]: current model/data versions and change sets.
//! - [`GarbageCollector`]: purge superseded version rows and orphaned metadata.
//!
//! # Example
//!
//! ```ignore
//! use relcat::{AllowAll, CatalogId, ModelRegistry, MvccStore, Principal};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MvccStore::in_memory());
//! let registry = ModelRegistry::new(store, Arc::new(AllowAll), Default::default());
//! let admin = Principal::new("admin");
//! registry.create_catalog(&admin, &CatalogId::from("1"))?;
//! let resolved = registry.resolve("/catalog/1/schema/")?;
//! ```

pub mod authz;
pub mod config;
pub mod error;
pub mod gc;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod version;

pub use authz::{Action, AllowAll, Authorizer, OwnerPolicy, Principal};
pub use config::{RegistryConfig, ServiceConfig, StorageConfig};
pub use error::{CatalogError, CatalogResult};
pub use gc::{GarbageCollector, GcPolicy, GcResult, GcScheduler};
pub use model::{
    CatalogId, ConstraintKind, ModelGraph, ModelSnapshot, SnapshotId, TableKind, TableName,
};
pub use registry::{ModelRegistry, Mutation};
pub use resolver::{DataContext, Reference, Resolution};
pub use store::{MetadataStore, MvccStore, ReadPoint};
pub use version::{ChangeSet, VersionTracker};
