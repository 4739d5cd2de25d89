// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog model
//!
//! The in-memory relational model of one catalog as of one snapshot:
//! schemas, tables, columns, keys, foreign keys, comments and annotations.

pub mod graph;
pub mod ids;
pub mod snapshot;
pub mod target;

pub use graph::{
    Annotations, Column, ConstraintKind, ForeignKey, Key, ModelGraph, Schema, Table, TableKind,
};
pub use ids::{CatalogId, SnapshotId, TableName};
pub use snapshot::ModelSnapshot;
pub use target::MetadataTarget;

/// Longest identifier accepted for schemas, tables, columns and constraints
pub const MAX_IDENTIFIER_BYTES: usize = 63;
