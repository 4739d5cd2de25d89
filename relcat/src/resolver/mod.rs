// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Name resolver
//!
//! Turns hierarchical resource paths into typed references against a model
//! snapshot. Parsing and resolution are pure in-memory work.

pub mod context;
pub mod path;
pub mod reference;
pub mod resolve;

pub use context::DataContext;
pub use path::{parse, Facet, ObjectPath, ResourcePath, TableRef};
pub use reference::{ColumnList, ColumnMapping, Reference, Resolution};
pub use resolve::{locate, resolve, ObjectRef};

use crate::error::CatalogResult;
use crate::model::ModelSnapshot;

/// Parse and resolve `path` against `snapshot`
pub fn resolve_path(snapshot: &ModelSnapshot, path: &str) -> CatalogResult<Resolution> {
    let parsed = parse(path)?;
    resolve(snapshot, &parsed)
}
