// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types surfaced by the catalog core

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Malformed resource name: {0}")]
    MalformedName(String),

    #[error("Ambiguous name: {0}")]
    AmbiguousName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CatalogError {
    /// True for failures of the store collaborator rather than of the request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::StoreUnavailable(_)
                | CatalogError::Timeout(_)
                | CatalogError::ConcurrentModification(_)
        )
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownCatalog(id) => {
                CatalogError::NotFound(format!("catalog {}", id))
            }
            StoreError::SnapshotExpired(snapshot) => {
                CatalogError::NotFound(format!("snapshot {} is no longer retained", snapshot))
            }
            StoreError::UnknownSnapshot(snapshot) => {
                CatalogError::NotFound(format!("snapshot {}", snapshot))
            }
            StoreError::CatalogExists(id) => {
                CatalogError::InvalidModel(format!("catalog {} already exists", id))
            }
            StoreError::ConstraintViolation(msg) => CatalogError::InvalidModel(msg),
            StoreError::SerializationConflict(msg) => CatalogError::ConcurrentModification(msg),
            StoreError::Timeout(msg) => CatalogError::Timeout(msg),
            StoreError::Unavailable(msg) => CatalogError::StoreUnavailable(msg),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InvalidModel(format!("invalid JSON document: {}", err))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
