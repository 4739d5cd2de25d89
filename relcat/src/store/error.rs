// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metadata store adapter errors

use super::kv::KvError;
use crate::model::{CatalogId, SnapshotId};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("unknown catalog {0}")]
    UnknownCatalog(CatalogId),

    #[error("catalog {0} already exists")]
    CatalogExists(CatalogId),

    #[error("snapshot {0} is no longer retained")]
    SnapshotExpired(SnapshotId),

    #[error("snapshot {0} has not been committed yet")]
    UnknownSnapshot(SnapshotId),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<KvError> for StoreError {
    fn from(err: KvError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Unavailable(format!("corrupt catalog state: {}", err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shorthand for a constraint violation
pub(crate) fn violation(msg: impl Into<String>) -> StoreError {
    StoreError::ConstraintViolation(msg.into())
}
