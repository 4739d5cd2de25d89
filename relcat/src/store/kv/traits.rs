// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits

use super::{KvResult, StorageType};
use std::sync::Arc;

/// One write in an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A named collection of key-value pairs
pub trait KvTree: Send + Sync {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// All pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every operation or none of them
    fn apply_batch(&self, ops: &[KvOp]) -> KvResult<()>;

    fn flush(&self) -> KvResult<()>;
}

pub trait KvDriver: Send + Sync {
    fn open_tree(&self, name: &str) -> KvResult<Arc<dyn KvTree>>;

    fn storage_type(&self) -> StorageType;

    fn flush(&self) -> KvResult<()>;
}
