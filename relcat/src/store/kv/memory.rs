// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver

use super::traits::{KvDriver, KvOp, KvTree};
use super::{KvResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
pub struct MemoryDriver {
    trees: RwLock<HashMap<String, Arc<MemoryTree>>>,
}

#[derive(Default)]
pub struct MemoryTree {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvTree for MemoryTree {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let data = self.data.read();
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply_batch(&self, ops: &[KvOp]) -> KvResult<()> {
        let mut data = self.data.write();
        for op in ops {
            match op {
                KvOp::Put(key, value) => {
                    data.insert(key.clone(), value.clone());
                }
                KvOp::Delete(key) => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> KvResult<()> {
        Ok(())
    }
}

impl KvDriver for MemoryDriver {
    fn open_tree(&self, name: &str) -> KvResult<Arc<dyn KvTree>> {
        let mut trees = self.trees.write();
        let tree: Arc<dyn KvTree> = trees.entry(name.to_string()).or_default().clone();
        Ok(tree)
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }

    fn flush(&self) -> KvResult<()> {
        Ok(())
    }
}
