// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage driver

use super::traits::{KvDriver, KvOp, KvTree};
use super::{KvError, KvResult, StorageType};
use std::path::Path;
use std::sync::Arc;

pub struct SledDriver {
    db: sled::Db,
}

pub struct SledTree {
    tree: sled::Tree,
}

fn backend(e: sled::Error) -> KvError {
    KvError::Backend(e.to_string())
}

impl SledDriver {
    pub fn open<P: AsRef<Path>>(path: P) -> KvResult<Self> {
        let db = sled::open(path).map_err(backend)?;
        Ok(SledDriver { db })
    }
}

impl KvTree for SledTree {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(backend)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.tree
            .scan_prefix(prefix)
            .map(|entry| {
                entry
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(backend)
            })
            .collect()
    }

    fn apply_batch(&self, ops: &[KvOp]) -> KvResult<()> {
        let mut batch = sled::Batch::default();
        for op in ops {
            match op {
                KvOp::Put(key, value) => batch.insert(key.as_slice(), value.as_slice()),
                KvOp::Delete(key) => batch.remove(key.as_slice()),
            }
        }
        self.tree.apply_batch(batch).map_err(backend)
    }

    fn flush(&self) -> KvResult<()> {
        self.tree.flush().map_err(backend)?;
        Ok(())
    }
}

impl KvDriver for SledDriver {
    fn open_tree(&self, name: &str) -> KvResult<Arc<dyn KvTree>> {
        let tree = self.db.open_tree(name).map_err(backend)?;
        let tree: Arc<dyn KvTree> = Arc::new(SledTree { tree });
        Ok(tree)
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }

    fn flush(&self) -> KvResult<()> {
        self.db.flush().map_err(backend)?;
        Ok(())
    }
}
