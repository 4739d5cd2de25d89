// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver factory

use super::memory::MemoryDriver;
use super::traits::KvDriver;
#[cfg(not(feature = "sled-backend"))]
use super::KvError;
use super::{KvResult, StorageType};
use std::path::Path;
use std::sync::Arc;

/// Create the storage driver selected by `storage_type`
///
/// The path is ignored by the memory driver.
pub fn create_kv_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> KvResult<Arc<dyn KvDriver>> {
    match storage_type {
        StorageType::Memory => {
            let driver: Arc<dyn KvDriver> = Arc::new(MemoryDriver::new());
            Ok(driver)
        }
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            let driver: Arc<dyn KvDriver> = Arc::new(super::sled::SledDriver::open(path)?);
            Ok(driver)
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            let _ = path;
            Err(KvError::Unsupported(
                "relcat was built without the sled-backend feature".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::KvOp;
    use tempfile::TempDir;

    #[test]
    fn test_create_memory_driver() {
        let driver = create_kv_driver(StorageType::Memory, "unused").unwrap();
        assert_eq!(driver.storage_type(), StorageType::Memory);
    }

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_sled_driver_persists_batches() {
        let temp_dir = TempDir::new().unwrap();
        {
            let driver = create_kv_driver(StorageType::Sled, temp_dir.path()).unwrap();
            let tree = driver.open_tree("state").unwrap();
            tree.apply_batch(&[KvOp::Put(b"k".to_vec(), b"v".to_vec())])
                .unwrap();
            driver.flush().unwrap();
        }
        let driver = create_kv_driver(StorageType::Sled, temp_dir.path()).unwrap();
        let tree = driver.open_tree("state").unwrap();
        assert_eq!(tree.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
