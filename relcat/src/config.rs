// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Service configuration

use crate::error::{CatalogError, CatalogResult};
use crate::gc::GcPolicy;
use crate::model::MAX_IDENTIFIER_BYTES;
use crate::store::kv::StorageType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generated constraint names need room for a hash suffix
const MIN_IDENTIFIER_BYTES: usize = 16;

/// Top-level configuration, loadable from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub gc: GcPolicy,
}

/// Where and how catalog state is persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub storage_type: StorageType,

    /// Database directory (ignored by the memory backend)
    pub path: PathBuf,

    /// How long a store call waits for the store lock before timing out
    pub lock_timeout_ms: u64,
}

/// Model registry behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Reject plain tables created without any key
    pub require_primary_keys: bool,

    /// Longest accepted identifier, in UTF-8 bytes
    pub max_identifier_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sled,
            path: PathBuf::from("./relcat_data"),
            lock_timeout_ms: Self::DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl StorageConfig {
    pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

    /// Volatile storage for tests and experiments
    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            ..Self::default()
        }
    }

    pub fn sled(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_type: StorageType::Sled,
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            require_primary_keys: false,
            max_identifier_bytes: MAX_IDENTIFIER_BYTES,
        }
    }
}

impl RegistryConfig {
    /// Every plain table must declare a key
    pub fn strict() -> Self {
        Self {
            require_primary_keys: true,
            ..Self::default()
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> CatalogResult<Self> {
        let config: ServiceConfig = serde_json::from_str(text)
            .map_err(|e| CatalogError::Configuration(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.registry.max_identifier_bytes < MIN_IDENTIFIER_BYTES
            || self.registry.max_identifier_bytes > MAX_IDENTIFIER_BYTES
        {
            return Err(CatalogError::Configuration(format!(
                "max_identifier_bytes must be between {} and {}",
                MIN_IDENTIFIER_BYTES, MAX_IDENTIFIER_BYTES
            )));
        }
        if let Some(msg) = self.gc.validate() {
            return Err(CatalogError::Configuration(msg));
        }
        Ok(())
    }
}
