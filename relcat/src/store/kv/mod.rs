// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key-value persistence for committed catalog state
//!
//! ```text
//! MvccStore (catalog rows, snapshots, pins)
//!     ↓
//! KvDriver / KvTree (key-value abstraction)
//!     ↓
//! Concrete implementations (Sled, Memory)
//! ```

pub mod factory;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;

pub use factory::create_kv_driver;
pub use traits::{KvDriver, KvOp, KvTree};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Pure Rust embedded database
    #[default]
    Sled,
    /// Volatile in-process storage for tests and dry runs
    Memory,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageType::Sled),
            "memory" => Ok(StorageType::Memory),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: sled, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug)]
pub enum KvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage driver error: {0}")]
    Backend(String),

    #[error("Storage backend not available: {0}")]
    Unsupported(String),
}

pub type KvResult<T> = Result<T, KvError>;
