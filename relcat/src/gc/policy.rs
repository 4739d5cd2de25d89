// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Garbage collection policy

use serde::{Deserialize, Serialize};

/// Controls how the garbage collector is scheduled
///
/// The purge rules themselves are fixed: version rows are kept down to the
/// newest one visible at `xmin`, and orphaned metadata is always deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GcPolicy {
    /// Run the periodic collector at all
    pub enabled: bool,
    /// Seconds between passes
    pub interval_secs: u64,
    /// Plan and report, but delete nothing
    pub dry_run: bool,
}

impl Default for GcPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            dry_run: false,
        }
    }
}

impl GcPolicy {
    pub const fn new(enabled: bool, interval_secs: u64, dry_run: bool) -> Self {
        Self {
            enabled,
            interval_secs,
            dry_run,
        }
    }

    /// Short interval for development and tests
    pub const fn development() -> Self {
        Self::new(true, 5, false)
    }

    /// Report what would be purged without deleting anything
    pub const fn audit() -> Self {
        Self::new(true, 300, true)
    }

    pub const fn disabled() -> Self {
        Self::new(false, 300, false)
    }

    /// Returns an error message if the settings are unusable
    pub fn validate(&self) -> Option<String> {
        if self.interval_secs == 0 {
            return Some("interval_secs must be at least 1".to_string());
        }
        if self.interval_secs > 7 * 24 * 3600 {
            return Some(format!(
                "interval_secs ({}) cannot exceed one week",
                self.interval_secs
            ));
        }
        None
    }
}
