// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Garbage collection of catalog history
//!
//! Purges two kinds of rows:
//!
//! - **Superseded versions**: ModelVersion and DataVersion rows older than
//!   the newest one visible at the store's `xmin`
//! - **Orphaned metadata**: comments, annotations and pseudo-constraints
//!   whose schema object no longer exists
//!
//! # Usage
//!
//! ```rust,ignore
//! use relcat::gc::{GarbageCollector, GcPolicy};
//!
//! let collector = GarbageCollector::new(store, GcPolicy::default());
//! let result = collector.run_once()?;
//! println!("purged {} rows", result.total_purged());
//! ```

mod collector;
mod plan;
mod policy;
mod scheduler;

pub use collector::{GarbageCollector, GcResult};
pub use plan::{plan_purge, superseded_versions, PurgePlan};
pub use policy::GcPolicy;
pub use scheduler::GcScheduler;
