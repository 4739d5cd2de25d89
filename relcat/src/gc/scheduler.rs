// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Periodic garbage collection

use super::GarbageCollector;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs collection passes on a fixed interval, off the request path
///
/// Passes execute on the blocking pool since every store call may block.
pub struct GcScheduler {
    collector: Arc<GarbageCollector>,
    shutdown: Arc<Notify>,
    passes: Arc<AtomicU64>,
}

impl GcScheduler {
    pub fn new(collector: Arc<GarbageCollector>) -> Self {
        Self {
            collector,
            shutdown: Arc::new(Notify::new()),
            passes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Completed passes so far
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Stop the loop after the pass in progress, if any
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Start the loop on the current tokio runtime
    ///
    /// Returns `None` when the policy disables collection.
    pub fn spawn(&self) -> Option<JoinHandle<()>> {
        let policy = self.collector.policy().clone();
        if !policy.enabled {
            log::info!("Garbage collection disabled");
            return None;
        }
        let collector = self.collector.clone();
        let shutdown = self.shutdown.clone();
        let passes = self.passes.clone();
        let period = Duration::from_secs(policy.interval_secs.max(1));

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!("Garbage collection scheduled every {:?}", period);
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        log::info!("Garbage collection scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let pass = collector.clone();
                        match tokio::task::spawn_blocking(move || pass.run_once()).await {
                            Ok(Ok(_)) => {
                                passes.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(Err(e)) => log::warn!("Garbage collection pass failed: {}", e),
                            Err(e) => log::error!("Garbage collection pass panicked: {}", e),
                        }
                    }
                }
            }
        }))
    }
}
