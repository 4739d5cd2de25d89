// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Snapshot pins
//!
//! A pin keeps one snapshot readable for as long as the guard lives. The
//! oldest pinned snapshot bounds `xmin`, so neither the garbage collector nor
//! history pruning removes anything a pinned reader can still see.

use crate::model::SnapshotId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PinTable {
    pins: Mutex<BTreeMap<SnapshotId, usize>>,
}

impl PinTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquire(self: &Arc<Self>, snapshot: SnapshotId) -> SnapshotPin {
        *self.pins.lock().entry(snapshot).or_insert(0) += 1;
        SnapshotPin {
            snapshot,
            table: Arc::clone(self),
        }
    }

    fn release(&self, snapshot: SnapshotId) {
        let mut pins = self.pins.lock();
        if let Some(count) = pins.get_mut(&snapshot) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&snapshot);
            }
        }
    }

    pub fn oldest(&self) -> Option<SnapshotId> {
        self.pins.lock().keys().next().copied()
    }

    pub fn pinned(&self) -> Vec<SnapshotId> {
        self.pins.lock().keys().copied().collect()
    }
}

/// Guard holding a snapshot readable
#[derive(Debug)]
pub struct SnapshotPin {
    snapshot: SnapshotId,
    table: Arc<PinTable>,
}

impl SnapshotPin {
    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }
}

impl Drop for SnapshotPin {
    fn drop(&mut self) {
        self.table.release(self.snapshot);
    }
}
