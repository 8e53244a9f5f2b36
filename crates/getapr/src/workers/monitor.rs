// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monitor worker - keeps the inventory fresh and the tables bounded.
//!
//! Every cycle: refresh the host inventory (keeping the previous snapshot
//! if the OS query fails), cascade source removals into the oracle,
//! garbage-collect stale user destinations, and emit a summary record.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::inventory::{self, HostInventory};
use crate::service::Shared;

use super::sleep_or_stop;

/// Worker entry point. Runs until stopped.
///
/// `previous` is the snapshot init installed, so the first cycle diffs
/// against the state the oracle already has.
pub(crate) fn run(shared: Arc<Shared>, stop_rx: Receiver<()>, mut previous: HostInventory) {
    loop {
        if sleep_or_stop(&stop_rx, shared.config.poll_period) {
            return;
        }

        match HostInventory::refresh() {
            Ok(next) => {
                let changes = inventory::diff(&previous, &next);
                if !changes.is_empty() {
                    log::info!(
                        "[MONITOR] inventory changed: {} added, {} removed",
                        changes.added.len(),
                        changes.removed.len()
                    );
                    for s in &changes.removed {
                        log::debug!("[MONITOR] source gone: {}", s);
                    }
                    for s in &changes.added {
                        log::debug!("[MONITOR] source new: {}", s);
                    }
                }
                let cascaded = shared.oracle.lock().apply_inventory(&next);
                if cascaded > 0 {
                    log::debug!("[MONITOR] cascaded {} pairs out with their sources", cascaded);
                }
                previous = next;
            }
            Err(e) => {
                log::warn!(
                    "[MONITOR] inventory refresh failed: {}; keeping previous snapshot",
                    e
                );
            }
        }

        let (collected, pairs, dests, status) = {
            let mut oracle = shared.oracle.lock();
            let collected = oracle.gc_user_das(
                shared.config.da_max_age,
                shared.config.gc_keep_floor,
                shared.config.da_max_user,
            );
            (
                collected,
                oracle.pair_count(),
                oracle.dest_counts(),
                oracle.snapshot_status(),
            )
        };
        if collected > 0 {
            log::debug!("[MONITOR] collected {} stale destinations", collected);
        }
        log::debug!(
            "[MONITOR] pairs={} destinations={} (user={}) {}",
            pairs,
            dests.0,
            dests.1,
            status
        );
    }
}
