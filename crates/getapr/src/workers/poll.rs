// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Poll worker - sweeps the (source, destination) cross product.
//!
//! Each sweep snapshots the candidate space under the lock, probes outside
//! it, and commits every result back under the lock as it arrives: a
//! success upserts the pair and updates the flags, a failure removes the
//! pair. The worker checks for cancellation between probes, so shutdown
//! waits at most one probe timeout.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use crate::oracle::PairKey;
use crate::probe::{ProbeEngine, ProbeOutcome};
use crate::scope;
use crate::service::Shared;

use super::{sleep_or_stop, stop_requested};

/// Worker entry point. Runs until stopped.
///
/// `first_sweep_tx` is signalled once, after the first full sweep, so
/// init can block until the oracle has baseline evidence.
pub(crate) fn run(shared: Arc<Shared>, stop_rx: Receiver<()>, first_sweep_tx: Sender<()>) {
    let engine = ProbeEngine::new(shared.config.probe_timeout, shared.config.probe_port);
    let mut first_sweep_tx = Some(first_sweep_tx);

    loop {
        let sweep_started = Instant::now();
        let (sources, destinations) = shared.oracle.lock().snapshot_for_sweep();
        log::debug!(
            "[POLL] sweep: {} sources x {} destinations",
            sources.len(),
            destinations.len()
        );

        for sa in &sources {
            for da in &destinations {
                if stop_requested(&stop_rx) {
                    return;
                }
                if !scope::intrinsically_valid(sa, da) {
                    continue;
                }
                let off_site = scope::is_off_site(da);
                if !shared
                    .oracle
                    .lock()
                    .allow_translation_probe(sa.scope, da.scope, off_site)
                {
                    continue;
                }

                match engine.probe(sa, da) {
                    ProbeOutcome::Success { latency_ms } => {
                        let mut oracle = shared.oracle.lock();
                        oracle.upsert_pair(sa, da.key(), latency_ms);
                        oracle.classify_success(sa.scope, da.scope, off_site);
                        drop(oracle);
                        log::debug!("[POLL] {} -> {} ok ({} ms)", sa, da, latency_ms);
                    }
                    ProbeOutcome::Failure(reason) => {
                        let mut oracle = shared.oracle.lock();
                        oracle.remove_pair(&PairKey {
                            source: sa.key(),
                            dest: da.key(),
                        });
                        oracle.prune_unresponsive(sa, &da.key());
                        drop(oracle);
                        log::debug!("[POLL] {} -> {} failed: {}", sa, da, reason);
                    }
                }
            }
        }

        shared.oracle.lock().note_sweep_complete();
        if let Some(tx) = first_sweep_tx.take() {
            let _ = tx.send(());
        }

        let elapsed = sweep_started.elapsed();
        let remaining = shared.config.poll_period.saturating_sub(elapsed);
        if sleep_or_stop(&stop_rx, remaining) {
            return;
        }
    }
}
