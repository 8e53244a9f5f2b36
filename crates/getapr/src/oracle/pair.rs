// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Confirmed-working pair entries and their rolling latency.

use std::time::Instant;

use super::destination::DestKey;
use crate::config::LATENCY_SMOOTHING_WINDOW;
use crate::inventory::{SourceAddress, SourceKey};

/// Identity of a pair in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    /// Source identity.
    pub source: SourceKey,
    /// Destination identity.
    pub dest: DestKey,
}

/// A (source, destination) combination confirmed reachable, with its
/// rolling connect latency.
///
/// Exists only while the pair keeps probing successfully; a single probe
/// failure removes it.
#[derive(Clone, Debug)]
pub struct Pair {
    /// The source address (a copy of the inventory entry at confirm time).
    pub source: SourceAddress,
    /// Destination identity.
    pub dest: DestKey,
    /// Rolling average connect latency in milliseconds.
    pub avg_latency_ms: u32,
    /// Number of samples recorded.
    pub samples: u32,
    /// When the pair last probed successfully.
    pub last_success: Instant,
}

impl Pair {
    /// Create a pair from its first successful probe.
    pub fn new(source: SourceAddress, dest: DestKey, latency_ms: u32) -> Self {
        Self {
            source,
            dest,
            avg_latency_ms: latency_ms,
            samples: 1,
            last_success: Instant::now(),
        }
    }

    /// Identity key of this pair.
    pub fn key(&self) -> PairKey {
        PairKey {
            source: self.source.key(),
            dest: self.dest,
        }
    }

    /// Fold a fresh latency sample into the rolling average.
    ///
    /// Exponential with weight 1/N, N capped so the average stays
    /// responsive to path changes within roughly a minute of polling.
    pub fn record_sample(&mut self, latency_ms: u32) {
        self.samples = self.samples.saturating_add(1);
        let n = i64::from(self.samples.min(LATENCY_SMOOTHING_WINDOW));
        let avg = i64::from(self.avg_latency_ms);
        let delta = (i64::from(latency_ms) - avg) / n;
        self.avg_latency_ms = (avg + delta).max(1) as u32;
        self.last_success = Instant::now();
    }
}
