// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration - single source of truth.
//!
//! This module centralizes all tunables of the connectivity oracle.
//! Every default is a named constant; `GetaprConfig` carries the runtime
//! values and is handed to [`crate::Getapr`] at construction.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

// =======================================================================
// Cadence & timeouts
// =======================================================================

/// Base period of the poll and monitor workers.
///
/// Each poll sweep starts roughly this often; the monitor refreshes the
/// host inventory on the same cadence.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(10);

/// Wall-clock deadline for a single connect probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport port used for connect probes.
pub const DEFAULT_PROBE_PORT: u16 = 80;

// =======================================================================
// Destination table bounds
// =======================================================================

/// Soft cap on user-role destination entries.
///
/// Enforced by the monitor worker's garbage collection; probe-target and
/// local-gateway entries never count against it.
pub const DEFAULT_DA_MAX_USER: usize = 256;

/// Age threshold after which an unused user-role destination is collected.
pub const DEFAULT_DA_MAX_AGE: Duration = Duration::from_secs(600);

/// Minimum number of most-recently-used user destinations the garbage
/// collector always preserves, to avoid thrash on bursty query patterns.
pub const DEFAULT_GC_KEEP_FLOOR: usize = 8;

// =======================================================================
// Latency model
// =======================================================================

/// Cap on the effective sample count of the rolling latency average.
///
/// The average is exponential with weight 1/N where N is the sample count
/// capped at this value, so a path change is reflected within roughly a
/// minute of polling.
pub const LATENCY_SMOOTHING_WINDOW: u32 = 16;

/// Synthetic latency (ms) for a GUA source suggested against an unprobed
/// GUA destination.
pub const SYNTHETIC_LATENCY_GUA_MS: u32 = 200;

/// Synthetic latency (ms) for ULA-to-ULA suggestions. One below the GUA
/// value so on-site ULA paths sort ahead of global ones.
pub const SYNTHETIC_LATENCY_ULA_MS: u32 = 199;

/// Synthetic latency (ms) for ULA sources suggested against a GUA
/// destination behind an NPTv6 translator. One above the GUA value so a
/// native global path wins when both are plausible.
pub const SYNTHETIC_LATENCY_NPTV6_MS: u32 = 201;

/// Synthetic latency (ms) for zone-matched link-local suggestions.
pub const SYNTHETIC_LATENCY_LLA_MS: u32 = 1;

/// Synthetic latency (ms) for IPv4 suggestions.
pub const SYNTHETIC_LATENCY_V4_MS: u32 = 250;

/// Synthetic latency (ms) for IPv4 link-local suggestions.
pub const SYNTHETIC_LATENCY_V4_LL_MS: u32 = 2;

// =======================================================================
// Probe targets
// =======================================================================

/// A candidate pair of immortal probe targets, one per address family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeTargetPair {
    /// IPv6 probe target.
    pub v6: Ipv6Addr,
    /// IPv4 probe target.
    pub v4: Ipv4Addr,
}

/// Default probe-target candidates.
///
/// Public hosts that answer TCP on port 80 in both families. Two targets
/// (one per family) are chosen at random from this pool on init to spread
/// probe load across runs.
pub fn default_probe_target_pool() -> Vec<ProbeTargetPair> {
    vec![
        // lookup.test-ipv6.com
        ProbeTargetPair {
            v6: Ipv6Addr::new(0x2a00, 0xdd80, 0x3c, 0, 0, 0, 0, 0x0b3f),
            v4: Ipv4Addr::new(216, 218, 223, 250),
        },
        // one.one.one.one
        ProbeTargetPair {
            v6: Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1111),
            v4: Ipv4Addr::new(1, 1, 1, 1),
        },
        // dns.google
        ProbeTargetPair {
            v6: Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888),
            v4: Ipv4Addr::new(8, 8, 8, 8),
        },
    ]
}

// =======================================================================
// Runtime configuration
// =======================================================================

/// Runtime configuration for the connectivity oracle.
#[derive(Clone, Debug)]
pub struct GetaprConfig {
    /// Sweep cadence of the poll and monitor workers.
    pub poll_period: Duration,

    /// Per-probe wall-clock timeout.
    pub probe_timeout: Duration,

    /// Transport port for connect probes.
    pub probe_port: u16,

    /// Soft cap on user-role destination entries.
    pub da_max_user: usize,

    /// Garbage-collection age threshold for user-role destinations.
    pub da_max_age: Duration,

    /// Most-recently-used user destinations always spared by GC.
    pub gc_keep_floor: usize,

    /// Probe-target candidates; one IPv6 and one IPv4 target are chosen
    /// at random on init.
    pub probe_target_pool: Vec<ProbeTargetPair>,
}

impl Default for GetaprConfig {
    fn default() -> Self {
        Self {
            poll_period: DEFAULT_POLL_PERIOD,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_port: DEFAULT_PROBE_PORT,
            da_max_user: DEFAULT_DA_MAX_USER,
            da_max_age: DEFAULT_DA_MAX_AGE,
            gc_keep_floor: DEFAULT_GC_KEEP_FLOOR,
            probe_target_pool: default_probe_target_pool(),
        }
    }
}

impl GetaprConfig {
    /// Set the sweep cadence.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Set the per-probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the probe port.
    pub fn with_probe_port(mut self, port: u16) -> Self {
        self.probe_port = port;
        self
    }

    /// Set the user-destination soft cap.
    pub fn with_da_max_user(mut self, cap: usize) -> Self {
        self.da_max_user = cap;
        self
    }

    /// Set the user-destination GC age threshold.
    pub fn with_da_max_age(mut self, age: Duration) -> Self {
        self.da_max_age = age;
        self
    }

    /// Replace the probe-target pool.
    pub fn with_probe_target_pool(mut self, pool: Vec<ProbeTargetPair>) -> Self {
        self.probe_target_pool = pool;
        self
    }
}
