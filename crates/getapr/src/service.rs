// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `Getapr` facade - construction, init, query, status, shutdown.
//!
//! One `Getapr` value owns one oracle and its two workers. Construction
//! does no I/O; `init()` takes the first inventory snapshot, installs the
//! probe targets and gateways, starts the workers, and blocks until the
//! first poll sweep has completed. Queries trigger init implicitly when
//! needed.

use std::fmt;
use std::net::IpAddr;
use std::sync::{mpsc, Arc};

use parking_lot::Mutex;

use crate::config::GetaprConfig;
use crate::inventory::HostInventory;
use crate::oracle::{
    ConnectivityStatus, DestinationAddress, DestinationRole, OracleState,
};
use crate::resolver::{self, AddrPair};
use crate::workers::{monitor, poll, StopHandle, WorkerSet};

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the library lifecycle.
///
/// Probe failures and resolution failures never appear here; they are
/// negative evidence (empty results), not errors.
#[derive(Debug, Clone)]
pub enum GetaprError {
    /// The OS query for interfaces or gateways failed during init.
    InventoryUnavailable(String),
    /// A worker thread could not be started, or exited before init
    /// completed.
    WorkerUnavailable(String),
}

impl fmt::Display for GetaprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InventoryUnavailable(msg) => {
                write!(f, "host inventory unavailable: {}", msg)
            }
            Self::WorkerUnavailable(msg) => write!(f, "worker unavailable: {}", msg),
        }
    }
}

impl std::error::Error for GetaprError {}

// ============================================================================
// Shared state
// ============================================================================

/// State shared between the facade, the workers, and the resolver.
pub(crate) struct Shared {
    /// Runtime configuration (immutable after construction).
    pub(crate) config: GetaprConfig,
    /// The oracle, behind the single coarse lock.
    pub(crate) oracle: Mutex<OracleState>,
}

/// Lifecycle of a `Getapr` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    /// Constructed, workers not yet started.
    Idle,
    /// Workers running.
    Running,
    /// Workers stopped; the oracle answers from frozen state.
    Stopped,
}

struct Runtime {
    lifecycle: Lifecycle,
    workers: Option<WorkerSet>,
}

// ============================================================================
// Facade
// ============================================================================

/// The connectivity oracle handle.
///
/// ```no_run
/// use getapr::{Getapr, GetaprConfig};
///
/// let apr = Getapr::new(GetaprConfig::default());
/// apr.init()?;                       // blocks until the first sweep
/// for pair in apr.get_addr_pairs("www.example.com", 80)? {
///     // try pair.source / pair.destination in order
/// }
/// apr.shutdown();
/// # Ok::<(), getapr::GetaprError>(())
/// ```
pub struct Getapr {
    shared: Arc<Shared>,
    runtime: Mutex<Runtime>,
}

impl Getapr {
    /// Build a handle. No I/O happens until [`Self::init`].
    pub fn new(config: GetaprConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                oracle: Mutex::new(OracleState::new()),
            }),
            runtime: Mutex::new(Runtime {
                lifecycle: Lifecycle::Idle,
                workers: None,
            }),
        }
    }

    /// Initialise the oracle and start the workers.
    ///
    /// The first call snapshots the inventory, installs one IPv6 and one
    /// IPv4 probe target chosen at random from the configured pool along
    /// with the default gateways, starts the poll and monitor workers, and
    /// blocks until the first full sweep has completed (with default
    /// settings that is on the order of ten seconds). Subsequent calls are
    /// no-ops, including after [`Self::shutdown`].
    pub fn init(&self) -> Result<(), GetaprError> {
        let mut runtime = self.runtime.lock();
        if runtime.lifecycle != Lifecycle::Idle {
            return Ok(());
        }

        let inventory = HostInventory::refresh()
            .map_err(|e| GetaprError::InventoryUnavailable(e.to_string()))?;

        let pool = &self.shared.config.probe_target_pool;
        let target6 = (!pool.is_empty()).then(|| pool[fastrand::usize(..pool.len())].v6);
        let target4 = (!pool.is_empty()).then(|| pool[fastrand::usize(..pool.len())].v4);

        {
            let mut oracle = self.shared.oracle.lock();
            oracle.apply_inventory(&inventory);
            if let Some(t6) = target6 {
                oracle.add_da(DestinationAddress::new(
                    IpAddr::V6(t6),
                    None,
                    DestinationRole::ProbeTarget,
                ));
            }
            if let Some(t4) = target4 {
                oracle.add_da(DestinationAddress::new(
                    IpAddr::V4(t4),
                    None,
                    DestinationRole::ProbeTarget,
                ));
            }
            let (gw6, gw4) = inventory.gateways();
            if let Some(gw) = gw6 {
                oracle.add_da(DestinationAddress::new(
                    IpAddr::V6(gw.addr),
                    gw.zone,
                    DestinationRole::LocalGateway,
                ));
            }
            if let Some(gw) = gw4 {
                oracle.add_da(DestinationAddress::new(
                    IpAddr::V4(gw),
                    None,
                    DestinationRole::LocalGateway,
                ));
            }
        }
        log::info!(
            "[GETAPR] init: {} sources, probe targets {:?} / {:?}",
            inventory.sources().len(),
            target6,
            target4
        );

        let (poll_stop_tx, poll_stop_rx) = mpsc::channel();
        let (sweep_tx, sweep_rx) = mpsc::channel();
        let poll_thread = std::thread::Builder::new()
            .name("getapr-poll".into())
            .spawn({
                let shared = Arc::clone(&self.shared);
                move || poll::run(shared, poll_stop_rx, sweep_tx)
            })
            .map_err(|e| GetaprError::WorkerUnavailable(e.to_string()))?;
        let poll_handle = StopHandle::new(poll_stop_tx, poll_thread);

        let (monitor_stop_tx, monitor_stop_rx) = mpsc::channel();
        let monitor_thread = std::thread::Builder::new()
            .name("getapr-monitor".into())
            .spawn({
                let shared = Arc::clone(&self.shared);
                move || monitor::run(shared, monitor_stop_rx, inventory)
            })
            .map_err(|e| GetaprError::WorkerUnavailable(e.to_string()))?;
        let monitor_handle = StopHandle::new(monitor_stop_tx, monitor_thread);

        // Block until the first sweep lands so callers get baseline
        // evidence. A disconnect means the poll worker died early.
        sweep_rx.recv().map_err(|_| {
            GetaprError::WorkerUnavailable("poll worker exited before its first sweep".into())
        })?;

        runtime.workers = Some(WorkerSet {
            poll: poll_handle,
            monitor: monitor_handle,
        });
        runtime.lifecycle = Lifecycle::Running;
        log::info!("[GETAPR] init complete: first sweep done");
        Ok(())
    }

    /// Get ranked (family, source, destination) pairs for a target.
    ///
    /// Initialises implicitly when needed, which blocks for the first
    /// sweep. The result is empty when the target does not resolve or no
    /// measured pair and no policy rule produces a candidate; the caller
    /// is expected to try the returned pairs in order.
    pub fn get_addr_pairs(&self, target: &str, port: u16) -> Result<Vec<AddrPair>, GetaprError> {
        self.init()?;
        Ok(resolver::get_addr_pairs(&self.shared, target, port))
    }

    /// The detected connectivity status.
    pub fn status(&self) -> ConnectivityStatus {
        self.shared.oracle.lock().snapshot_status()
    }

    /// Stop both workers and join them. Idempotent; queries keep working
    /// against the frozen oracle afterwards.
    pub fn shutdown(&self) {
        let mut runtime = self.runtime.lock();
        if let Some(mut workers) = runtime.workers.take() {
            workers.stop();
            runtime.lifecycle = Lifecycle::Stopped;
            log::info!("[GETAPR] shut down");
        }
    }

    /// Whether the workers are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.runtime.lock().lifecycle == Lifecycle::Running
    }

    /// Number of completed poll sweeps so far.
    #[must_use]
    pub fn sweeps_completed(&self) -> u64 {
        self.shared.oracle.lock().sweeps_completed()
    }
}

impl Default for Getapr {
    fn default() -> Self {
        Self::new(GetaprConfig::default())
    }
}

impl Drop for Getapr {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Config that keeps every sweep local and fast: no probe targets, so
    /// only gateways (if any) are ever probed.
    fn fast_config() -> GetaprConfig {
        GetaprConfig::default()
            .with_poll_period(Duration::from_millis(50))
            .with_probe_timeout(Duration::from_millis(50))
            .with_probe_target_pool(Vec::new())
    }

    #[test]
    fn test_new_does_no_io() {
        let apr = Getapr::new(fast_config());
        assert!(!apr.is_running());
        assert_eq!(apr.sweeps_completed(), 0);

        let status = apr.status();
        assert!(!status.gua_ok);
        assert!(!status.nptv6);
        assert!(!status.nat44_tried);
    }

    #[test]
    fn test_init_blocks_for_first_sweep_and_is_idempotent() {
        let apr = Getapr::new(fast_config());
        apr.init().expect("init should succeed");
        assert!(apr.is_running());
        assert!(apr.sweeps_completed() >= 1);

        let before = std::time::Instant::now();
        apr.init().expect("second init is a no-op");
        // A no-op init must not block for another sweep.
        assert!(before.elapsed() < Duration::from_millis(40));

        apr.shutdown();
        assert!(!apr.is_running());
        // Idempotent shutdown.
        apr.shutdown();
    }

    #[test]
    fn test_query_initialises_implicitly() {
        let apr = Getapr::new(fast_config());
        let pairs = apr
            .get_addr_pairs("203.0.113.5", 443)
            .expect("query should succeed");
        assert!(apr.is_running());
        // No flags can be confirmed without probe targets, so an unprobed
        // global destination yields no candidates; the point is that the
        // call initialised and did not error.
        let _ = pairs;
        apr.shutdown();
    }

    #[test]
    fn test_queries_after_shutdown_use_frozen_state() {
        let apr = Getapr::new(fast_config());
        apr.init().expect("init should succeed");
        apr.shutdown();

        let pairs = apr.get_addr_pairs("203.0.113.5", 80);
        assert!(pairs.is_ok());
    }

    #[test]
    fn test_empty_target_resolves_to_nothing() {
        let apr = Getapr::new(fast_config());
        let pairs = apr.get_addr_pairs("", 80).expect("query should succeed");
        assert!(pairs.is_empty());
        apr.shutdown();
    }

    #[test]
    fn test_drop_joins_workers() {
        let apr = Getapr::new(fast_config());
        apr.init().expect("init should succeed");
        // Dropping must not hang.
        drop(apr);
    }
}
