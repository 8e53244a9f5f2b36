// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # getapr - probed address-pair selection
//!
//! A user-space replacement for the classic "resolve a name, get a list of
//! destination addresses" routine. Instead of destinations alone, queries
//! return ordered **(family, source, destination)** triples ready for
//! bind/connect, because on multi-homed dual-stack hosts - with NAT44,
//! NPTv6, ULAs and link-locals in play - the kernel's default source
//! selection is often wrong in practice.
//!
//! The library keeps a continuously-maintained connectivity oracle: a poll
//! worker probes plausible (source, destination) combinations and records
//! which ones work and how fast, while a monitor worker tracks the host's
//! addresses and garbage-collects stale destinations. Queries merge that
//! measured evidence with a policy table so even never-probed destinations
//! get a ranked guess.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                         Getapr                                |
//! |  init / get_addr_pairs / status / shutdown                    |
//! |  +--------------------------------------------------------+  |
//! |  |                  OracleState (one mutex)                |  |
//! |  |  sources | destinations | pairs+latency | flags         |  |
//! |  +----^----------------^--------------------------^-------+  |
//! |       |                |                          |          |
//! |  poll worker      monitor worker            query resolver   |
//! |  (probe sweep)    (inventory + GC)          (rules + sort)   |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use getapr::{Getapr, GetaprConfig};
//!
//! fn main() -> Result<(), getapr::GetaprError> {
//!     let apr = Getapr::new(GetaprConfig::default());
//!
//!     // Takes at least one sweep (~10 s) on first call.
//!     for pair in apr.get_addr_pairs("www.example.com", 80)? {
//!         // Bind pair.source, connect pair.destination; on failure,
//!         // move on to the next pair.
//!         let _ = (pair.family, pair.source, pair.destination);
//!     }
//!
//!     assert!(apr.status().as_map().contains_key("NPTv6"));
//!     apr.shutdown();
//!     Ok(())
//! }
//! ```

/// Defaults and runtime configuration.
pub mod config;
/// Host inventory: local sources and default gateways.
pub mod inventory;
/// Oracle state: destinations, confirmed pairs, connectivity flags.
pub mod oracle;
/// TCP connect probe engine.
pub mod probe;
/// Query resolution and ranking.
pub mod resolver;
/// Address scope classification and pair validity.
pub mod scope;
/// The `Getapr` facade.
mod service;
/// Worker threads (poll sweep, inventory monitor).
mod workers;

pub use config::{GetaprConfig, ProbeTargetPair};
pub use inventory::{HostInventory, SourceAddress};
pub use oracle::{ConnectivityStatus, DestinationAddress, DestinationRole};
pub use probe::{ProbeEngine, ProbeFailure, ProbeOutcome};
pub use resolver::AddrPair;
pub use scope::{classify, intrinsically_valid, is_off_site, AddrFamily, ScopeClass};
pub use service::{Getapr, GetaprError};

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
