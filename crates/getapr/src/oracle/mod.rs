// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Oracle state - the shared, continuously-maintained connectivity view.
//!
//! One [`OracleState`] value holds everything the workers maintain and the
//! query resolver reads: the current source set, the destination table,
//! the table of confirmed-working pairs with rolling latency, and the
//! inferred connectivity flags. The owner wraps it in a single mutex; every
//! operation here is a short critical section with no blocking I/O.
//!
//! Flag semantics: each flag turns true on the first confirming probe and
//! stays true while the source class that justified it remains in the
//! inventory; it clears only when that class disappears and no surviving
//! pair still justifies it.

pub mod destination;
pub mod pair;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::inventory::{GatewayV6, HostInventory, SourceAddress, SourceKey};
use crate::scope::{classify, AddrFamily, ScopeClass};

pub use destination::{DestKey, DestinationAddress, DestinationRole};
pub use pair::{Pair, PairKey};

// ============================================================================
// Connectivity flags
// ============================================================================

/// The inferred connectivity booleans plus one-shot bookkeeping bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectivityFlags {
    /// A GUA source reached an IPv6 destination.
    pub gua_ok: bool,
    /// A ULA source reached a ULA destination.
    pub ula_ok: bool,
    /// A link-local source reached a link-local destination.
    pub lla_ok: bool,
    /// Any IPv4 source reached any IPv4 destination.
    pub ipv4_ok: bool,
    /// A ULA source reached an off-site GUA destination: an NPTv6 or
    /// NAT66 translator is present.
    pub nptv6: bool,
    /// An RFC1918 source reached a global IPv4 destination: a NAT44
    /// translator is present.
    pub nat44: bool,
    /// A ULA-to-off-site probe has been attempted.
    pub nptv6_tried: bool,
    /// An RFC1918-to-global probe has been attempted.
    pub nat44_tried: bool,
    /// The inventory currently carries a ULA source.
    pub ula_present: bool,
}

/// Externally visible status snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct ConnectivityStatus {
    /// GUA-to-GUA connectivity confirmed.
    pub gua_ok: bool,
    /// ULA-to-ULA connectivity confirmed.
    pub ula_ok: bool,
    /// LLA-to-LLA connectivity confirmed.
    pub lla_ok: bool,
    /// IPv4 connectivity confirmed.
    pub ipv4_ok: bool,
    /// NPTv6/NAT66 translator inferred.
    pub nptv6: bool,
    /// NAT44 translator inferred.
    pub nat44: bool,
    /// A ULA source is present in the inventory.
    pub ula_present: bool,
    /// A ULA-to-off-site probe has been attempted.
    pub nptv6_tried: bool,
    /// An RFC1918-to-global probe has been attempted.
    pub nat44_tried: bool,
    /// IPv6 default gateway, if known.
    pub def_gateway6: Option<String>,
    /// IPv4 default gateway, if known.
    pub def_gateway4: Option<String>,
}

impl ConnectivityStatus {
    /// The status as a string-keyed mapping.
    ///
    /// Keys: `NPTv6`, `NAT44`, `ULA_ok`, `LLA_ok`, `GUA_ok`, `IPv4_ok`,
    /// `ULA_present`, `NPTv6_tried`, `NAT44_tried`, `def_gateway6`,
    /// `def_gateway4`. Gateway values are address strings or `none`.
    pub fn as_map(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("GUA_ok", self.gua_ok.to_string());
        map.insert("ULA_ok", self.ula_ok.to_string());
        map.insert("LLA_ok", self.lla_ok.to_string());
        map.insert("IPv4_ok", self.ipv4_ok.to_string());
        map.insert("NPTv6", self.nptv6.to_string());
        map.insert("NAT44", self.nat44.to_string());
        map.insert("ULA_present", self.ula_present.to_string());
        map.insert("NPTv6_tried", self.nptv6_tried.to_string());
        map.insert("NAT44_tried", self.nat44_tried.to_string());
        map.insert(
            "def_gateway6",
            self.def_gateway6.clone().unwrap_or_else(|| "none".into()),
        );
        map.insert(
            "def_gateway4",
            self.def_gateway4.clone().unwrap_or_else(|| "none".into()),
        );
        map
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GUA<>GUA: {}, ULA<>ULA: {}, LLA<>LLA: {}, IPv4<>IPv4: {}, NPTv6: {}, NAT44: {}",
            self.gua_ok, self.ula_ok, self.lla_ok, self.ipv4_ok, self.nptv6, self.nat44
        )
    }
}

// ============================================================================
// Oracle state
// ============================================================================

/// The shared connectivity state. Callers wrap it in a mutex; every method
/// is a critical-section operation and performs no I/O.
pub struct OracleState {
    /// Current usable sources (mirrors the latest inventory snapshot).
    sources: Vec<SourceAddress>,
    /// Destination table.
    destinations: BTreeMap<DestKey, DestinationAddress>,
    /// Confirmed-working pairs.
    pairs: BTreeMap<PairKey, Pair>,
    /// Inferred connectivity flags.
    flags: ConnectivityFlags,
    /// IPv6 default gateway from the latest inventory.
    gateway6: Option<GatewayV6>,
    /// IPv4 default gateway from the latest inventory.
    gateway4: Option<std::net::Ipv4Addr>,
    /// Completed poll sweeps.
    sweeps_completed: u64,
}

impl OracleState {
    /// Empty state: no sources, no destinations, all flags false.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            destinations: BTreeMap::new(),
            pairs: BTreeMap::new(),
            flags: ConnectivityFlags::default(),
            gateway6: None,
            gateway4: None,
            sweeps_completed: 0,
        }
    }

    // ------------------------------------------------------------------
    // Inventory application
    // ------------------------------------------------------------------

    /// Install a fresh inventory snapshot.
    ///
    /// Pairs whose source left the inventory are removed atomically with
    /// the source itself, and flags no longer justified by any source
    /// class or surviving pair are cleared. Returns the number of pairs
    /// cascaded out.
    pub fn apply_inventory(&mut self, inventory: &HostInventory) -> usize {
        let removed_keys: Vec<SourceKey> = self
            .sources
            .iter()
            .filter(|s| !inventory.contains(&s.key()))
            .map(|s| s.key())
            .collect();

        let mut cascaded = 0;
        for key in &removed_keys {
            cascaded += self.remove_pairs_for_sa(key);
        }

        self.sources = inventory.sources.clone();
        self.gateway6 = inventory.gateway6;
        self.gateway4 = inventory.gateway4;
        self.flags.ula_present = inventory.ula_present();
        self.recompute_flags();
        cascaded
    }

    /// Clear flags that no source class and no surviving pair justifies.
    ///
    /// Never sets a flag; flags rise only through [`Self::classify_success`].
    fn recompute_flags(&mut self) {
        let has_class =
            |class: ScopeClass| self.sources.iter().any(move |s| s.scope == class);
        let pair_with = |sa: ScopeClass, da: ScopeClass| {
            self.pairs
                .values()
                .any(move |p| p.source.scope == sa && classify(&p.dest.addr) == da)
        };

        let has_gua = has_class(ScopeClass::Gua);
        let has_ula = has_class(ScopeClass::Ula);
        let has_lla = has_class(ScopeClass::Lla);
        let has_rfc1918 = has_class(ScopeClass::Rfc1918);
        let has_v4 = self.sources.iter().any(|s| s.family() == AddrFamily::V4);

        let v6_pair_from_gua = self.pairs.values().any(|p| {
            p.source.scope == ScopeClass::Gua && AddrFamily::of(&p.dest.addr) == AddrFamily::V6
        });
        let any_v4_pair = self
            .pairs
            .values()
            .any(|p| p.source.family() == AddrFamily::V4);
        let ula_ula = pair_with(ScopeClass::Ula, ScopeClass::Ula);
        let ula_gua = pair_with(ScopeClass::Ula, ScopeClass::Gua);
        let lla_lla = pair_with(ScopeClass::Lla, ScopeClass::Lla);
        let nat44_pair = pair_with(ScopeClass::Rfc1918, ScopeClass::V4Global);

        if !has_gua && !v6_pair_from_gua {
            self.flags.gua_ok = false;
        }
        if !has_ula && !ula_ula {
            self.flags.ula_ok = false;
        }
        if !has_ula && !ula_gua {
            self.flags.nptv6 = false;
            // The class is gone; a re-appearing ULA gets a fresh shot.
            self.flags.nptv6_tried = false;
        }
        if !has_lla && !lla_lla {
            self.flags.lla_ok = false;
        }
        if !has_v4 && !any_v4_pair {
            self.flags.ipv4_ok = false;
        }
        if !has_rfc1918 && !nat44_pair {
            self.flags.nat44 = false;
            self.flags.nat44_tried = false;
        }
    }

    // ------------------------------------------------------------------
    // Pair table
    // ------------------------------------------------------------------

    /// Insert a pair or fold a fresh latency sample into an existing one.
    ///
    /// A commit whose source has left the inventory in the meantime (the
    /// probe raced an inventory shrink) is dropped: no reader may ever see
    /// a pair referencing a departed source.
    pub fn upsert_pair(&mut self, source: &SourceAddress, dest: DestKey, latency_ms: u32) {
        if !self.sources.iter().any(|s| s.key() == source.key()) {
            return;
        }
        let key = PairKey {
            source: source.key(),
            dest,
        };
        match self.pairs.get_mut(&key) {
            Some(pair) => pair.record_sample(latency_ms),
            None => {
                self.pairs
                    .insert(key, Pair::new(source.clone(), dest, latency_ms));
            }
        }
    }

    /// Erase a pair if present.
    pub fn remove_pair(&mut self, key: &PairKey) -> bool {
        self.pairs.remove(key).is_some()
    }

    /// Erase every pair referencing the given source.
    pub fn remove_pairs_for_sa(&mut self, source: &SourceKey) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|k, _| k.source != *source);
        before - self.pairs.len()
    }

    /// All pairs confirmed for a destination.
    pub fn pairs_for_dest(&self, dest: &DestKey) -> Vec<Pair> {
        self.pairs
            .values()
            .filter(|p| p.dest == *dest)
            .cloned()
            .collect()
    }

    /// Number of confirmed pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    // ------------------------------------------------------------------
    // Destination table
    // ------------------------------------------------------------------

    /// Install a destination. Idempotent: an existing entry keeps its
    /// timestamps, and its role is only ever upgraded, never downgraded.
    ///
    /// Returns true if the destination was new.
    pub fn add_da(&mut self, da: DestinationAddress) -> bool {
        let key = da.key();
        match self.destinations.get_mut(&key) {
            Some(existing) => {
                if da.role.priority() > existing.role.priority() {
                    existing.role = da.role;
                }
                false
            }
            None => {
                log::debug!("[ORACLE] new destination {}", da);
                self.destinations.insert(key, da);
                true
            }
        }
    }

    /// Look up a destination.
    pub fn dest(&self, key: &DestKey) -> Option<&DestinationAddress> {
        self.destinations.get(key)
    }

    /// Refresh a destination's last-used stamp.
    pub fn touch_da(&mut self, key: &DestKey) -> bool {
        match self.destinations.get_mut(key) {
            Some(da) => {
                da.touch();
                true
            }
            None => false,
        }
    }

    /// Number of destinations, user-role destinations respectively.
    #[must_use]
    pub fn dest_counts(&self) -> (usize, usize) {
        let user = self
            .destinations
            .values()
            .filter(|d| d.role == DestinationRole::User)
            .count();
        (self.destinations.len(), user)
    }

    /// Collect aged-out user destinations.
    ///
    /// Removes user-role entries whose last use is older than `max_age`,
    /// always sparing the `keep_floor` most recently used, and then
    /// enforces the `max_user` soft cap by dropping the oldest entries.
    /// Pairs referencing a removed destination go with it. Entries with
    /// probe-target or local-gateway roles are never touched.
    pub fn gc_user_das(
        &mut self,
        max_age: Duration,
        keep_floor: usize,
        max_user: usize,
    ) -> usize {
        let mut user: Vec<(DestKey, std::time::Instant)> = self
            .destinations
            .values()
            .filter(|d| d.role == DestinationRole::User)
            .map(|d| (d.key(), d.last_used))
            .collect();
        // Most recently used first.
        user.sort_by(|a, b| b.1.cmp(&a.1));

        let mut doomed: Vec<DestKey> = user
            .iter()
            .skip(keep_floor)
            .filter(|(_, last_used)| last_used.elapsed() > max_age)
            .map(|(key, _)| *key)
            .collect();

        // Soft cap: oldest entries beyond the cap go regardless of age.
        let surviving = user.len() - doomed.len();
        if surviving > max_user {
            let excess: Vec<DestKey> = user
                .iter()
                .rev()
                .filter(|(key, _)| !doomed.contains(key))
                .take(surviving - max_user)
                .map(|(key, _)| *key)
                .collect();
            doomed.extend(excess);
        }

        for key in &doomed {
            self.destinations.remove(key);
            self.pairs.retain(|k, _| k.dest != *key);
        }
        doomed.len()
    }

    /// Drop a user-role destination that failed a probe its scope
    /// combination says should have worked, so future sweeps stop burning
    /// timeout budget on it.
    ///
    /// No-op for immortal roles and for combinations without confirming
    /// flags. Returns true if the destination was removed.
    pub fn prune_unresponsive(&mut self, sa: &SourceAddress, dest: &DestKey) -> bool {
        let Some(da) = self.destinations.get(dest) else {
            return false;
        };
        if da.role.is_immortal() {
            return false;
        }

        let f = &self.flags;
        let expected = match (sa.scope, da.scope) {
            (ScopeClass::Rfc1918, ScopeClass::V4Global) => f.nat44,
            (ScopeClass::V4Global, ScopeClass::V4Global) => f.ipv4_ok,
            (ScopeClass::Lla, ScopeClass::Lla) => f.lla_ok,
            (ScopeClass::Ula, ScopeClass::Ula) => f.ula_ok,
            (ScopeClass::Ula, ScopeClass::Gua) => f.nptv6,
            (ScopeClass::Gua, ScopeClass::Gua) => f.gua_ok,
            _ => false,
        };
        if !expected {
            return false;
        }

        log::debug!("[ORACLE] dropping unresponsive destination {}", da);
        self.destinations.remove(dest);
        self.pairs.retain(|k, _| k.dest != *dest);
        true
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    /// Gate for translator-detection probes.
    ///
    /// ULA-to-off-site and RFC1918-to-global combinations get exactly one
    /// attempt: the first call marks the try, and once marked the
    /// combination is admitted again only after a success has set the
    /// corresponding translator flag. Every other combination is always
    /// admitted.
    pub fn allow_translation_probe(
        &mut self,
        sa_scope: ScopeClass,
        da_scope: ScopeClass,
        off_site: bool,
    ) -> bool {
        match (sa_scope, da_scope) {
            (ScopeClass::Ula, ScopeClass::Gua) if off_site => {
                if self.flags.nptv6 {
                    true
                } else if self.flags.nptv6_tried {
                    false
                } else {
                    self.flags.nptv6_tried = true;
                    true
                }
            }
            (ScopeClass::Rfc1918, ScopeClass::V4Global) => {
                if self.flags.nat44 {
                    true
                } else if self.flags.nat44_tried {
                    false
                } else {
                    self.flags.nat44_tried = true;
                    true
                }
            }
            _ => true,
        }
    }

    /// Update the connectivity flags after a successful probe.
    pub fn classify_success(&mut self, sa_scope: ScopeClass, da_scope: ScopeClass, off_site: bool) {
        if sa_scope.is_ipv6() {
            match (sa_scope, da_scope) {
                (ScopeClass::Ula, ScopeClass::Gua) if off_site => self.flags.nptv6 = true,
                (ScopeClass::Ula, ScopeClass::Ula) => self.flags.ula_ok = true,
                (ScopeClass::Lla, ScopeClass::Lla) => self.flags.lla_ok = true,
                (ScopeClass::Gua, _) => self.flags.gua_ok = true,
                _ => {}
            }
        } else {
            self.flags.ipv4_ok = true;
            if sa_scope == ScopeClass::Rfc1918 && da_scope == ScopeClass::V4Global {
                self.flags.nat44 = true;
            }
        }
    }

    /// The current flags.
    #[must_use]
    pub fn flags(&self) -> ConnectivityFlags {
        self.flags
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Copy out the sources and destinations for a poll sweep, so probing
    /// happens outside the lock. Iteration order is the destination
    /// table's key order: deterministic within a sweep.
    pub fn snapshot_for_sweep(&self) -> (Vec<SourceAddress>, Vec<DestinationAddress>) {
        (
            self.sources.clone(),
            self.destinations.values().cloned().collect(),
        )
    }

    /// The current sources.
    pub fn sources(&self) -> &[SourceAddress] {
        &self.sources
    }

    /// Status snapshot for `status()`.
    pub fn snapshot_status(&self) -> ConnectivityStatus {
        ConnectivityStatus {
            gua_ok: self.flags.gua_ok,
            ula_ok: self.flags.ula_ok,
            lla_ok: self.flags.lla_ok,
            ipv4_ok: self.flags.ipv4_ok,
            nptv6: self.flags.nptv6,
            nat44: self.flags.nat44,
            ula_present: self.flags.ula_present,
            nptv6_tried: self.flags.nptv6_tried,
            nat44_tried: self.flags.nat44_tried,
            def_gateway6: self.gateway6.map(|g| g.to_string()),
            def_gateway4: self.gateway4.map(|g| g.to_string()),
        }
    }

    /// Record a completed poll sweep.
    pub fn note_sweep_complete(&mut self) {
        self.sweeps_completed += 1;
    }

    /// Number of completed poll sweeps.
    #[must_use]
    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps_completed
    }
}

impl Default for OracleState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
