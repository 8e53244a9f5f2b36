// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host inventory - the local side of the pair space.
//!
//! A [`HostInventory`] is a point-in-time snapshot of the usable source
//! addresses on this host plus the default gateways for each family. The
//! monitor worker refreshes it periodically and feeds the differences into
//! the oracle so pairs referencing departed sources are cascaded out.

pub mod gateways;
pub mod ifaddrs;

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use crate::scope::{classify, AddrFamily, ScopeClass};

/// Identity of a source address within the inventory.
///
/// The zone qualifier is part of the identity: the same link-local address
/// on two interfaces is two distinct sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
    /// The raw address.
    pub addr: IpAddr,
    /// Zone index (IPv6 link-local only).
    pub zone: Option<u32>,
}

/// A usable local source address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceAddress {
    /// The raw address.
    pub addr: IpAddr,
    /// Scope class, derived from the address bits.
    pub scope: ScopeClass,
    /// Zone index (IPv6 link-local only).
    pub zone: Option<u32>,
    /// Name of the interface carrying the address.
    pub interface: String,
}

impl SourceAddress {
    /// Build a source address, classifying it in the process.
    ///
    /// The zone is retained only for IPv6 link-local addresses; other
    /// scopes are zone-free by construction.
    pub fn new(addr: IpAddr, zone: Option<u32>, interface: String) -> Self {
        let scope = classify(&addr);
        let zone = if scope == ScopeClass::Lla { zone } else { None };
        Self {
            addr,
            scope,
            zone,
            interface,
        }
    }

    /// Address family.
    pub fn family(&self) -> AddrFamily {
        AddrFamily::of(&self.addr)
    }

    /// Identity key of this source.
    pub fn key(&self) -> SourceKey {
        SourceKey {
            addr: self.addr,
            zone: self.zone,
        }
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Some(zone) => write!(f, "{}%{} ({})", self.addr, zone, self.scope),
            None => write!(f, "{} ({})", self.addr, self.scope),
        }
    }
}

/// An IPv6 default gateway, with its zone when link-local.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayV6 {
    /// Gateway address (typically fe80::/10).
    pub addr: Ipv6Addr,
    /// Zone index of the gateway's link.
    pub zone: Option<u32>,
}

impl fmt::Display for GatewayV6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Some(zone) => write!(f, "{}%{}", self.addr, zone),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// Snapshot of the host's usable sources and default gateways.
#[derive(Clone, Debug)]
pub struct HostInventory {
    /// Usable source addresses across up interfaces.
    pub sources: Vec<SourceAddress>,
    /// IPv6 default gateway, if any.
    pub gateway6: Option<GatewayV6>,
    /// IPv4 default gateway, if any.
    pub gateway4: Option<Ipv4Addr>,
    /// When the snapshot was taken.
    pub taken_at: Instant,
}

impl HostInventory {
    /// Take a fresh snapshot from the operating system.
    ///
    /// Enumerates addresses on up, non-loopback interfaces and reads the
    /// default gateways. Fails only when the OS address query itself fails;
    /// missing gateways are represented as `None`.
    pub fn refresh() -> io::Result<Self> {
        let sources = ifaddrs::collect_sources()?;
        let (gateway6, gateway4) = gateways::default_gateways();
        log::debug!(
            "[INVENTORY] refreshed: {} sources, gw6={:?}, gw4={:?}",
            sources.len(),
            gateway6.map(|g| g.to_string()),
            gateway4.map(|g| g.to_string()),
        );
        Ok(Self {
            sources,
            gateway6,
            gateway4,
            taken_at: Instant::now(),
        })
    }

    /// Build an inventory from known parts (used by tests and callers that
    /// already hold a snapshot).
    pub fn from_parts(
        sources: Vec<SourceAddress>,
        gateway6: Option<GatewayV6>,
        gateway4: Option<Ipv4Addr>,
    ) -> Self {
        Self {
            sources,
            gateway6,
            gateway4,
            taken_at: Instant::now(),
        }
    }

    /// The usable source addresses.
    pub fn sources(&self) -> &[SourceAddress] {
        &self.sources
    }

    /// The default gateways as an (IPv6, IPv4) pair.
    pub fn gateways(&self) -> (Option<GatewayV6>, Option<Ipv4Addr>) {
        (self.gateway6, self.gateway4)
    }

    /// Whether the snapshot contains the given source identity.
    pub fn contains(&self, key: &SourceKey) -> bool {
        self.sources.iter().any(|s| s.key() == *key)
    }

    /// Whether any unique-local source is present.
    pub fn ula_present(&self) -> bool {
        self.sources.iter().any(|s| s.scope == ScopeClass::Ula)
    }
}

/// Differences between two inventory snapshots, keyed by source identity.
#[derive(Clone, Debug, Default)]
pub struct InventoryDiff {
    /// Sources present in `next` but not in `prev`.
    pub added: Vec<SourceAddress>,
    /// Sources present in `prev` but not in `next`.
    pub removed: Vec<SourceAddress>,
}

impl InventoryDiff {
    /// Whether the snapshots are identical in source content.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the source-address differences between two snapshots.
pub fn diff(prev: &HostInventory, next: &HostInventory) -> InventoryDiff {
    let mut out = InventoryDiff::default();
    for s in &prev.sources {
        if !next.contains(&s.key()) {
            out.removed.push(s.clone());
        }
    }
    for s in &next.sources {
        if !prev.contains(&s.key()) {
            out.added.push(s.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(addr: &str, zone: Option<u32>) -> SourceAddress {
        SourceAddress::new(addr.parse().unwrap(), zone, "eth0".to_string())
    }

    #[test]
    fn test_source_address_classifies() {
        assert_eq!(src("2001:db8::1", None).scope, ScopeClass::Gua);
        assert_eq!(src("192.168.1.10", None).scope, ScopeClass::Rfc1918);
    }

    #[test]
    fn test_source_zone_kept_for_lla_only() {
        assert_eq!(src("fe80::1", Some(2)).zone, Some(2));
        // A zone reported for a global address is dropped.
        assert_eq!(src("2001:db8::1", Some(2)).zone, None);
    }

    #[test]
    fn test_source_key_distinguishes_zones() {
        let a = src("fe80::1", Some(2));
        let b = src("fe80::1", Some(3));
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_inventory_contains_and_ula() {
        let inv = HostInventory::from_parts(
            vec![src("fd00::1", None), src("192.168.1.10", None)],
            None,
            None,
        );
        assert!(inv.contains(&src("fd00::1", None).key()));
        assert!(!inv.contains(&src("fd00::2", None).key()));
        assert!(inv.ula_present());
    }

    #[test]
    fn test_diff_added_and_removed() {
        let prev = HostInventory::from_parts(
            vec![src("2001:db8::1", None), src("192.168.1.10", None)],
            None,
            None,
        );
        let next = HostInventory::from_parts(
            vec![src("192.168.1.10", None), src("fd00::1", None)],
            None,
            None,
        );

        let d = diff(&prev, &next);
        assert_eq!(d.removed.len(), 1);
        assert_eq!(d.removed[0].addr, "2001:db8::1".parse::<IpAddr>().unwrap());
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.added[0].addr, "fd00::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_diff_empty_for_identical() {
        let a = HostInventory::from_parts(vec![src("fe80::1", Some(2))], None, None);
        let b = HostInventory::from_parts(vec![src("fe80::1", Some(2))], None, None);
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_refresh_does_not_panic() {
        // Environment dependent; may legitimately return an empty set in a
        // minimal container.
        if let Ok(inv) = HostInventory::refresh() {
            for s in inv.sources() {
                assert!(s.scope.probe_usable(), "unusable scope in inventory: {}", s);
            }
        }
    }
}
