// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Destination entries of the oracle.

use std::fmt;
use std::net::IpAddr;
use std::time::Instant;

use crate::scope::{classify, AddrFamily, ScopeClass};

/// Why a destination is in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestinationRole {
    /// Pre-selected reachability anchor, installed at init. Immortal.
    ProbeTarget,
    /// A default gateway, installed at init. Immortal.
    LocalGateway,
    /// Added lazily because a query referenced it. Garbage-collectable.
    User,
}

impl DestinationRole {
    /// Whether entries with this role survive for the process lifetime.
    pub fn is_immortal(&self) -> bool {
        !matches!(self, DestinationRole::User)
    }

    /// Priority for idempotent insertion: an existing entry is never
    /// downgraded to a lower-priority role.
    pub fn priority(&self) -> u8 {
        match self {
            DestinationRole::ProbeTarget => 2,
            DestinationRole::LocalGateway => 1,
            DestinationRole::User => 0,
        }
    }
}

impl fmt::Display for DestinationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationRole::ProbeTarget => write!(f, "probe-target"),
            DestinationRole::LocalGateway => write!(f, "local-gateway"),
            DestinationRole::User => write!(f, "user"),
        }
    }
}

/// Identity of a destination in the oracle.
///
/// The zone qualifier participates: the same link-local address reached
/// over two links is two destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DestKey {
    /// The raw address.
    pub addr: IpAddr,
    /// Zone index (IPv6 link-local only).
    pub zone: Option<u32>,
}

/// A candidate destination tracked by the oracle.
#[derive(Clone, Debug)]
pub struct DestinationAddress {
    /// The raw address.
    pub addr: IpAddr,
    /// Scope class, derived from the address bits.
    pub scope: ScopeClass,
    /// Zone index (IPv6 link-local only).
    pub zone: Option<u32>,
    /// Why the entry exists.
    pub role: DestinationRole,
    /// When the entry was installed.
    pub first_seen: Instant,
    /// When a query last referenced the entry.
    pub last_used: Instant,
}

impl DestinationAddress {
    /// Build a destination entry, classifying it in the process.
    pub fn new(addr: IpAddr, zone: Option<u32>, role: DestinationRole) -> Self {
        let scope = classify(&addr);
        let zone = if scope == ScopeClass::Lla { zone } else { None };
        let now = Instant::now();
        Self {
            addr,
            scope,
            zone,
            role,
            first_seen: now,
            last_used: now,
        }
    }

    /// Address family.
    pub fn family(&self) -> AddrFamily {
        AddrFamily::of(&self.addr)
    }

    /// Identity key of this destination.
    pub fn key(&self) -> DestKey {
        DestKey {
            addr: self.addr,
            zone: self.zone,
        }
    }

    /// Refresh the last-used stamp.
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

impl fmt::Display for DestinationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zone {
            Some(zone) => write!(f, "{}%{} ({}, {})", self.addr, zone, self.scope, self.role),
            None => write!(f, "{} ({}, {})", self.addr, self.scope, self.role),
        }
    }
}
