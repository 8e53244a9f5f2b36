// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Query resolution - from a target name to ranked address pairs.
//!
//! The resolver turns a target (IP literal or FQDN) into an ordered list
//! of (family, source, destination) socket-address triples. Measured pairs
//! from the oracle come first-class with their rolling latency; for
//! destinations the oracle has no evidence on yet, a rule table keyed by
//! the connectivity flags suggests sources with synthetic latencies, so a
//! caller iterating the list sequentially tries the most plausible
//! combinations first.
//!
//! DNS is a black box: `ToSocketAddrs` does the lookup, and its results
//! are collated IPv6-first.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

use serde::Serialize;

use crate::config::{
    SYNTHETIC_LATENCY_GUA_MS, SYNTHETIC_LATENCY_LLA_MS, SYNTHETIC_LATENCY_NPTV6_MS,
    SYNTHETIC_LATENCY_ULA_MS, SYNTHETIC_LATENCY_V4_LL_MS, SYNTHETIC_LATENCY_V4_MS,
};
use crate::inventory::{gateways, SourceAddress, SourceKey};
use crate::oracle::{ConnectivityFlags, DestKey, DestinationAddress, DestinationRole};
use crate::scope::{AddrFamily, ScopeClass};
use crate::service::Shared;

// ============================================================================
// Result type
// ============================================================================

/// One ranked (family, source, destination) triple.
///
/// Both socket addresses are ready for the native bind/connect calls: the
/// source carries port 0, the destination the queried port, and IPv6
/// link-local addresses carry their scope-id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AddrPair {
    /// Address family of both ends.
    pub family: AddrFamily,
    /// Bind address (port 0).
    pub source: SocketAddr,
    /// Connect address (queried port).
    pub destination: SocketAddr,
    /// Rolling average latency for measured pairs, synthetic estimate
    /// otherwise.
    pub latency_ms: u32,
    /// Whether the latency was measured by a probe.
    pub measured: bool,
}

// ============================================================================
// Target resolution
// ============================================================================

/// Parse an IP literal, including `%zone` suffixes on IPv6 link-locals.
///
/// The zone may be an interface name or a numeric index.
fn parse_literal(target: &str) -> Option<(IpAddr, Option<u32>)> {
    if let Ok(addr) = target.parse::<IpAddr>() {
        return Some((addr, None));
    }
    let (addr_part, zone_part) = target.rsplit_once('%')?;
    let addr = addr_part.parse::<Ipv6Addr>().ok()?;
    let zone = match zone_part.parse::<u32>() {
        Ok(index) => Some(index),
        Err(_) => gateways::zone_index(zone_part),
    };
    // An unresolvable zone name leaves the destination without a zone; the
    // validity rules then treat it as on-link.
    Some((IpAddr::V6(addr), zone))
}

/// Resolve a target to destination addresses, IPv6 first.
///
/// Within each family the resolver's own order is preserved. An empty
/// target, a failed lookup, and an empty answer all resolve to nothing.
fn resolve_target(target: &str, port: u16) -> Vec<(IpAddr, Option<u32>)> {
    if target.is_empty() {
        return Vec::new();
    }
    if let Some(literal) = parse_literal(target) {
        return vec![literal];
    }

    let answers = match (target, port).to_socket_addrs() {
        Ok(iter) => iter.collect::<Vec<_>>(),
        Err(e) => {
            log::debug!("[QUERY] resolution failed for '{}': {}", target, e);
            return Vec::new();
        }
    };

    let mut out: Vec<(IpAddr, Option<u32>)> = Vec::new();
    let mut push = |addr: IpAddr, zone: Option<u32>| {
        if !out.iter().any(|(a, z)| *a == addr && *z == zone) {
            out.push((addr, zone));
        }
    };
    for sockaddr in answers.iter() {
        if let SocketAddr::V6(v6) = sockaddr {
            let zone = (v6.scope_id() != 0).then_some(v6.scope_id());
            push(IpAddr::V6(*v6.ip()), zone);
        }
    }
    for sockaddr in answers.iter() {
        if let SocketAddr::V4(v4) = sockaddr {
            push(IpAddr::V4(*v4.ip()), None);
        }
    }
    out
}

// ============================================================================
// Rule-based source selection
// ============================================================================

/// A pre-assembly candidate.
struct Candidate {
    source: SourceAddress,
    dest_addr: IpAddr,
    dest_zone: Option<u32>,
    latency_ms: u32,
    measured: bool,
    rule_rank: u8,
}

/// Suggest sources for a destination without measured evidence.
///
/// Several rules may fire for the same destination; the caller
/// deduplicates. Rule ranks break synthetic-latency ties in the order the
/// rules are listed here.
fn rule_candidates(
    da: &DestinationAddress,
    sources: &[SourceAddress],
    flags: &ConnectivityFlags,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut suggest = |scope: ScopeClass, latency: u32, rank: u8, zone_match: bool| {
        for sa in sources.iter().filter(|s| s.scope == scope) {
            if zone_match {
                if let Some(zone) = da.zone {
                    if sa.zone != Some(zone) {
                        continue;
                    }
                }
            }
            out.push(Candidate {
                source: sa.clone(),
                dest_addr: da.addr,
                dest_zone: da.zone,
                latency_ms: latency,
                measured: false,
                rule_rank: rank,
            });
        }
    };

    match da.family() {
        AddrFamily::V6 => {
            if da.scope == ScopeClass::Gua && flags.gua_ok {
                suggest(ScopeClass::Gua, SYNTHETIC_LATENCY_GUA_MS, 0, false);
            }
            if da.scope == ScopeClass::Ula {
                suggest(ScopeClass::Ula, SYNTHETIC_LATENCY_ULA_MS, 1, false);
            }
            if da.scope == ScopeClass::Gua && flags.nptv6 {
                suggest(ScopeClass::Ula, SYNTHETIC_LATENCY_NPTV6_MS, 2, false);
            }
            if da.scope == ScopeClass::Lla && flags.lla_ok {
                suggest(ScopeClass::Lla, SYNTHETIC_LATENCY_LLA_MS, 3, true);
            }
        }
        AddrFamily::V4 => {
            if (da.scope == ScopeClass::V4Global && flags.nat44)
                || da.scope == ScopeClass::Rfc1918
            {
                suggest(ScopeClass::Rfc1918, SYNTHETIC_LATENCY_V4_MS, 4, false);
            }
            if da.scope == ScopeClass::V4Global && flags.ipv4_ok {
                suggest(ScopeClass::V4Global, SYNTHETIC_LATENCY_V4_MS, 5, false);
            }
            if da.scope == ScopeClass::V4LinkLocal {
                suggest(ScopeClass::V4LinkLocal, SYNTHETIC_LATENCY_V4_LL_MS, 6, false);
            }
        }
    }
    out
}

// ============================================================================
// Query
// ============================================================================

/// Answer a query: resolve, merge oracle evidence with the rule table,
/// rank, and assemble socket-address triples.
pub(crate) fn get_addr_pairs(shared: &Shared, target: &str, port: u16) -> Vec<AddrPair> {
    let resolved = resolve_target(target, port);
    if resolved.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    {
        let mut oracle = shared.oracle.lock();
        let mut seen: BTreeSet<(SourceKey, DestKey)> = BTreeSet::new();

        for (addr, zone) in &resolved {
            let entry = DestinationAddress::new(*addr, *zone, DestinationRole::User);
            let key = entry.key();
            oracle.add_da(entry);
            oracle.touch_da(&key);

            let measured = oracle.pairs_for_dest(&key);
            if !measured.is_empty() {
                for pair in measured {
                    if seen.insert((pair.source.key(), key)) {
                        candidates.push(Candidate {
                            source: pair.source.clone(),
                            dest_addr: key.addr,
                            dest_zone: key.zone,
                            latency_ms: pair.avg_latency_ms,
                            measured: true,
                            rule_rank: 0,
                        });
                    }
                }
                continue;
            }

            // No evidence yet (new destination, or known but unprobed):
            // fall back to the rule table.
            let da = match oracle.dest(&key) {
                Some(da) => da.clone(),
                None => continue,
            };
            let flags = oracle.flags();
            for candidate in rule_candidates(&da, oracle.sources(), &flags) {
                if seen.insert((candidate.source.key(), key)) {
                    candidates.push(candidate);
                }
            }
        }
    }

    // Rank: IPv6 before IPv4, then latency ascending; a measured value
    // beats a synthetic one of the same size, and synthetic ties resolve
    // in rule order.
    candidates.sort_by_key(|c| {
        (
            AddrFamily::of(&c.dest_addr),
            c.latency_ms,
            u8::from(!c.measured),
            c.rule_rank,
        )
    });

    let pairs: Vec<AddrPair> = candidates
        .iter()
        .filter_map(|c| assemble(c, port))
        .collect();
    log::debug!(
        "[QUERY] '{}' port {} -> {} pairs",
        target,
        port,
        pairs.len()
    );
    pairs
}

/// Build the socket-address triple for a candidate.
fn assemble(c: &Candidate, port: u16) -> Option<AddrPair> {
    match (c.source.addr, c.dest_addr) {
        (IpAddr::V6(s), IpAddr::V6(d)) => {
            let source_scope = c.source.zone.unwrap_or(0);
            let dest_scope = c.dest_zone.or(c.source.zone).unwrap_or(0);
            Some(AddrPair {
                family: AddrFamily::V6,
                source: SocketAddr::V6(SocketAddrV6::new(s, 0, 0, source_scope)),
                destination: SocketAddr::V6(SocketAddrV6::new(d, port, 0, dest_scope)),
                latency_ms: c.latency_ms,
                measured: c.measured,
            })
        }
        (IpAddr::V4(s), IpAddr::V4(d)) => Some(AddrPair {
            family: AddrFamily::V4,
            source: SocketAddr::V4(SocketAddrV4::new(s, 0)),
            destination: SocketAddr::V4(SocketAddrV4::new(d, port)),
            latency_ms: c.latency_ms,
            measured: c.measured,
        }),
        // Candidates are same-family by construction.
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
