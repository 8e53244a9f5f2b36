// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Default-gateway discovery.
//!
//! On Linux the kernel routing tables are read from `/proc/net/route` and
//! `/proc/net/ipv6_route`. The text parsers are split out and pure so they
//! are testable without a live routing table. Other platforms report no
//! gateways, which the oracle treats as "none configured".

use std::net::{Ipv4Addr, Ipv6Addr};

use super::GatewayV6;

/// RTF_GATEWAY: the route has a next hop.
const RTF_GATEWAY: u32 = 0x0002;

/// Read the default gateways for both families.
#[cfg(target_os = "linux")]
pub fn default_gateways() -> (Option<GatewayV6>, Option<Ipv4Addr>) {
    let gw4 = std::fs::read_to_string("/proc/net/route")
        .ok()
        .and_then(|t| parse_default_gateway_v4(&t));
    let gw6 = std::fs::read_to_string("/proc/net/ipv6_route")
        .ok()
        .and_then(|t| parse_default_gateway_v6(&t))
        .map(|(addr, ifname)| GatewayV6 {
            addr,
            zone: zone_index(&ifname),
        });
    (gw6, gw4)
}

/// Stub for platforms without a /proc routing table.
#[cfg(not(target_os = "linux"))]
pub fn default_gateways() -> (Option<GatewayV6>, Option<Ipv4Addr>) {
    (None, None)
}

/// Resolve an interface name to its index.
#[cfg(unix)]
pub fn zone_index(ifname: &str) -> Option<u32> {
    let c_name = std::ffi::CString::new(ifname).ok()?;
    // SAFETY:
    // - `c_name` is a valid NUL-terminated string for the call's duration
    // - if_nametoindex only reads the name and returns 0 on failure
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        None
    } else {
        Some(index)
    }
}

#[cfg(not(unix))]
pub fn zone_index(_ifname: &str) -> Option<u32> {
    None
}

/// Parse `/proc/net/route` content and extract the IPv4 default gateway.
///
/// Columns: Iface, Destination, Gateway, Flags, ... where Destination and
/// Gateway are little-endian hex words. The default route has destination
/// 00000000 and RTF_GATEWAY set.
pub fn parse_default_gateway_v4(table: &str) -> Option<Ipv4Addr> {
    for line in table.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let _iface = fields.next()?;
        let dest = fields.next()?;
        let gateway = fields.next()?;
        let flags = fields.next()?;

        if dest != "00000000" {
            continue;
        }
        let flags = u32::from_str_radix(flags, 16).ok()?;
        if flags & RTF_GATEWAY == 0 {
            continue;
        }
        let raw = u32::from_str_radix(gateway, 16).ok()?;
        return Some(Ipv4Addr::from(raw.swap_bytes()));
    }
    None
}

/// Parse `/proc/net/ipv6_route` content and extract the IPv6 default
/// gateway with its interface name.
///
/// Columns: dest(32 hex), dest-plen, src, src-plen, next-hop(32 hex),
/// metric, refcnt, use, flags, device. The default route has an all-zero
/// destination with prefix length 00 and RTF_GATEWAY set.
pub fn parse_default_gateway_v6(table: &str) -> Option<(Ipv6Addr, String)> {
    for line in table.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let (dest, dest_plen, next_hop, flags, device) =
            (fields[0], fields[1], fields[4], fields[8], fields[9]);

        if dest_plen != "00" || dest.bytes().any(|b| b != b'0') {
            continue;
        }
        let flags = u32::from_str_radix(flags, 16).ok()?;
        if flags & RTF_GATEWAY == 0 {
            continue;
        }
        let addr = parse_hex_v6(next_hop)?;
        return Some((addr, device.to_string()));
    }
    None
}

/// Parse a 32-character hex string into an IPv6 address.
fn parse_hex_v6(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 {
        return None;
    }
    let mut octets = [0u8; 16];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).ok()?;
    }
    Some(Ipv6Addr::from(octets))
}
