// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Address scope classification and pair validity.
//!
//! Pure functions over address bit patterns. Classification is total: every
//! syntactically valid `IpAddr` maps to exactly one [`ScopeClass`], and the
//! mapping never consults the network or the host inventory.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::inventory::SourceAddress;
use crate::oracle::DestinationAddress;

/// Address family.
///
/// Ordering is deliberate: IPv6 sorts before IPv4, matching the family
/// ordering of query results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AddrFamily {
    /// IPv6.
    V6,
    /// IPv4.
    V4,
}

impl AddrFamily {
    /// Family of an address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddrFamily::V4,
            IpAddr::V6(_) => AddrFamily::V6,
        }
    }
}

impl fmt::Display for AddrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrFamily::V6 => write!(f, "IPv6"),
            AddrFamily::V4 => write!(f, "IPv4"),
        }
    }
}

/// Scope class of an address, derived purely from its bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ScopeClass {
    /// IPv6 global unicast (2000::/3, excluding ULA).
    Gua,
    /// IPv6 unique local (fc00::/7).
    Ula,
    /// IPv6 link-local (fe80::/10).
    Lla,
    /// IPv6 loopback (::1).
    V6Loopback,
    /// IPv6 multicast (ff00::/8).
    V6Multicast,
    /// The unspecified address of either family.
    Unspecified,
    /// Globally routable IPv4.
    V4Global,
    /// IPv4 private space (10/8, 172.16/12, 192.168/16).
    Rfc1918,
    /// IPv4 link-local (169.254/16).
    V4LinkLocal,
    /// IPv4 loopback (127/8).
    V4Loopback,
    /// IPv4 multicast (224/4).
    V4Multicast,
}

impl ScopeClass {
    /// Whether addresses of this class may appear on either side of a probe.
    ///
    /// Loopback, multicast and unspecified addresses are never probed.
    pub fn probe_usable(&self) -> bool {
        !matches!(
            self,
            ScopeClass::V6Loopback
                | ScopeClass::V6Multicast
                | ScopeClass::V4Loopback
                | ScopeClass::V4Multicast
                | ScopeClass::Unspecified
        )
    }

    /// Whether this class belongs to IPv6.
    pub fn is_ipv6(&self) -> bool {
        matches!(
            self,
            ScopeClass::Gua
                | ScopeClass::Ula
                | ScopeClass::Lla
                | ScopeClass::V6Loopback
                | ScopeClass::V6Multicast
        )
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            ScopeClass::Gua => "GUA",
            ScopeClass::Ula => "ULA",
            ScopeClass::Lla => "LLA",
            ScopeClass::V6Loopback => "v6-loopback",
            ScopeClass::V6Multicast => "v6-mcast",
            ScopeClass::Unspecified => "unspecified",
            ScopeClass::V4Global => "v4-global",
            ScopeClass::Rfc1918 => "RFC1918",
            ScopeClass::V4LinkLocal => "v4-LL",
            ScopeClass::V4Loopback => "v4-loopback",
            ScopeClass::V4Multicast => "v4-mcast",
        }
    }
}

impl fmt::Display for ScopeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify an address into its scope class.
///
/// Total and deterministic. IPv6 unicast outside every special range
/// classifies as [`ScopeClass::Gua`] so unallocated space still gets a
/// class; the limited broadcast address pairs like multicast.
pub fn classify(addr: &IpAddr) -> ScopeClass {
    match addr {
        IpAddr::V6(v6) => {
            let seg0 = v6.segments()[0];
            if v6.is_unspecified() {
                ScopeClass::Unspecified
            } else if v6.is_loopback() {
                ScopeClass::V6Loopback
            } else if (seg0 & 0xff00) == 0xff00 {
                ScopeClass::V6Multicast
            } else if (seg0 & 0xffc0) == 0xfe80 {
                ScopeClass::Lla
            } else if (seg0 & 0xfe00) == 0xfc00 {
                ScopeClass::Ula
            } else {
                ScopeClass::Gua
            }
        }
        IpAddr::V4(v4) => {
            let o = v4.octets();
            if v4.is_unspecified() {
                ScopeClass::Unspecified
            } else if v4.is_loopback() {
                ScopeClass::V4Loopback
            } else if v4.is_multicast() || v4.is_broadcast() {
                ScopeClass::V4Multicast
            } else if o[0] == 169 && o[1] == 254 {
                ScopeClass::V4LinkLocal
            } else if o[0] == 10
                || (o[0] == 172 && (o[1] & 0xf0) == 16)
                || (o[0] == 192 && o[1] == 168)
            {
                ScopeClass::Rfc1918
            } else {
                ScopeClass::V4Global
            }
        }
    }
}

/// Check whether a (source, destination) pair is even a candidate for
/// probing.
///
/// Rejects family mismatches, any loopback/multicast/unspecified end, and
/// link-local pairs that cross a link: a link-local address on one side
/// requires one on the other, and IPv6 link-local pairs must agree on the
/// zone (a destination without a zone is taken to be on the host's own
/// link).
pub fn intrinsically_valid(sa: &SourceAddress, da: &DestinationAddress) -> bool {
    if sa.family() != da.family() {
        return false;
    }
    if !sa.scope.probe_usable() || !da.scope.probe_usable() {
        return false;
    }
    match (sa.scope, da.scope) {
        (ScopeClass::Lla, ScopeClass::Lla) => match da.zone {
            Some(zone) => sa.zone == Some(zone),
            None => true,
        },
        (ScopeClass::Lla, _) | (_, ScopeClass::Lla) => false,
        (ScopeClass::V4LinkLocal, ScopeClass::V4LinkLocal) => true,
        (ScopeClass::V4LinkLocal, _) | (_, ScopeClass::V4LinkLocal) => false,
        _ => true,
    }
}

/// Heuristic for whether a destination lies beyond the local site.
///
/// Currently every global-scope destination is treated as off-site. A
/// longest-prefix match against the host's own assigned prefixes would be
/// the natural refinement and can slot in here without touching callers.
pub fn is_off_site(da: &DestinationAddress) -> bool {
    matches!(da.scope, ScopeClass::Gua | ScopeClass::V4Global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::DestinationRole;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v6(s: &str) -> IpAddr {
        s.parse::<Ipv6Addr>().unwrap().into()
    }

    fn v4(s: &str) -> IpAddr {
        s.parse::<Ipv4Addr>().unwrap().into()
    }

    fn source(addr: &str, zone: Option<u32>) -> SourceAddress {
        SourceAddress::new(addr.parse().unwrap(), zone, "eth0".to_string())
    }

    fn dest(addr: &str, zone: Option<u32>) -> DestinationAddress {
        DestinationAddress::new(addr.parse().unwrap(), zone, DestinationRole::User)
    }

    #[test]
    fn test_classify_v6() {
        assert_eq!(classify(&v6("2001:db8::1")), ScopeClass::Gua);
        assert_eq!(classify(&v6("fd00::1")), ScopeClass::Ula);
        assert_eq!(classify(&v6("fc12::1")), ScopeClass::Ula);
        assert_eq!(classify(&v6("fe80::1")), ScopeClass::Lla);
        assert_eq!(classify(&v6("::1")), ScopeClass::V6Loopback);
        assert_eq!(classify(&v6("ff02::1")), ScopeClass::V6Multicast);
        assert_eq!(classify(&v6("::")), ScopeClass::Unspecified);
    }

    #[test]
    fn test_classify_v6_edges() {
        // febf:: is still link-local, fec0:: is not.
        assert_eq!(classify(&v6("febf::1")), ScopeClass::Lla);
        assert_ne!(classify(&v6("fec0::1")), ScopeClass::Lla);
        // fe00:: is below the ULA range.
        assert_ne!(classify(&v6("fe00::1")), ScopeClass::Ula);
        // Unallocated space falls into the global catch-all.
        assert_eq!(classify(&v6("100::1")), ScopeClass::Gua);
    }

    #[test]
    fn test_classify_v4() {
        assert_eq!(classify(&v4("203.0.113.5")), ScopeClass::V4Global);
        assert_eq!(classify(&v4("10.1.2.3")), ScopeClass::Rfc1918);
        assert_eq!(classify(&v4("172.16.0.1")), ScopeClass::Rfc1918);
        assert_eq!(classify(&v4("172.31.255.1")), ScopeClass::Rfc1918);
        assert_eq!(classify(&v4("172.32.0.1")), ScopeClass::V4Global);
        assert_eq!(classify(&v4("192.168.1.10")), ScopeClass::Rfc1918);
        assert_eq!(classify(&v4("169.254.7.7")), ScopeClass::V4LinkLocal);
        assert_eq!(classify(&v4("127.0.0.1")), ScopeClass::V4Loopback);
        assert_eq!(classify(&v4("224.0.0.251")), ScopeClass::V4Multicast);
        assert_eq!(classify(&v4("255.255.255.255")), ScopeClass::V4Multicast);
        assert_eq!(classify(&v4("0.0.0.0")), ScopeClass::Unspecified);
    }

    #[test]
    fn test_classify_representatives_round_trip() {
        // One representative per class maps back to its class.
        let cases: &[(&str, ScopeClass)] = &[
            ("2001:db8::1", ScopeClass::Gua),
            ("fd00::1", ScopeClass::Ula),
            ("fe80::1", ScopeClass::Lla),
            ("::1", ScopeClass::V6Loopback),
            ("ff02::1", ScopeClass::V6Multicast),
            ("::", ScopeClass::Unspecified),
            ("198.51.100.2", ScopeClass::V4Global),
            ("192.168.1.1", ScopeClass::Rfc1918),
            ("169.254.1.1", ScopeClass::V4LinkLocal),
            ("127.0.0.1", ScopeClass::V4Loopback),
            ("239.255.0.1", ScopeClass::V4Multicast),
        ];
        for (addr, class) in cases {
            assert_eq!(classify(&addr.parse().unwrap()), *class, "{}", addr);
        }
    }

    #[test]
    fn test_valid_rejects_family_mismatch() {
        assert!(!intrinsically_valid(
            &source("2001:db8::1", None),
            &dest("203.0.113.5", None)
        ));
        assert!(!intrinsically_valid(
            &source("192.168.1.10", None),
            &dest("2001:db8::1", None)
        ));
    }

    #[test]
    fn test_valid_rejects_unprobeable_scopes() {
        assert!(!intrinsically_valid(
            &source("2001:db8::1", None),
            &dest("ff02::1", None)
        ));
        assert!(!intrinsically_valid(
            &source("127.0.0.1", None),
            &dest("203.0.113.5", None)
        ));
        assert!(!intrinsically_valid(
            &source("192.168.1.10", None),
            &dest("0.0.0.0", None)
        ));
    }

    #[test]
    fn test_valid_lla_zone_rules() {
        // Same zone is fine.
        assert!(intrinsically_valid(
            &source("fe80::1", Some(2)),
            &dest("fe80::2", Some(2))
        ));
        // Zone mismatch crosses links.
        assert!(!intrinsically_valid(
            &source("fe80::1", Some(2)),
            &dest("fe80::2", Some(3))
        ));
        // Destination without a zone is taken as on-link.
        assert!(intrinsically_valid(
            &source("fe80::1", Some(2)),
            &dest("fe80::2", None)
        ));
        // Link-local never pairs with a wider scope, either way around.
        assert!(!intrinsically_valid(
            &source("fe80::1", Some(2)),
            &dest("2001:db8::1", None)
        ));
        assert!(!intrinsically_valid(
            &source("2001:db8::1", None),
            &dest("fe80::2", Some(2))
        ));
    }

    #[test]
    fn test_valid_v4_link_local_rules() {
        assert!(intrinsically_valid(
            &source("169.254.1.1", None),
            &dest("169.254.1.2", None)
        ));
        assert!(!intrinsically_valid(
            &source("169.254.1.1", None),
            &dest("203.0.113.5", None)
        ));
        assert!(!intrinsically_valid(
            &source("192.168.1.10", None),
            &dest("169.254.1.2", None)
        ));
    }

    #[test]
    fn test_valid_ordinary_pairs() {
        assert!(intrinsically_valid(
            &source("2001:db8::1", None),
            &dest("2001:db8:1::1", None)
        ));
        assert!(intrinsically_valid(
            &source("fd00::1", None),
            &dest("2001:db8::1", None)
        ));
        assert!(intrinsically_valid(
            &source("192.168.1.10", None),
            &dest("203.0.113.5", None)
        ));
    }

    #[test]
    fn test_off_site() {
        assert!(is_off_site(&dest("2001:db8::1", None)));
        assert!(is_off_site(&dest("203.0.113.5", None)));
        assert!(!is_off_site(&dest("fd00::1", None)));
        assert!(!is_off_site(&dest("192.168.1.10", None)));
        assert!(!is_off_site(&dest("fe80::2", Some(2))));
    }
}
