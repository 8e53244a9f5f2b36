// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Source-address enumeration via getifaddrs.
//!
//! Walks the interface address list and keeps the addresses that qualify
//! as probe sources: the interface is up and not loopback, and the address
//! scope is one the prober may bind to. Cross-platform fallbacks return an
//! empty set rather than failing.

use std::io;

use super::SourceAddress;

/// Enumerate the usable source addresses of this host.
#[cfg(unix)]
pub fn collect_sources() -> io::Result<Vec<SourceAddress>> {
    use std::ffi::CStr;
    use std::net::IpAddr;

    let mut sources = Vec::new();
    let mut ifaddrs: *mut libc::ifaddrs = std::ptr::null_mut();

    // SAFETY:
    // - `ifaddrs` is a valid pointer to a null pointer for getifaddrs to
    //   populate
    // - getifaddrs allocates a linked list that must be released with
    //   freeifaddrs (done at the end of this function)
    let ret = unsafe { libc::getifaddrs(&mut ifaddrs) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut ifa = ifaddrs;
    while !ifa.is_null() {
        // SAFETY:
        // - `ifa` is non-null (checked in the loop condition)
        // - the entry comes from getifaddrs and stays valid until
        //   freeifaddrs
        let entry = unsafe { &*ifa };
        ifa = entry.ifa_next;

        let flags = entry.ifa_flags;
        if flags & (libc::IFF_UP as u32) == 0 {
            continue;
        }
        if flags & (libc::IFF_LOOPBACK as u32) != 0 {
            continue;
        }
        if entry.ifa_addr.is_null() {
            continue;
        }

        // SAFETY:
        // - `entry.ifa_name` is non-null and NUL-terminated per getifaddrs
        // - converted to an owned String immediately
        let interface = unsafe { CStr::from_ptr(entry.ifa_name) }
            .to_string_lossy()
            .into_owned();

        // SAFETY:
        // - `entry.ifa_addr` is non-null (checked above) and valid until
        //   freeifaddrs; only sa_family is read here
        let family = unsafe { (*entry.ifa_addr).sa_family } as i32;

        let (addr, zone): (IpAddr, Option<u32>) = match family {
            libc::AF_INET => {
                let sockaddr_in = entry.ifa_addr as *const libc::sockaddr_in;
                // SAFETY:
                // - sa_family == AF_INET guarantees a sockaddr_in layout
                // - alignment matches sockaddr, pointer valid per above
                let raw = unsafe { (*sockaddr_in).sin_addr.s_addr };
                (
                    IpAddr::V4(std::net::Ipv4Addr::from(u32::from_be(raw))),
                    None,
                )
            }
            libc::AF_INET6 => {
                let sockaddr_in6 = entry.ifa_addr as *const libc::sockaddr_in6;
                // SAFETY:
                // - sa_family == AF_INET6 guarantees a sockaddr_in6 layout
                // - alignment matches sockaddr, pointer valid per above
                let (raw, scope_id) =
                    unsafe { ((*sockaddr_in6).sin6_addr.s6_addr, (*sockaddr_in6).sin6_scope_id) };
                let zone = if scope_id != 0 { Some(scope_id) } else { None };
                (IpAddr::V6(std::net::Ipv6Addr::from(raw)), zone)
            }
            _ => continue,
        };

        let source = SourceAddress::new(addr, zone, interface);
        if !source.scope.probe_usable() {
            continue;
        }
        sources.push(source);
    }

    // SAFETY:
    // - `ifaddrs` is the list head returned by getifaddrs and has not been
    //   freed yet; freeifaddrs is its designated release function
    unsafe { libc::freeifaddrs(ifaddrs) };

    Ok(sources)
}

/// Stub for platforms without getifaddrs.
#[cfg(not(unix))]
pub fn collect_sources() -> io::Result<Vec<SourceAddress>> {
    Ok(Vec::new())
}
