// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connect probe engine.
//!
//! A probe binds a TCP socket to an exact source address, attempts a
//! connection to the destination within a wall-clock deadline, and reports
//! the connect latency. The engine is stateless and thread-safe; it never
//! interprets the result - converting failures into evidence is the poll
//! worker's job.

use std::fmt;
use std::io;
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};

use crate::inventory::SourceAddress;
use crate::oracle::DestinationAddress;

/// Why a probe failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The source address could not be bound.
    Bind(io::ErrorKind),
    /// The destination actively refused the connection.
    Refused,
    /// The deadline elapsed before the connection completed.
    Timeout,
    /// The destination was unreachable or another transport error occurred.
    Unreachable(io::ErrorKind),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(kind) => write!(f, "bind failed: {:?}", kind),
            Self::Refused => write!(f, "connection refused"),
            Self::Timeout => write!(f, "connect timed out"),
            Self::Unreachable(kind) => write!(f, "unreachable: {:?}", kind),
        }
    }
}

/// Outcome of a single probe attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The connection completed; latency in milliseconds (floor 1).
    Success {
        /// Time from connect initiation to established, in ms.
        latency_ms: u32,
    },
    /// The connection did not complete.
    Failure(ProbeFailure),
}

impl ProbeOutcome {
    /// Whether the probe succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }
}

/// Stateless TCP connect prober.
///
/// Holds only the timeout and default port; concurrent probes from
/// multiple threads are fine.
#[derive(Clone, Copy, Debug)]
pub struct ProbeEngine {
    timeout: Duration,
    port: u16,
}

impl ProbeEngine {
    /// Create an engine with the given per-probe deadline and default port.
    pub fn new(timeout: Duration, port: u16) -> Self {
        Self { timeout, port }
    }

    /// Probe a pair on the engine's default port.
    pub fn probe(&self, sa: &SourceAddress, da: &DestinationAddress) -> ProbeOutcome {
        self.probe_port(sa, da, self.port)
    }

    /// Probe a pair on an explicit port.
    ///
    /// Defined separately so alternative probe ports can be plugged in
    /// without changing the engine contract.
    pub fn probe_port(&self, sa: &SourceAddress, da: &DestinationAddress, port: u16) -> ProbeOutcome {
        let (domain, bind_addr, connect_addr) = match (sa.addr, da.addr) {
            (std::net::IpAddr::V6(s), std::net::IpAddr::V6(d)) => {
                // The connect scope comes from the destination zone when it
                // has one, otherwise from the source's own link.
                let scope = da.zone.or(sa.zone).unwrap_or(0);
                (
                    Domain::IPV6,
                    SocketAddr::V6(SocketAddrV6::new(s, 0, 0, sa.zone.unwrap_or(0))),
                    SocketAddr::V6(SocketAddrV6::new(d, port, 0, scope)),
                )
            }
            (std::net::IpAddr::V4(s), std::net::IpAddr::V4(d)) => (
                Domain::IPV4,
                SocketAddr::V4(SocketAddrV4::new(s, 0)),
                SocketAddr::V4(SocketAddrV4::new(d, port)),
            ),
            // Family mismatches are filtered upstream; report as unreachable
            // rather than panicking if one slips through.
            _ => return ProbeOutcome::Failure(ProbeFailure::Unreachable(io::ErrorKind::InvalidInput)),
        };

        let socket = match Socket::new(domain, Type::STREAM, Some(Protocol::TCP)) {
            Ok(s) => s,
            Err(e) => return ProbeOutcome::Failure(ProbeFailure::Unreachable(e.kind())),
        };
        if let Err(e) = socket.bind(&bind_addr.into()) {
            return ProbeOutcome::Failure(ProbeFailure::Bind(e.kind()));
        }

        let started = Instant::now();
        match socket.connect_timeout(&connect_addr.into(), self.timeout) {
            Ok(()) => {
                let elapsed = started.elapsed().as_millis() as u32;
                // Socket dropped here, closing the connection.
                ProbeOutcome::Success {
                    latency_ms: elapsed.max(1),
                }
            }
            Err(e) => {
                let failure = match e.kind() {
                    io::ErrorKind::ConnectionRefused => ProbeFailure::Refused,
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProbeFailure::Timeout,
                    kind => ProbeFailure::Unreachable(kind),
                };
                log::trace!("[PROBE] {} -> {}:{} failed: {}", sa, da, port, failure);
                ProbeOutcome::Failure(failure)
            }
        }
    }

    /// The per-probe deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The default probe port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}
