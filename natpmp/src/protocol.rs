//! Definitions and utilities to encode and decode NAT-PMP messages.
//!
//! See [RFC 6886](https://datatracker.ietf.org/doc/html/rfc6886).

mod request;
mod response;

use num_enum::{IntoPrimitive, TryFromPrimitive};

pub use request::*;
pub use response::*;

/// Port to use when acting as a server. This is the one we direct requests to.
// PCP and NAT-PMP share same ports, reasigned by IANA from the older version to the new one. See
// <https://datatracker.ietf.org/doc/html/rfc6887#section-19>
pub const SERVER_PORT: u16 = 5351;

/// Nat Version according to [RFC 6886 Transition to Port Control Protocol](https://datatracker.ietf.org/doc/html/rfc6886#section-1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Version {
    /// NAT-PMP version
    NatPmp = 0,
}

/// Opcode accepted by a NAT-PMP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// Determine the external address of the gateway.
    ///
    /// See [RFC 6886 Determining the External Address](https://datatracker.ietf.org/doc/html/rfc6886#section-3.2).
    DetermineExternalAddress = 0,
    /// Get a UDP Mapping.
    ///
    /// See [RFC 6886 Requesting a Mapping](https://datatracker.ietf.org/doc/html/rfc6886#section-3.3).
    MapUdp = 1,
    /// Get a TCP Mapping.
    MapTcp = 2,
}

impl Opcode {
    /// Opcode a server sets in its response to a request with this opcode.
    pub const fn response_opcode(self) -> u8 {
        self as u8 | RESPONSE_INDICATOR
    }
}

/// Indicator ORd into the [`Opcode`] to indicate a response packet.
pub const RESPONSE_INDICATOR: u8 = 1u8 << 7;
