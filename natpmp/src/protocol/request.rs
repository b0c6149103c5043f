use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{Opcode, ResponseKind, Version};

/// A NAT-PMP Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Ask the gateway for its external address.
    ExternalAddress,
    /// Ask the gateway to create, renew or release a mapping.
    Mapping {
        proto: MapProtocol,
        local_port: u16,
        external_port: u16,
        lifetime_seconds: u32,
    },
}

/// Protocol for which a port mapping is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, derive_more::Display)]
#[repr(u8)]
pub enum MapProtocol {
    #[display("UDP")]
    Udp = 1,
    #[display("TCP")]
    Tcp = 2,
}

impl MapProtocol {
    fn opcode(self) -> Opcode {
        match self {
            MapProtocol::Udp => Opcode::MapUdp,
            MapProtocol::Tcp => Opcode::MapTcp,
        }
    }
}

impl Request {
    /// Size of an encoded [`Request::ExternalAddress`].
    pub const EXTERNAL_ADDRESS_SIZE: usize = // header only
        1 + // version
        1; // opcode

    /// Size of an encoded [`Request::Mapping`].
    pub const MAPPING_SIZE: usize = Self::EXTERNAL_ADDRESS_SIZE +
        2 + // reserved
        2 + // local port
        2 + // external port
        4; // lifetime

    /// Opcode this request is sent with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::ExternalAddress => Opcode::DetermineExternalAddress,
            Request::Mapping { proto, .. } => proto.opcode(),
        }
    }

    /// Kind of response a server answers this request with.
    pub fn response_kind(&self) -> ResponseKind {
        match self {
            Request::ExternalAddress => ResponseKind::PublicAddress,
            Request::Mapping { .. } => ResponseKind::PortMap,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Request::ExternalAddress => vec![
                Version::NatPmp.into(),
                Opcode::DetermineExternalAddress.into(),
            ],
            Request::Mapping {
                proto,
                local_port,
                external_port,
                lifetime_seconds,
            } => {
                let mut buf = Vec::with_capacity(Self::MAPPING_SIZE);
                buf.push(Version::NatPmp.into());
                buf.push(proto.opcode().into());
                // reserved
                buf.push(0);
                buf.push(0);
                buf.extend_from_slice(&local_port.to_be_bytes());
                buf.extend_from_slice(&external_port.to_be_bytes());
                buf.extend_from_slice(&lifetime_seconds.to_be_bytes());
                buf
            }
        }
    }

    /// Decode a request, as a server would.
    #[cfg(test)]
    pub(crate) fn decode(buf: &[u8]) -> Option<Self> {
        let _: Version = (*buf.first()?).try_into().ok()?;
        let opcode: Opcode = (*buf.get(1)?).try_into().ok()?;
        let proto = match opcode {
            Opcode::DetermineExternalAddress if buf.len() == Self::EXTERNAL_ADDRESS_SIZE => {
                return Some(Request::ExternalAddress);
            }
            Opcode::DetermineExternalAddress => return None,
            Opcode::MapUdp => MapProtocol::Udp,
            Opcode::MapTcp => MapProtocol::Tcp,
        };
        if buf.len() != Self::MAPPING_SIZE || buf[2..4] != [0, 0] {
            return None;
        }
        Some(Request::Mapping {
            proto,
            local_port: u16::from_be_bytes(buf[4..6].try_into().ok()?),
            external_port: u16::from_be_bytes(buf[6..8].try_into().ok()?),
            lifetime_seconds: u32::from_be_bytes(buf[8..12].try_into().ok()?),
        })
    }
}
