//! A NAT-PMP response encoding and decoding.

use std::net::Ipv4Addr;

use super::{MapProtocol, Opcode, RESPONSE_INDICATOR, Version};
use crate::status::ResultCode;

/// Kind of [`Response`] expected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// A [`PublicAddressResponse`].
    PublicAddress,
    /// A [`PortMapResponse`].
    PortMap,
}

impl ResponseKind {
    /// Exact size of an encoded response of this kind.
    pub const fn size(self) -> usize {
        match self {
            ResponseKind::PublicAddress => PublicAddressResponse::SIZE,
            ResponseKind::PortMap => PortMapResponse::SIZE,
        }
    }
}

/// Fields common to every NAT-PMP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Version reported by the server.
    pub version: u8,
    /// Opcode of the request, with the [`RESPONSE_INDICATOR`] set.
    pub opcode: u8,
    /// Result of the request.
    pub result_code: ResultCode,
    /// Seconds since the server's epoch, usually its last boot.
    pub epoch_time: u32,
}

impl Header {
    const SIZE: usize = 1 + // version
        1 + // opcode
        2 + // result code
        4; // epoch time

    /// Decodes the header. The caller must ensure `buf` holds at least [`Header::SIZE`] bytes.
    fn decode(buf: &[u8]) -> Self {
        Header {
            version: buf[0],
            opcode: buf[1],
            result_code: u16::from_be_bytes([buf[2], buf[3]]).into(),
            epoch_time: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    /// Rejects headers whose version is not [`Version::NatPmp`].
    pub fn check_version(&self) -> Result<(), DecodeError> {
        Version::try_from(self.version)
            .map(|_| ())
            .map_err(|_| DecodeError::BadVersion(self.version))
    }

    #[cfg(test)]
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.version);
        buf.push(self.opcode);
        buf.extend_from_slice(&u16::from(self.result_code).to_be_bytes());
        buf.extend_from_slice(&self.epoch_time.to_be_bytes());
    }
}

/// Response to a [`Opcode::DetermineExternalAddress`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicAddressResponse {
    pub header: Header,
    /// External address of the gateway.
    pub public_ip: Ipv4Addr,
}

impl PublicAddressResponse {
    /// Size of an encoded [`PublicAddressResponse`].
    pub const SIZE: usize = Header::SIZE + 4; // public ip

    /// Decode a response to a [`Opcode::DetermineExternalAddress`] request.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        check_len(buf, Self::SIZE)?;
        let header = Header::decode(buf);
        let ip_bytes: [u8; 4] = [buf[8], buf[9], buf[10], buf[11]];
        Ok(PublicAddressResponse {
            header,
            public_ip: ip_bytes.into(),
        })
    }

    /// The external address as a big-endian 32 bit integer.
    pub fn ip_int(&self) -> u32 {
        self.public_ip.into()
    }
}

/// Response to a [`Opcode::MapUdp`] or [`Opcode::MapTcp`] request.
///
/// The external port is the one granted by the server, which is not necessarily the one
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapResponse {
    pub header: Header,
    /// Local port for which the mapping was created.
    pub private_port: u16,
    /// External port registered for this mapping.
    pub external_port: u16,
    /// Lifetime in seconds that can be assumed by this mapping.
    pub lifetime_seconds: u32,
}

impl PortMapResponse {
    /// Size of an encoded [`PortMapResponse`].
    pub const SIZE: usize = Header::SIZE +
        2 + // private port
        2 + // public port
        4; // lifetime

    /// Decode a response to a mapping request.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        check_len(buf, Self::SIZE)?;
        let header = Header::decode(buf);
        Ok(PortMapResponse {
            header,
            private_port: u16::from_be_bytes([buf[8], buf[9]]),
            external_port: u16::from_be_bytes([buf[10], buf[11]]),
            lifetime_seconds: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Protocol of the mapping, as reported by the response opcode.
    pub fn proto(&self) -> Option<MapProtocol> {
        MapProtocol::try_from(self.header.opcode & !RESPONSE_INDICATOR).ok()
    }
}

/// A decoded NAT-PMP Response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
pub enum Response {
    /// Response to a [`Opcode::DetermineExternalAddress`] request.
    PublicAddress(PublicAddressResponse),
    /// Response to a [`Opcode::MapUdp`] or [`Opcode::MapTcp`] request.
    PortMap(PortMapResponse),
}

/// A response type that can be decoded on its own.
pub trait DecodeResponse: Sized + Copy + Into<Response> {
    /// The kind of this response.
    const KIND: ResponseKind;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError>;

    fn header(&self) -> &Header;
}

impl DecodeResponse for PublicAddressResponse {
    const KIND: ResponseKind = ResponseKind::PublicAddress;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        PublicAddressResponse::decode(buf)
    }

    fn header(&self) -> &Header {
        &self.header
    }
}

impl DecodeResponse for PortMapResponse {
    const KIND: ResponseKind = ResponseKind::PortMap;

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        PortMapResponse::decode(buf)
    }

    fn header(&self) -> &Header {
        &self.header
    }
}

/// Errors that can occur when decoding a [`Response`] from a server.
#[derive(Debug, derive_more::Display, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The datagram does not have the exact size of the expected response.
    #[display("Response has {actual} bytes, expected {expected}")]
    BadLength { expected: usize, actual: usize },
    /// The received version is not recognized.
    #[display("Invalid version received: {_0}")]
    BadVersion(u8),
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), DecodeError> {
    if buf.len() != expected {
        return Err(DecodeError::BadLength {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

impl Response {
    /// Decode a response of the given kind.
    ///
    /// Any version byte is accepted, see [`Response::check_version`].
    pub fn decode(buf: &[u8], kind: ResponseKind) -> Result<Self, DecodeError> {
        match kind {
            ResponseKind::PublicAddress => PublicAddressResponse::decode(buf).map(Into::into),
            ResponseKind::PortMap => PortMapResponse::decode(buf).map(Into::into),
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Response::PublicAddress(r) => &r.header,
            Response::PortMap(r) => &r.header,
        }
    }

    pub fn result_code(&self) -> ResultCode {
        self.header().result_code
    }

    /// Rejects responses whose version is not [`Version::NatPmp`].
    pub fn check_version(&self) -> Result<(), DecodeError> {
        self.header().check_version()
    }

    /// Whether the opcode is the one a server uses to answer `opcode`.
    pub fn answers(&self, opcode: Opcode) -> bool {
        self.header().opcode == opcode.response_opcode()
    }

    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        match self {
            Response::PublicAddress(r) => {
                let mut buf = Vec::with_capacity(PublicAddressResponse::SIZE);
                r.header.encode(&mut buf);
                buf.extend_from_slice(&r.public_ip.octets());
                buf
            }
            Response::PortMap(r) => {
                let mut buf = Vec::with_capacity(PortMapResponse::SIZE);
                r.header.encode(&mut buf);
                buf.extend_from_slice(&r.private_port.to_be_bytes());
                buf.extend_from_slice(&r.external_port.to_be_bytes());
                buf.extend_from_slice(&r.lifetime_seconds.to_be_bytes());
                buf
            }
        }
    }

    #[cfg(test)]
    fn random<R: rand::Rng>(opcode: Opcode, rng: &mut R) -> Self {
        let header = Header {
            version: Version::NatPmp.into(),
            opcode: opcode.response_opcode(),
            result_code: ResultCode::Success,
            epoch_time: rng.r#gen(),
        };
        match opcode {
            Opcode::DetermineExternalAddress => {
                let octects: [u8; 4] = rng.r#gen();
                PublicAddressResponse {
                    header,
                    public_ip: octects.into(),
                }
                .into()
            }
            Opcode::MapUdp | Opcode::MapTcp => PortMapResponse {
                header,
                private_port: rng.r#gen(),
                external_port: rng.r#gen(),
                lifetime_seconds: rng.r#gen(),
            }
            .into(),
        }
    }
}
