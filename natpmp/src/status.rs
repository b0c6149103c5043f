//! Interpretation of NAT-PMP result codes.
//!
//! Besides the codes sent by a server, a few local codes describe failures that happen before
//! any response is obtained. These never appear on the wire.

use num_enum::{FromPrimitive, IntoPrimitive};

/// Result code obtained in a NAT-PMP response.
///
/// See [RFC 6886 Result Codes](https://datatracker.ietf.org/doc/html/rfc6886#section-3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum ResultCode {
    /// A successful response.
    Success = 0,
    /// The sent version is not supported by the NAT-PMP server.
    UnsupportedVersion = 1,
    /// The gateway supports mapping, but the feature is turned off or the client is refused.
    NotAuthorizedOrRefused = 2,
    /// The gateway itself has no connectivity, e.g. it has not obtained a DHCP lease.
    NetworkFailure = 3,
    /// NAT-PMP server cannot create any more mappings at this time.
    OutOfResources = 4,
    /// Opcode is not supported by the server.
    UnsupportedOpcode = 5,
    /// Any other code. All of them are fatal errors.
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    pub fn description(self) -> &'static str {
        match self {
            ResultCode::Success => "No error.",
            ResultCode::UnsupportedVersion => "The protocol version specified is unsupported.",
            ResultCode::NotAuthorizedOrRefused => {
                "The operation was refused. NAT-PMP may be turned off on gateway."
            }
            ResultCode::NetworkFailure => {
                "There was a network failure. The gateway may not have an IP address."
            }
            ResultCode::OutOfResources => {
                "The NAT-PMP gateway is out of resources and cannot create more mappings."
            }
            ResultCode::UnsupportedOpcode => "The NAT-PMP gateway does not support this operation.",
            ResultCode::Unknown(_) => UNKNOWN,
        }
    }
}

/// Codes for failures detected locally, before or instead of a server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCode {
    /// No usable gateway address was given.
    NoValidGateway,
    /// The gateway never answered a request.
    GatewayNotSupported,
    /// The gateway address could not be discovered.
    GatewayNotFound,
}

impl LocalCode {
    pub const fn code(self) -> i32 {
        match self {
            LocalCode::NoValidGateway => -10,
            LocalCode::GatewayNotSupported => -11,
            LocalCode::GatewayNotFound => -12,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            LocalCode::NoValidGateway => "No valid gateway address was specified.",
            LocalCode::GatewayNotSupported => "The gateway does not support NAT-PMP.",
            LocalCode::GatewayNotFound => {
                "Cannot automatically determine gateway address. Must specify manually."
            }
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        [
            LocalCode::NoValidGateway,
            LocalCode::GatewayNotSupported,
            LocalCode::GatewayNotFound,
        ]
        .into_iter()
        .find(|local| local.code() == code)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

impl std::fmt::Display for LocalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

const UNKNOWN: &str = "Unknown fatal error.";

/// Human readable description of a result code, either sent by a server or a [`LocalCode`].
pub fn describe(code: i32) -> &'static str {
    if let Some(local) = LocalCode::from_code(code) {
        return local.description();
    }
    match u16::try_from(code) {
        Ok(code) => ResultCode::from(code).description(),
        Err(_) => UNKNOWN,
    }
}

/// Whether `code` reports a successful operation.
pub fn is_success(code: i32) -> bool {
    code == i32::from(u16::from(ResultCode::Success))
}
