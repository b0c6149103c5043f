//! Errors surfaced by NAT-PMP operations.

use num_enum::TryFromPrimitiveError;

use crate::{
    protocol::{MapProtocol, Response},
    status::{LocalCode, ResultCode},
};

/// Errors that can occur while talking to a NAT-PMP gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request is structurally invalid. Nothing was sent.
    #[error("invalid request: {0}")]
    Validation(&'static str),
    /// The gateway could not be reached at the socket level.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// No valid response arrived after exhausting every attempt.
    #[error("{} No response after {attempts} attempts.", LocalCode::GatewayNotSupported)]
    Unsupported { attempts: u32 },
    /// The gateway answered with a result code other than [`ResultCode::Success`].
    ///
    /// The full response is kept so that granted values can still be inspected.
    #[error("gateway returned {code:?}: {code}")]
    Result { code: ResultCode, response: Response },
}

impl Error {
    /// Numeric code of this error, as understood by [`crate::status::describe`].
    ///
    /// Errors that have no code, such as IO errors, return `None`.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Validation(_) => None,
            Error::Network(NetworkError::Io(_)) => None,
            Error::Network(NetworkError::NoValidGateway) => Some(LocalCode::NoValidGateway.code()),
            Error::Network(NetworkError::GatewayNotFound) => {
                Some(LocalCode::GatewayNotFound.code())
            }
            Error::Unsupported { .. } => Some(LocalCode::GatewayNotSupported.code()),
            Error::Result { code, .. } => Some(u16::from(*code).into()),
        }
    }
}

impl From<TryFromPrimitiveError<MapProtocol>> for Error {
    fn from(_: TryFromPrimitiveError<MapProtocol>) -> Self {
        Error::Validation("protocol must be either UDP (1) or TCP (2)")
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Network(NetworkError::Io(e))
    }
}

/// Failures to locate or talk to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("{}", LocalCode::NoValidGateway)]
    NoValidGateway,
    #[error("{}", LocalCode::GatewayNotFound)]
    GatewayNotFound,
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
