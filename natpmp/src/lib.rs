//! A NAT-PMP client.
//!
//! NAT-PMP lets a host behind a NAT ask its gateway for the external IPv4 address and for
//! port mappings, see [RFC 6886](https://datatracker.ietf.org/doc/html/rfc6886).
//!
//! Every operation is a single request and response exchange over UDP. Requests are retried
//! with a linearly growing timeout until the gateway answers or the configured number of
//! attempts is exhausted, in which case the gateway is considered to not support NAT-PMP.
//!
//! ```no_run
//! # async fn run() -> Result<(), natpmp::Error> {
//! let client = natpmp::Client::default();
//! let public_ip = client.public_address(None).await?;
//! let mapping = client.map_tcp_port(8080, 8080, 3600, None).await?;
//! println!("{public_ip}:{} -> {}", mapping.external_port, mapping.private_port);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(natpmp_docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod status;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{Client, Config};
pub use error::{Error, NetworkError};
pub use gateway::discover_gateway;
pub use protocol::{
    MapProtocol, PortMapResponse, PublicAddressResponse, Request, Response, SERVER_PORT,
};
pub use status::{ResultCode, describe, is_success};
