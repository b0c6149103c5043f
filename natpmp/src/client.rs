//! The NAT-PMP transaction engine and the operations built on it.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, trace, warn};

use crate::{
    error::Error,
    gateway::discover_gateway,
    protocol::{
        DecodeResponse, MapProtocol, PortMapResponse, PublicAddressResponse, Request, SERVER_PORT,
    },
    transport::{GatewaySocket, Transport},
};

/// Number of attempts recommended by the NAT-PMP draft before giving up on a gateway.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 9;

/// Timeout of the first attempt. Each attempt waits this much longer than the previous one.
pub const DEFAULT_RETRY_INCREMENT: Duration = Duration::from_millis(250);

/// Recommended lifetime of a mapping, in seconds.
///
/// See <https://datatracker.ietf.org/doc/html/rfc6886#section-3.3>
pub const DEFAULT_LIFETIME_SECONDS: u32 = 60 * 60;

/// Large enough for any response. Datagrams longer than a valid response must not be truncated
/// into one.
const RECV_BUFFER_SIZE: usize = 64;

/// Configuration of a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of times a request is sent before the gateway is considered unsupported.
    pub max_attempts: u32,
    /// Base of the per attempt timeout. Attempt `n` waits `n * retry_increment`.
    pub retry_increment: Duration,
    /// Port of the gateway requests are sent to.
    pub server_port: u16,
    /// Treat responses with an unknown version as if they were not received.
    pub strict_version: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_increment: DEFAULT_RETRY_INCREMENT,
            server_port: SERVER_PORT,
            strict_version: false,
        }
    }
}

impl Config {
    /// Time to wait for a response on the given attempt, starting at 1.
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        self.retry_increment.saturating_mul(attempt)
    }
}

/// A NAT-PMP client.
///
/// Every operation is an independent transaction using its own socket. Nothing is shared
/// between calls, so concurrent operations are not coordinated.
#[derive(Debug, Clone, Default)]
pub struct Client {
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Client { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Obtains the external address of the gateway.
    ///
    /// If `gateway` is `None` it will be discovered with [`discover_gateway`].
    pub async fn public_address(&self, gateway: Option<Ipv4Addr>) -> Result<Ipv4Addr, Error> {
        let gateway = resolve_gateway(gateway).await?;
        let response: PublicAddressResponse = self
            .execute(gateway, &Request::ExternalAddress, self.config.max_attempts)
            .await?;
        let response = check_result(response)?;
        Ok(response.public_ip)
    }

    /// Requests a mapping of `public_port` in the gateway to `private_port` in this host.
    ///
    /// The granted external port and lifetime are in the returned response, and might differ
    /// from the requested ones. Fails with [`Error::Result`] if the gateway refuses the mapping.
    pub async fn map_port(
        &self,
        proto: MapProtocol,
        public_port: u16,
        private_port: u16,
        lifetime_seconds: u32,
        gateway: Option<Ipv4Addr>,
    ) -> Result<PortMapResponse, Error> {
        let response = self
            .map_port_unchecked(proto, public_port, private_port, lifetime_seconds, gateway)
            .await?;
        check_result(response)
    }

    /// Like [`Client::map_port`], but returns the response whatever its result code.
    pub async fn map_port_unchecked(
        &self,
        proto: MapProtocol,
        public_port: u16,
        private_port: u16,
        lifetime_seconds: u32,
        gateway: Option<Ipv4Addr>,
    ) -> Result<PortMapResponse, Error> {
        // a zero local port is only meaningful to release every mapping
        if private_port == 0 && lifetime_seconds != 0 {
            return Err(Error::Validation(
                "private port must be non zero when requesting a mapping",
            ));
        }
        let request = Request::Mapping {
            proto,
            local_port: private_port,
            external_port: public_port,
            lifetime_seconds,
        };
        let gateway = resolve_gateway(gateway).await?;
        self.execute(gateway, &request, self.config.max_attempts)
            .await
    }

    pub async fn map_tcp_port(
        &self,
        public_port: u16,
        private_port: u16,
        lifetime_seconds: u32,
        gateway: Option<Ipv4Addr>,
    ) -> Result<PortMapResponse, Error> {
        self.map_port(
            MapProtocol::Tcp,
            public_port,
            private_port,
            lifetime_seconds,
            gateway,
        )
        .await
    }

    pub async fn map_udp_port(
        &self,
        public_port: u16,
        private_port: u16,
        lifetime_seconds: u32,
        gateway: Option<Ipv4Addr>,
    ) -> Result<PortMapResponse, Error> {
        self.map_port(
            MapProtocol::Udp,
            public_port,
            private_port,
            lifetime_seconds,
            gateway,
        )
        .await
    }

    /// Releases the mapping of `private_port`.
    ///
    /// A `private_port` of 0 releases every mapping of this host for the protocol.
    /// See [RFC 6886 Destroying a Mapping](https://datatracker.ietf.org/doc/html/rfc6886#section-3.4).
    pub async fn release_mapping(
        &self,
        proto: MapProtocol,
        private_port: u16,
        gateway: Option<Ipv4Addr>,
    ) -> Result<PortMapResponse, Error> {
        self.map_port(proto, 0, private_port, 0, gateway).await
    }

    /// Sends `request` to `gateway` until a response is obtained or `max_attempts` are
    /// exhausted.
    ///
    /// The socket used is closed on return.
    pub async fn execute<R: DecodeResponse>(
        &self,
        gateway: Ipv4Addr,
        request: &Request,
        max_attempts: u32,
    ) -> Result<R, Error> {
        if max_attempts == 0 {
            return Err(Error::Validation("at least one attempt is required"));
        }
        if R::KIND != request.response_kind() {
            return Err(Error::Validation(
                "response type does not match the kind of request",
            ));
        }
        let gateway = SocketAddrV4::new(gateway, self.config.server_port);
        let socket = GatewaySocket::open(gateway).await?;
        run_transaction(&socket, gateway, request, max_attempts, &self.config).await
    }
}

async fn resolve_gateway(gateway: Option<Ipv4Addr>) -> Result<Ipv4Addr, Error> {
    match gateway {
        Some(gateway) => Ok(gateway),
        None => Ok(discover_gateway().await?),
    }
}

fn check_result<R: DecodeResponse>(response: R) -> Result<R, Error> {
    let code = response.header().result_code;
    if code.is_success() {
        Ok(response)
    } else {
        Err(Error::Result {
            code,
            response: response.into(),
        })
    }
}

/// Runs a single request over `transport`.
///
/// Exactly `max_attempts` sends are made unless a response is accepted earlier. A datagram is
/// only accepted if it comes from `gateway` and decodes as `R`. Anything else is handled as if
/// nothing had been received. A refused attempt still lasts its whole timeout.
#[instrument(skip_all, fields(gateway = %gateway, opcode = ?request.opcode()))]
pub async fn run_transaction<T: Transport, R: DecodeResponse>(
    transport: &T,
    gateway: SocketAddrV4,
    request: &Request,
    max_attempts: u32,
    config: &Config,
) -> Result<R, Error> {
    let encoded = request.encode();
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    for attempt in 1..=max_attempts {
        let timeout = config.attempt_timeout(attempt);
        let deadline = Instant::now() + timeout;
        trace!(attempt, ?timeout, "sending request");

        match transport.send(&encoded).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                debug!(attempt, "gateway refused the request: {e}");
                sleep_until(deadline).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        let (len, from) = match transport.recv_timeout(&mut buf, timeout).await {
            Ok(Some(received)) => received,
            Ok(None) => continue,
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                debug!(attempt, "gateway is not listening: {e}");
                sleep_until(deadline).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if from != SocketAddr::V4(gateway) {
            debug!(attempt, %from, "discarding datagram from unexpected source");
            continue;
        }

        let response = match R::decode(&buf[..len]) {
            Ok(response) => response,
            Err(e) => {
                debug!(attempt, "discarding invalid response: {e}");
                continue;
            }
        };

        let header = response.header();
        if config.strict_version {
            if let Err(e) = header.check_version() {
                debug!(attempt, "discarding response: {e}");
                continue;
            }
        }
        if header.opcode != request.opcode().response_opcode() {
            debug!(
                attempt,
                opcode = header.opcode,
                "response opcode does not match the request"
            );
        }

        trace!(attempt, result_code = ?header.result_code, "response received");
        return Ok(response);
    }

    warn!(max_attempts, "no response from gateway");
    Err(Error::Unsupported {
        attempts: max_attempts,
    })
}
