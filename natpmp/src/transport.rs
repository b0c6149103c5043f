//! The UDP transport used to exchange datagrams with a gateway.

use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use tokio::net::UdpSocket;
use tracing::trace;

use crate::error::NetworkError;

/// Datagram exchange with a single gateway.
pub trait Transport {
    /// Sends a single datagram to the gateway.
    fn send(&self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Waits at most `timeout` for a datagram.
    ///
    /// Returns the number of bytes read and the address the datagram was received from, or
    /// `None` if nothing arrived in time.
    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> impl Future<Output = io::Result<Option<(usize, SocketAddr)>>> + Send;
}

/// A UDP socket connected to a gateway's NAT-PMP port.
///
/// Since the socket is connected the OS only delivers datagrams sent by the gateway. The socket
/// is closed when this is dropped.
#[derive(Debug)]
pub struct GatewaySocket {
    socket: UdpSocket,
    gateway: SocketAddrV4,
}

impl GatewaySocket {
    /// Binds an ephemeral socket and connects it to `gateway`.
    pub async fn open(gateway: SocketAddrV4) -> Result<Self, NetworkError> {
        if gateway.ip().is_unspecified() || gateway.port() == 0 {
            return Err(NetworkError::NoValidGateway);
        }
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect(gateway).await?;
        trace!(local_addr = ?socket.local_addr().ok(), %gateway, "gateway socket open");
        Ok(GatewaySocket { socket, gateway })
    }

    pub fn gateway(&self) -> SocketAddrV4 {
        self.gateway
    }
}

impl Transport for GatewaySocket {
    async fn send(&self, buf: &[u8]) -> io::Result<()> {
        self.socket.send(buf).await?;
        Ok(())
    }

    async fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(res) => res.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
