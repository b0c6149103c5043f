//! Internal utilities to support testing.

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

use anyhow::{Result, bail};
use tokio::{
    net::UdpSocket,
    sync::{Mutex, oneshot},
};
use tracing::{debug, warn};

use crate::{
    protocol::{Header, PortMapResponse, Request, Response, Version},
    status::ResultCode,
};

/// A drop guard to clean up test infrastructure.
///
/// After dropping the test infrastructure will asynchronously shutdown and release its
/// resources.
#[derive(Debug)]
pub(crate) struct CleanupDropGuard(pub(crate) oneshot::Sender<()>);

/// A NAT-PMP gateway listening on localhost.
///
/// Every request received is recorded, and answered with whatever the handler returns.
/// Dropping this will terminate the gateway.
#[derive(Debug)]
pub(crate) struct TestGateway {
    pub(crate) addr: SocketAddrV4,
    received: Arc<Mutex<Vec<Request>>>,
    _drop_guard: CleanupDropGuard,
}

impl TestGateway {
    /// Starts a gateway answering requests with `handler`. Returning `None` sends no reply.
    pub(crate) async fn serve<F>(handler: F) -> Result<Self>
    where
        F: FnMut(Request) -> Option<Vec<u8>> + Send + 'static,
    {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let SocketAddr::V4(addr) = socket.local_addr()? else {
            bail!("test gateway is not bound to an ipv4 address");
        };
        debug!(%addr, "test gateway listening");

        let received = Arc::new(Mutex::new(Vec::new()));
        let (s, r) = oneshot::channel();
        tokio::task::spawn(run_gateway(socket, received.clone(), handler, r));

        Ok(TestGateway {
            addr,
            received,
            _drop_guard: CleanupDropGuard(s),
        })
    }

    /// Starts a gateway that never answers.
    pub(crate) async fn silent() -> Result<Self> {
        Self::serve(|_| None).await
    }

    /// Requests received so far.
    pub(crate) async fn received(&self) -> Vec<Request> {
        self.received.lock().await.clone()
    }
}

async fn run_gateway<F>(
    socket: UdpSocket,
    received: Arc<Mutex<Vec<Request>>>,
    mut handler: F,
    mut done: oneshot::Receiver<()>,
) where
    F: FnMut(Request) -> Option<Vec<u8>>,
{
    let mut buf = [0u8; 64];
    loop {
        let (len, from) = tokio::select! {
            _ = &mut done => {
                debug!("test gateway shutting down");
                break;
            }
            res = socket.recv_from(&mut buf) => match res {
                Ok(res) => res,
                Err(e) => {
                    warn!("test gateway failed to receive: {e}");
                    break;
                }
            }
        };

        let Some(request) = Request::decode(&buf[..len]) else {
            debug!(len, "test gateway received an invalid request");
            continue;
        };
        received.lock().await.push(request);

        if let Some(reply) = handler(request) {
            if let Err(e) = socket.send_to(&reply, from).await {
                warn!("test gateway failed to reply: {e}");
            }
        }
    }
}

/// Encodes the response to a mapping request, granting the port returned by `external_port`.
pub(crate) fn map_response(
    request: Request,
    result_code: ResultCode,
    external_port: impl Fn(u16) -> u16,
) -> Option<Vec<u8>> {
    let Request::Mapping {
        local_port,
        external_port: requested_port,
        lifetime_seconds,
        ..
    } = request
    else {
        return None;
    };
    let response = PortMapResponse {
        header: Header {
            version: Version::NatPmp.into(),
            opcode: request.opcode().response_opcode(),
            result_code,
            epoch_time: 7,
        },
        private_port: local_port,
        external_port: external_port(requested_port),
        lifetime_seconds,
    };
    Some(Response::PortMap(response).encode())
}
