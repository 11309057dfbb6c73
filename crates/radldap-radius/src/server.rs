//! RADIUS packet server
//!
//! Receives datagrams on a UDP socket and runs each one in its own task.
//! Only Access-Requests reach the [`Handler`]; anything that fails to decode,
//! carries another code, or fails Message-Authenticator verification is
//! dropped, as RFC 2865 requires for packets that cannot be authenticated.
//!
//! A datagram whose source address and identifier match a request still in
//! progress is a retransmission and is dropped.

use crate::attributes::AttributeType;
use crate::auth::{decrypt_user_password, sign_response, verify_message_authenticator};
use crate::packet::{Code, Packet, PacketError, MAX_PACKET_LEN};
use async_trait::async_trait;
use parking_lot::Mutex;
use radldap_core::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// A decoded Access-Request together with its origin
#[derive(Clone)]
pub struct Request {
    pub remote_addr: SocketAddr,
    pub packet: Packet,
    secret: Arc<[u8]>,
}

impl Request {
    pub fn new(remote_addr: SocketAddr, packet: Packet, secret: Arc<[u8]>) -> Self {
        Self {
            remote_addr,
            packet,
            secret,
        }
    }

    /// `User-Name`, if present and valid UTF-8
    pub fn user_name(&self) -> Option<&str> {
        self.packet.get(AttributeType::UserName)?.as_str()
    }

    /// `User-Password`, revealed with the shared secret
    pub fn user_password(&self) -> Option<String> {
        let hidden = &self.packet.get(AttributeType::UserPassword)?.value;
        let plain =
            decrypt_user_password(hidden, &self.secret, &self.packet.authenticator).ok()?;
        String::from_utf8(plain).ok()
    }

    /// Encode the signed response carrying `code`
    pub fn response(&self, code: Code) -> std::result::Result<Vec<u8>, PacketError> {
        let mut reply = Packet::new(code, self.packet.identifier, self.packet.authenticator);
        let with_message_authenticator = self
            .packet
            .get(AttributeType::MessageAuthenticator)
            .is_some();
        sign_response(&mut reply, &self.secret, with_message_authenticator)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("remote_addr", &self.remote_addr)
            .field("code", &self.packet.code)
            .field("identifier", &self.packet.identifier)
            .finish_non_exhaustive()
    }
}

/// Decides the response code for an Access-Request
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn serve(&self, request: &Request) -> Code;
}

/// Source address and identifier of a request being processed
type RequestKey = (SocketAddr, u8);

/// Keys of requests currently being processed
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<RequestKey>>>);

impl InFlight {
    /// Claim `key`; `None` if a request with the same key is in progress
    fn claim(&self, key: RequestKey) -> Option<InFlightGuard> {
        if self.0.lock().insert(key) {
            Some(InFlightGuard {
                in_flight: self.clone(),
                key,
            })
        } else {
            None
        }
    }
}

/// Releases its key when the request's task finishes
struct InFlightGuard {
    in_flight: InFlight,
    key: RequestKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.0.lock().remove(&self.key);
    }
}

pub struct PacketServer<H> {
    handler: Arc<H>,
    secret: Arc<[u8]>,
    in_flight: InFlight,
}

impl<H: Handler> PacketServer<H> {
    pub fn new(handler: Arc<H>, secret: &[u8]) -> Self {
        Self {
            handler,
            secret: Arc::from(secret),
            in_flight: InFlight::default(),
        }
    }

    /// Bind the authentication socket
    pub async fn bind(addr: &str) -> Result<UdpSocket> {
        UdpSocket::bind(addr).await.map_err(|e| Error::Listener {
            addr: addr.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn listen_and_serve<F>(&self, addr: &str, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let socket = Self::bind(addr).await?;
        self.serve(socket, shutdown).await
    }

    /// Serve requests until `shutdown` resolves
    pub async fn serve<F>(&self, socket: UdpSocket, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let socket = Arc::new(socket);
        if let Ok(addr) = socket.local_addr() {
            info!("RADIUS server listening on {}", addr);
        }

        let mut buf = vec![0u8; MAX_PACKET_LEN];
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("RADIUS server shutting down");
                    return Ok(());
                }
                received = socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            error!("Failed to receive datagram: {}", e);
                            continue;
                        }
                    };

                    if len < 2 {
                        debug!("Dropping {}-byte datagram from {}", len, peer);
                        continue;
                    }
                    let Some(guard) = self.in_flight.claim((peer, buf[1])) else {
                        debug!("Dropping retransmission of request {} from {}", buf[1], peer);
                        continue;
                    };

                    let data = buf[..len].to_vec();
                    let handler = self.handler.clone();
                    let secret = self.secret.clone();
                    let socket = socket.clone();

                    tokio::spawn(async move {
                        if let Some(response) = process(handler.as_ref(), secret, &data, peer).await {
                            if let Err(e) = socket.send_to(&response, peer).await {
                                warn!("Failed to send response to {}: {}", peer, e);
                            }
                        }
                        drop(guard);
                    });
                }
            }
        }
    }
}

/// Turn one datagram into at most one encoded response
pub(crate) async fn process<H: Handler + ?Sized>(
    handler: &H,
    secret: Arc<[u8]>,
    data: &[u8],
    peer: SocketAddr,
) -> Option<Vec<u8>> {
    let packet = match Packet::decode(data) {
        Ok(p) => p,
        Err(e) => {
            debug!("Dropping malformed packet from {}: {}", peer, e);
            return None;
        }
    };

    if packet.code != Code::AccessRequest {
        debug!("Dropping {} from {}", packet.code, peer);
        return None;
    }

    if verify_message_authenticator(&packet, &secret) == Some(false) {
        warn!("Dropping Access-Request from {}: invalid Message-Authenticator", peer);
        return None;
    }

    let request = Request::new(peer, packet, secret);
    let code = handler.serve(&request).await;

    match request.response(code) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            error!("Failed to encode {} for {}: {}", code, peer, e);
            None
        }
    }
}
