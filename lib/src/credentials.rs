use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsStream;
use tokio_util::sync::CancellationToken;

use crate::{Error, VerifiedChains};

/// Future returned by the handshake methods of [`TransportCredentials`]
pub type HandshakeFuture<I> = Pin<Box<dyn Future<Output = Result<Handshake<I>, Error>> + Send>>;

/// The side of a connection a credential secures
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// The side that initiates the connection
    Caller,
    /// The side that accepts the connection
    Acceptor,
}

impl Role {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Self::Caller => Self::Acceptor,
            Self::Acceptor => Self::Caller,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Caller => f.write_str("caller"),
            Self::Acceptor => f.write_str("acceptor"),
        }
    }
}

/// Describes the security protocol of a credential
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// Name of the security protocol
    pub security_protocol: &'static str,
    /// Version of the security protocol
    pub security_version: &'static str,
}

impl ProtocolInfo {
    /// TLS 1.2, the only version a caller will negotiate
    pub const TLS_1_2: Self = Self {
        security_protocol: "tls",
        security_version: "1.2",
    };
}

/// Transport metadata describing an accepted connection
#[derive(Clone, Debug)]
pub struct TlsInfo {
    protocol_version: Option<rustls::ProtocolVersion>,
    cipher_suite: Option<rustls::SupportedCipherSuite>,
    server_name: Option<String>,
    verified_chains: VerifiedChains,
}

impl TlsInfo {
    pub(crate) fn new(conn: &rustls::ServerConnection, verified_chains: VerifiedChains) -> Self {
        Self {
            protocol_version: conn.protocol_version(),
            cipher_suite: conn.negotiated_cipher_suite(),
            server_name: conn.server_name().map(ToString::to_string),
            verified_chains,
        }
    }

    /// Always "tls"
    pub fn auth_type(&self) -> &'static str {
        "tls"
    }

    /// Negotiated protocol version
    pub fn protocol_version(&self) -> Option<rustls::ProtocolVersion> {
        self.protocol_version
    }

    /// Negotiated cipher suite
    pub fn cipher_suite(&self) -> Option<rustls::SupportedCipherSuite> {
        self.cipher_suite
    }

    /// Server name indicated by the peer, if any
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Chains that validated the peer's certificate
    pub fn verified_chains(&self) -> &VerifiedChains {
        &self.verified_chains
    }
}

/// A completed and authorized handshake
#[derive(Debug)]
pub struct Handshake<I> {
    stream: TlsStream<I>,
    info: Option<TlsInfo>,
}

impl<I> Handshake<I> {
    pub(crate) fn new(stream: TlsStream<I>, info: Option<TlsInfo>) -> Self {
        Self { stream, info }
    }

    /// The secured stream
    pub fn stream(&self) -> &TlsStream<I> {
        &self.stream
    }

    /// Transport metadata, only present for accepted connections
    pub fn info(&self) -> Option<&TlsInfo> {
        self.info.as_ref()
    }

    /// Take the secured stream, ready for RPC framing
    pub fn into_stream(self) -> TlsStream<I> {
        self.stream
    }

    /// Take the secured stream together with its metadata
    pub fn into_parts(self) -> (TlsStream<I>, Option<TlsInfo>) {
        (self.stream, self.info)
    }
}

/// Capability surface an RPC framework uses to secure its connections
///
/// Implementations secure exactly one side of a connection. Invoking the handshake of the other
/// side fails with [`ErrorKind::RoleMismatch`](crate::ErrorKind::RoleMismatch) and leaves the
/// I/O object untouched apart from dropping it.
pub trait TransportCredentials<I>: Send + Sync
where
    I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Secure an outbound connection to `address` (`host:port`) established over `io`
    ///
    /// Returns early with [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled) if `cancel`
    /// fires before the handshake completes.
    fn connect_handshake(
        &self,
        cancel: &CancellationToken,
        address: &str,
        io: I,
    ) -> HandshakeFuture<I>;

    /// Secure an inbound connection accepted over `io`
    fn accept_handshake(&self, io: I) -> HandshakeFuture<I>;

    /// Security protocol descriptor
    fn protocol_info(&self) -> ProtocolInfo {
        ProtocolInfo::TLS_1_2
    }

    /// Per-request metadata, always empty for transport credentials
    fn request_metadata(&self, _uri: &[&str]) -> Result<HashMap<String, String>, Error> {
        Ok(HashMap::new())
    }

    /// Always true, these credentials never permit an insecure fallback
    fn requires_transport_security(&self) -> bool {
        true
    }
}

pub(crate) fn failed<I>(err: Error) -> HandshakeFuture<I>
where
    I: Send + 'static,
{
    Box::pin(std::future::ready(Err(err)))
}
