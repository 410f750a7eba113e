use std::sync::Arc;

use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_rustls::{client, TlsConnector, TlsStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::{run_cancellable, Cancelled};
use crate::credentials::failed;
use crate::error::Details;
use crate::{
    Error, Handshake, HandshakeFuture, ProtocolVersions, Role, TlsConfig, TransportCredentials,
};

/// Credential for the side of a connection that initiates it
///
/// Every connection attempt validates the peer against the trust roots of the base
/// configuration, using the host part of the target address as the expected name, and
/// negotiates TLS 1.2 and nothing else.
#[derive(Clone, Debug)]
pub struct CallerCredential {
    config: Arc<TlsConfig>,
}

impl CallerCredential {
    /// Create a caller credential from a base configuration
    pub fn new(config: Arc<TlsConfig>) -> Self {
        Self { config }
    }

    /// Base configuration shared by every connection attempt
    pub fn config(&self) -> &TlsConfig {
        &self.config
    }

    /// Derive the per-attempt connector and the name the peer must present
    fn prepare(&self, address: &str) -> Result<(TlsConnector, ServerName<'static>), Error> {
        let server_name = crate::address::server_name(address)?;
        let config = self.config.client_config(ProtocolVersions::CALLER_PIN)?;
        Ok((TlsConnector::from(Arc::new(config)), server_name))
    }
}

async fn handshake<I>(
    connector: TlsConnector,
    server_name: ServerName<'static>,
    cancel: CancellationToken,
    io: I,
) -> Result<client::TlsStream<I>, Error>
where
    I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    debug!(server_name = ?server_name, "starting TLS handshake");

    let connect = connector.connect(server_name, io).into_fallible();

    match run_cancellable(&cancel, connect).await {
        Err(Cancelled) => {
            warn!("TLS handshake cancelled");
            Err(Details::Cancelled.into())
        }
        Ok(Err((err, mut io))) => {
            warn!("TLS handshake failed: {err}");
            if let Err(err) = io.shutdown().await {
                debug!("unable to close connection after failed handshake: {err}");
            }
            Err(Details::Handshake(err).into())
        }
        Ok(Ok(stream)) => {
            let (_, conn) = stream.get_ref();
            debug!(
                version = ?conn.protocol_version(),
                cipher_suite = ?conn.negotiated_cipher_suite(),
                "TLS handshake complete"
            );
            Ok(stream)
        }
    }
}

impl<I> TransportCredentials<I> for CallerCredential
where
    I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn connect_handshake(
        &self,
        cancel: &CancellationToken,
        address: &str,
        io: I,
    ) -> HandshakeFuture<I> {
        let (connector, server_name) = match self.prepare(address) {
            Ok(x) => x,
            Err(err) => return failed(err),
        };
        let cancel = cancel.clone();

        Box::pin(async move {
            let stream = handshake(connector, server_name, cancel, io).await?;
            Ok(Handshake::new(TlsStream::Client(stream), None))
        })
    }

    fn accept_handshake(&self, _io: I) -> HandshakeFuture<I> {
        failed(Error::role_mismatch(Role::Caller))
    }
}
