use std::sync::Arc;

use rustls::RootCertStore;
use rustls_pki_types::UnixTime;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_rustls::{TlsAcceptor, TlsStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::allow_list::authorize;
use crate::credentials::failed;
use crate::error::Details;
use crate::{
    AllowList, Error, Handshake, HandshakeFuture, Role, TlsConfig, TlsInfo, TransportCredentials,
    VerifiedChains,
};

/// Credential for the side of a connection that accepts it
///
/// Peers must present a certificate issued by the trust roots of the configuration. When an
/// allow-list is configured, at least one verified chain of the peer must end in a leaf whose
/// subject common name is on the list, otherwise the connection is refused after the handshake.
#[derive(Clone, Debug)]
pub struct AcceptorCredential {
    server: Option<Server>,
    allow_list: Option<Arc<AllowList>>,
}

#[derive(Clone, Debug)]
struct Server {
    config: Arc<rustls::ServerConfig>,
    roots: Arc<RootCertStore>,
}

impl AcceptorCredential {
    /// Create an acceptor credential
    ///
    /// Without a configuration every accept fails with a configuration error. Without an
    /// allow-list every peer that completes the handshake is admitted.
    pub fn new(
        config: Option<Arc<TlsConfig>>,
        allow_list: Option<AllowList>,
    ) -> Result<Self, Error> {
        let server = match config {
            Some(config) => Some(Server {
                config: Arc::new(config.server_config()?),
                roots: config.shared_roots(),
            }),
            None => None,
        };

        Ok(Self {
            server,
            allow_list: allow_list.map(Arc::new),
        })
    }

    /// The allow-list, if the check is enabled
    pub fn allow_list(&self) -> Option<&AllowList> {
        self.allow_list.as_deref()
    }
}

async fn handshake<I>(
    server: Server,
    allow_list: Option<Arc<AllowList>>,
    io: I,
) -> Result<Handshake<I>, Error>
where
    I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    debug!("accepting TLS handshake");

    let mut stream = TlsAcceptor::from(server.config)
        .accept(io)
        .await
        .map_err(|err| {
            warn!("TLS handshake failed: {err}");
            Details::Handshake(err)
        })?;

    // only chains that validate against our roots are considered, never the raw presented list
    let info = {
        let (_, conn) = stream.get_ref();
        let presented = conn.peer_certificates().unwrap_or_default();
        let chains = VerifiedChains::build(&server.roots, presented, UnixTime::now());
        TlsInfo::new(conn, chains)
    };

    if let Err(rejection) = authorize(allow_list.as_deref(), info.verified_chains()) {
        warn!("refusing peer: {rejection}");
        if let Err(err) = stream.shutdown().await {
            debug!("unable to close refused connection: {err}");
        }
        return Err(Details::Unauthorized(rejection).into());
    }

    debug!(
        version = ?info.protocol_version(),
        chains = info.verified_chains().len(),
        "TLS handshake accepted"
    );

    Ok(Handshake::new(TlsStream::Server(stream), Some(info)))
}

impl<I> TransportCredentials<I> for AcceptorCredential
where
    I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn connect_handshake(
        &self,
        _cancel: &CancellationToken,
        _address: &str,
        _io: I,
    ) -> HandshakeFuture<I> {
        failed(Error::role_mismatch(Role::Acceptor))
    }

    fn accept_handshake(&self, io: I) -> HandshakeFuture<I> {
        let server = match &self.server {
            Some(server) => server.clone(),
            None => return failed(Details::MissingConfig.into()),
        };

        Box::pin(handshake(server, self.allow_list.clone(), io))
    }
}
