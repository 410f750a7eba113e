use std::path::Path;
use std::sync::Arc;

use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::error::Details;
use crate::{Error, ProtocolVersions};

/// TLS material shared by every connection attempt of a credential
///
/// Holds the trust roots used to validate peers, an optional local certificate chain with its
/// private key, and the protocol versions an acceptor will negotiate. Credentials only ever read
/// a `TlsConfig`; per-connection settings are applied to freshly built rustls configurations.
#[derive(Debug)]
pub struct TlsConfig {
    roots: Arc<RootCertStore>,
    identity: Option<Identity>,
    versions: ProtocolVersions,
}

#[derive(Debug)]
struct Identity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl TlsConfig {
    /// Create a configuration that trusts `roots` and has no local identity.
    ///
    /// Acceptors built from this configuration negotiate TLS 1.2 only.
    pub fn new(roots: RootCertStore) -> Self {
        Self {
            roots: Arc::new(roots),
            identity: None,
            versions: ProtocolVersions::v12_only(),
        }
    }

    /// Present `chain` (leaf first) and prove possession of `key` during handshakes
    pub fn with_identity(
        self,
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        Self {
            identity: Some(Identity { chain, key }),
            ..self
        }
    }

    /// Set the protocol versions an acceptor will negotiate
    pub fn with_versions(self, versions: ProtocolVersions) -> Self {
        Self { versions, ..self }
    }

    /// Build a configuration from PEM encoded data
    ///
    /// `ca_certs` may hold several certificates, all of which become trust roots. `local_chain`
    /// is the local certificate chain, leaf first. `private_key` is decrypted with
    /// `private_key_password` when one is given.
    pub fn from_pem(
        ca_certs: &[u8],
        local_chain: &[u8],
        private_key: &[u8],
        private_key_password: Option<&str>,
    ) -> Result<Self, Error> {
        let ca_certs = crate::pem::read_certificates(ca_certs)?;
        let chain = crate::pem::read_certificates(local_chain)?;
        let key = crate::pem::read_private_key(private_key, private_key_password)?;

        let mut roots = RootCertStore::empty();
        for cert in ca_certs {
            roots.add(cert)?;
        }

        debug!(
            roots = roots.len(),
            chain = chain.len(),
            "loaded TLS configuration"
        );

        Ok(Self::new(roots).with_identity(chain, key))
    }

    /// Build a configuration from PEM files, see [`TlsConfig::from_pem`]
    pub fn from_files(
        ca_cert_path: &Path,
        local_chain_path: &Path,
        private_key_path: &Path,
        private_key_password: Option<&str>,
    ) -> Result<Self, Error> {
        let ca_certs = std::fs::read(ca_cert_path)?;
        let local_chain = std::fs::read(local_chain_path)?;
        let private_key = std::fs::read(private_key_path)?;
        Self::from_pem(&ca_certs, &local_chain, &private_key, private_key_password)
    }

    /// Trust roots used to validate peers
    pub fn roots(&self) -> &RootCertStore {
        &self.roots
    }

    /// Protocol versions an acceptor will negotiate
    pub fn versions(&self) -> ProtocolVersions {
        self.versions
    }

    pub(crate) fn shared_roots(&self) -> Arc<RootCertStore> {
        self.roots.clone()
    }

    /// Build a new client configuration carrying only the roots and local chain of `self`
    pub(crate) fn client_config(
        &self,
        versions: ProtocolVersions,
    ) -> Result<rustls::ClientConfig, Error> {
        let builder =
            rustls::ClientConfig::builder_with_provider(Arc::new(crate::default_crypto_provider()))
                .with_protocol_versions(versions.versions())?
                .with_root_certificates(self.roots.clone());

        let config = match &self.identity {
            Some(identity) => {
                builder.with_client_auth_cert(identity.chain.clone(), identity.key.clone_key())?
            }
            None => builder.with_no_client_auth(),
        };

        Ok(config)
    }

    /// Build a server configuration that requires client certificates issued by the roots
    pub(crate) fn server_config(&self) -> Result<rustls::ServerConfig, Error> {
        let identity = self.identity.as_ref().ok_or(Details::MissingIdentity)?;
        let provider = Arc::new(crate::default_crypto_provider());

        let verifier =
            WebPkiClientVerifier::builder_with_provider(self.roots.clone(), provider.clone())
                .build()?;

        let config = rustls::ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(self.versions.versions())?
            .with_client_cert_verifier(verifier)
            .with_single_cert(identity.chain.clone(), identity.key.clone_key())?;

        Ok(config)
    }
}
