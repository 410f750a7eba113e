use rustls::server::VerifierBuilderError;

use crate::allow_list::Rejection;
use crate::Role;

/// Broad classification of an [`Error`]
///
/// Every kind is terminal for the connection attempt that produced it. Retrying is up to the
/// framework that invoked the credential.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The target address was not of the form `host:port` or the host is not a valid name
    Address,
    /// The TLS handshake was rejected by either party
    Handshake,
    /// The cancellation signal fired before the handshake completed
    Cancelled,
    /// Required configuration is missing or could not be loaded
    Configuration,
    /// The handshake succeeded but the peer is not on the allow-list
    Unauthorized,
    /// A handshake was requested in a direction the credential does not implement
    RoleMismatch,
}

/// Opaque error type used by the library that implements [`std::error::Error`].
#[derive(Debug)]
pub struct Error {
    details: Details,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match &self.details {
            Details::Address { .. } | Details::ServerName(_) => ErrorKind::Address,
            Details::Handshake(_) => ErrorKind::Handshake,
            Details::Cancelled => ErrorKind::Cancelled,
            Details::MissingConfig
            | Details::MissingIdentity
            | Details::Io(_)
            | Details::Pem(_)
            | Details::Tls(_)
            | Details::Verifier(_) => ErrorKind::Configuration,
            Details::Unauthorized(_) => ErrorKind::Unauthorized,
            Details::RoleMismatch { .. } => ErrorKind::RoleMismatch,
        }
    }

    pub(crate) fn role_mismatch(credential: Role) -> Self {
        Details::RoleMismatch {
            credential,
            requested: credential.opposite(),
        }
        .into()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.details, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.details)
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum Details {
    #[error("invalid address '{address}': {reason}")]
    Address {
        address: String,
        reason: &'static str,
    },
    #[error("'{0}' is not a valid DNS name or IP address")]
    ServerName(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),
    #[error("handshake cancelled before completion")]
    Cancelled,
    #[error("a TLS configuration is required to accept connections")]
    MissingConfig,
    #[error("accepting connections requires a local certificate chain and private key")]
    MissingIdentity,
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("PEM error: {0}")]
    Pem(#[source] crate::pem::Error),
    #[error("Rustls error: {0}")]
    Tls(#[source] rustls::Error),
    #[error("Error building certificate verifier: {0}")]
    Verifier(#[source] VerifierBuilderError),
    #[error("peer is not authorized: {0}")]
    Unauthorized(#[source] Rejection),
    #[error("{requested} handshakes are not implemented by the {credential} credential")]
    RoleMismatch { credential: Role, requested: Role },
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self { details }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Details::Io(err).into()
    }
}

impl From<crate::pem::Error> for Error {
    fn from(err: crate::pem::Error) -> Self {
        Details::Pem(err).into()
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Details::Tls(err).into()
    }
}

impl From<VerifierBuilderError> for Error {
    fn from(err: VerifierBuilderError) -> Self {
        Details::Verifier(err).into()
    }
}
