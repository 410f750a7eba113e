use std::cell::RefCell;

use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, TrustAnchor, UnixTime};
use tracing::{trace, warn};

/// A certificate chain that was cryptographically validated against the trust roots
///
/// The chain starts at the leaf certificate the peer authenticated with, continues through the
/// intermediates used to build the path, and terminates in a trust anchor.
#[derive(Clone, Debug)]
pub struct VerifiedChain {
    leaf: CertificateDer<'static>,
    intermediates: Vec<CertificateDer<'static>>,
    anchor: TrustAnchor<'static>,
}

impl VerifiedChain {
    pub(crate) fn new(
        leaf: CertificateDer<'static>,
        intermediates: Vec<CertificateDer<'static>>,
        anchor: TrustAnchor<'static>,
    ) -> Self {
        Self {
            leaf,
            intermediates,
            anchor,
        }
    }

    /// The end-entity certificate of the chain
    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.leaf
    }

    /// Intermediate certificates between the leaf and the anchor, leaf side first
    pub fn intermediates(&self) -> &[CertificateDer<'static>] {
        &self.intermediates
    }

    /// The trust anchor that terminates the chain
    pub fn anchor(&self) -> &TrustAnchor<'static> {
        &self.anchor
    }

    /// Subject common name of the leaf certificate, if it has one and can be parsed
    pub fn leaf_common_name(&self) -> Option<String> {
        match crate::common_name::subject_common_name(&self.leaf) {
            Ok(name) => name,
            Err(err) => {
                warn!("unable to read leaf common name: {err}");
                None
            }
        }
    }
}

/// Every chain that could be validated for a peer
#[derive(Clone, Debug, Default)]
pub struct VerifiedChains(Vec<VerifiedChain>);

impl VerifiedChains {
    /// Enumerate every valid path from the peer's end-entity certificate to one of `roots`
    ///
    /// `presented` is the certificate list as sent by the peer, end-entity first. Only the
    /// end-entity certificate can become a leaf; the remaining certificates are merely candidate
    /// intermediates and appear in a chain only if path building used them.
    pub(crate) fn build(
        roots: &RootCertStore,
        presented: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Self {
        let (end_entity, intermediates) = match presented.split_first() {
            Some(x) => x,
            None => return Self::default(),
        };

        let cert = match webpki::EndEntityCert::try_from(end_entity) {
            Ok(cert) => cert,
            Err(err) => {
                warn!("peer end-entity certificate cannot be parsed: {err}");
                return Self::default();
            }
        };

        let provider = crate::default_crypto_provider();
        let found = RefCell::new(Vec::new());

        // Rejecting each path makes webpki continue with the next candidate, so every valid
        // path gets recorded.
        let record: &dyn Fn(&webpki::VerifiedPath<'_>) -> Result<(), webpki::Error> = &|path| {
            let chain = VerifiedChain::new(
                end_entity.clone().into_owned(),
                path.intermediate_certificates()
                    .map(|cert| cert.der().into_owned())
                    .collect(),
                path.anchor().to_owned(),
            );
            trace!(
                intermediates = chain.intermediates.len(),
                "found verified chain"
            );
            found.borrow_mut().push(chain);
            Err(webpki::Error::UnknownIssuer)
        };

        let result = cert.verify_for_usage(
            provider.signature_verification_algorithms.all,
            &roots.roots,
            intermediates,
            now,
            webpki::KeyUsage::client_auth(),
            None,
            Some(record),
        );

        let chains = found.into_inner();
        if chains.is_empty() {
            if let Err(err) = result {
                warn!("no verified chain for peer: {err}");
            }
        }

        Self(chains)
    }

    /// Iterate over the chains
    pub fn iter(&self) -> std::slice::Iter<'_, VerifiedChain> {
        self.0.iter()
    }

    /// Number of chains
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the peer has no verified chain
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<VerifiedChain>> for VerifiedChains {
    fn from(chains: Vec<VerifiedChain>) -> Self {
        Self(chains)
    }
}

impl<'a> IntoIterator for &'a VerifiedChains {
    type Item = &'a VerifiedChain;
    type IntoIter = std::slice::Iter<'a, VerifiedChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
