#![allow(dead_code)]

use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair,
};
use sfio_tls_credentials::{AcceptorCredential, AllowList, CallerCredential, TlsConfig};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::RootCertStore;

/// Name every test server certificate is valid for
pub const SERVER_NAME: &str = "localhost";

pub struct Authority {
    cert: rcgen::Certificate,
    key: KeyPair,
}

/// A certificate chain and the key of its leaf
pub struct Identity {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: KeyPair,
    pub leaf_pem: String,
}

impl Identity {
    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivatePkcs8KeyDer::from(self.key.serialize_der()).into()
    }

    /// Present `extra` after our own chain without being able to prove possession of its key
    pub fn presenting(mut self, extra: &Identity) -> Self {
        self.chain.extend(extra.chain.iter().cloned());
        self
    }
}

impl Authority {
    pub fn new(name: &str) -> Self {
        let mut params = CertificateParams::default();
        params.distinguished_name = named(Some(name));
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn roots(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.der().clone()).unwrap();
        roots
    }

    /// Issue a certificate usable by both sides, valid for [`SERVER_NAME`]
    pub fn issue(&self, common_name: Option<&str>) -> Identity {
        let mut params = CertificateParams::new(vec![SERVER_NAME.to_string()]).unwrap();
        params.distinguished_name = named(common_name);
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        Identity {
            chain: vec![cert.der().clone()],
            key,
            leaf_pem: cert.pem(),
        }
    }

    pub fn config(&self, identity: &Identity) -> TlsConfig {
        TlsConfig::new(self.roots()).with_identity(identity.chain.clone(), identity.private_key())
    }
}

fn named(common_name: Option<&str>) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "Step Function I/O");
    if let Some(name) = common_name {
        dn.push(DnType::CommonName, name);
    }
    dn
}

/// A CA with a server identity and an acceptor built from it
pub struct Pki {
    pub ca: Authority,
    pub server: Identity,
}

impl Pki {
    pub fn new() -> Self {
        let ca = Authority::new("test root");
        let server = ca.issue(Some("server"));
        Self { ca, server }
    }

    pub fn acceptor(&self, allow_list: Option<AllowList>) -> AcceptorCredential {
        let config = Arc::new(self.ca.config(&self.server));
        AcceptorCredential::new(Some(config), allow_list).unwrap()
    }

    /// A caller presenting a fresh certificate issued by the CA with the given common name
    pub fn caller(&self, common_name: Option<&str>) -> CallerCredential {
        let client = self.ca.issue(common_name);
        CallerCredential::new(Arc::new(self.ca.config(&client)))
    }

    /// A caller trusting the CA but presenting `identity`
    pub fn caller_with(&self, identity: &Identity) -> CallerCredential {
        CallerCredential::new(Arc::new(self.ca.config(identity)))
    }
}

pub fn allow(names: &[&str]) -> AllowList {
    names.iter().copied().collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
