mod certs;

use certs::{allow, init_tracing, Pki, SERVER_NAME};
use sfio_tls_credentials::{
    AcceptorCredential, AllowList, CallerCredential, CancellationToken, Error, ErrorKind,
    Handshake, TransportCredentials,
};
use tokio::io::{duplex, AsyncReadExt, DuplexStream};

struct Outcome {
    client: Result<Handshake<DuplexStream>, Error>,
    server: Result<Handshake<DuplexStream>, Error>,
}

impl Outcome {
    async fn run(caller: &CallerCredential, acceptor: &AcceptorCredential) -> Self {
        let (client_io, server_io) = duplex(64 * 1024);
        let server = tokio::spawn(acceptor.accept_handshake(server_io));
        let client = caller
            .connect_handshake(
                &CancellationToken::new(),
                &format!("{SERVER_NAME}:8443"),
                client_io,
            )
            .await;
        Self {
            client,
            server: server.await.unwrap(),
        }
    }

    fn admitted(self) -> Handshake<DuplexStream> {
        if let Err(err) = &self.client {
            panic!("client failed: {err}");
        }
        match self.server {
            Ok(handshake) => handshake,
            Err(err) => panic!("peer was not admitted: {err}"),
        }
    }

    /// The handshake completes, the acceptor refuses the peer and closes the connection
    async fn refused(self) {
        match self.server {
            Ok(_) => panic!("peer was admitted"),
            Err(err) => assert_eq!(err.kind(), ErrorKind::Unauthorized, "{err}"),
        }

        let mut stream = match self.client {
            Ok(handshake) => handshake.into_stream(),
            Err(err) => panic!("client handshake should complete: {err}"),
        };
        let mut buf = [0u8; 16];
        let read = stream.read(&mut buf).await;
        assert!(matches!(read, Ok(0) | Err(_)), "{read:?}");
    }
}

async fn admits(pki: &Pki, allow_list: Option<AllowList>, common_name: Option<&str>) -> bool {
    let outcome = Outcome::run(&pki.caller(common_name), &pki.acceptor(allow_list)).await;
    outcome.server.is_ok()
}

#[tokio::test]
async fn no_allow_list_admits_any_subject() {
    init_tracing();
    let pki = Pki::new();
    for name in [Some("alice"), Some("bob"), Some("mallory"), None] {
        assert!(admits(&pki, None, name).await, "{name:?}");
    }
}

#[tokio::test]
async fn allow_listed_subject_is_admitted() {
    init_tracing();
    let pki = Pki::new();

    let handshake =
        Outcome::run(&pki.caller(Some("alice")), &pki.acceptor(Some(allow(&["alice"])))).await;
    let info = handshake.admitted().info().cloned().unwrap();

    let chain = info.verified_chains().iter().next().unwrap();
    assert_eq!(chain.leaf_common_name().as_deref(), Some("alice"));
}

#[tokio::test]
async fn other_subject_is_refused() {
    init_tracing();
    let pki = Pki::new();
    Outcome::run(&pki.caller(Some("bob")), &pki.acceptor(Some(allow(&["alice"]))))
        .await
        .refused()
        .await;
}

#[tokio::test]
async fn subject_without_common_name_is_refused() {
    init_tracing();
    let pki = Pki::new();
    Outcome::run(&pki.caller(None), &pki.acceptor(Some(allow(&["alice"]))))
        .await
        .refused()
        .await;
}

#[tokio::test]
async fn empty_allow_list_refuses_everyone() {
    init_tracing();
    let pki = Pki::new();
    Outcome::run(&pki.caller(Some("alice")), &pki.acceptor(Some(AllowList::new())))
        .await
        .refused()
        .await;
}

#[tokio::test]
async fn any_listed_subject_is_admitted() {
    init_tracing();
    let pki = Pki::new();
    let allow_list = allow(&["ra.boulder", "wfe.boulder", "alice"]);
    assert!(admits(&pki, Some(allow_list.clone()), Some("wfe.boulder")).await);
    assert!(admits(&pki, Some(allow_list.clone()), Some("alice")).await);
    assert!(!admits(&pki, Some(allow_list), Some("sa.boulder")).await);
}

#[tokio::test]
async fn presented_but_unverified_certificate_does_not_count() {
    init_tracing();
    let pki = Pki::new();
    let alice = pki.ca.issue(Some("alice"));
    // authenticates as bob, then tacks alice's certificate onto the presented list
    let bob = pki.ca.issue(Some("bob")).presenting(&alice);
    assert_eq!(bob.chain.len(), 2);

    let outcome = Outcome::run(&pki.caller_with(&bob), &pki.acceptor(Some(allow(&["alice"])))).await;
    outcome.refused().await;
}

#[tokio::test]
async fn presented_extra_certificate_is_harmless_when_leaf_is_allowed() {
    init_tracing();
    let pki = Pki::new();
    let bob = pki.ca.issue(Some("bob"));
    let alice = pki.ca.issue(Some("alice")).presenting(&bob);

    let handshake =
        Outcome::run(&pki.caller_with(&alice), &pki.acceptor(Some(allow(&["alice"])))).await;
    let info = handshake.admitted().info().cloned().unwrap();

    for chain in info.verified_chains() {
        assert_eq!(chain.leaf_common_name().as_deref(), Some("alice"));
        assert!(chain.intermediates().is_empty());
    }
}
