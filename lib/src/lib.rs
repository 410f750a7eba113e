#![doc = include_str!("../README.md")]

#[cfg(all(feature = "crypto-ring", feature = "crypto-aws-lc-rs"))]
compile_error!("Features 'crypto-ring' and 'crypto-aws-lc-rs' are mutually exclusive and cannot be enabled together");

#[cfg(not(any(feature = "crypto-ring", feature = "crypto-aws-lc-rs")))]
compile_error!("'crypto-ring' OR 'crypto-aws-lc-rs' must be enabled");

#[cfg(feature = "crypto-ring")]
pub(crate) use rustls::crypto::ring::default_provider as default_crypto_provider;

#[cfg(feature = "crypto-aws-lc-rs")]
pub(crate) use rustls::crypto::aws_lc_rs::default_provider as default_crypto_provider;

mod acceptor;
mod allow_list;
mod caller;
mod chain;
mod config;
mod credentials;
mod error;
mod versions;

pub use acceptor::*;
pub use allow_list::AllowList;
pub use caller::*;
pub use chain::*;
pub use config::*;
pub use credentials::{
    Handshake, HandshakeFuture, ProtocolInfo, Role, TlsInfo, TransportCredentials,
};
pub use error::{Error, ErrorKind};
pub use versions::*;

pub use cancel::{deadline, Deadline};
pub use tokio_util::sync::CancellationToken;

pub(crate) mod address;
pub(crate) mod cancel;
pub(crate) mod common_name;
pub(crate) mod pem;
