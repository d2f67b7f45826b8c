#![forbid(unsafe_code)]
#![doc = "TLS 1.3 handshake engine for ferrotls."]

pub mod alert;
pub mod config;
pub mod connection;
pub mod crypt;
pub mod extensions;
pub mod handshake;
pub mod record;
pub mod session;

pub use ferrotls_types::{ErrorClass, TlsError};

/// The role of a TLS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}

impl TlsRole {
    pub fn is_server(self) -> bool {
        self == TlsRole::Server
    }
}
