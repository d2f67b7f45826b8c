//! Fixtures shared by the handshake unit tests.

use super::codec::wrap_handshake;
use super::{HandshakeMessage, HandshakeType};
use crate::crypt::private_key::LocalSigningKey;

/// Build a received message as the transport would deliver it.
pub(crate) fn message(msg_type: HandshakeType, body: &[u8]) -> HandshakeMessage {
    HandshakeMessage {
        msg_type,
        body: body.to_vec(),
        raw: wrap_handshake(msg_type, body).unwrap(),
    }
}

/// A self-signed P-256 certificate and its signing key.
pub(crate) fn p256_identity(name: &str) -> (Vec<u8>, LocalSigningKey) {
    let kp = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec![name.to_string()])
        .unwrap()
        .self_signed(&kp)
        .unwrap();
    let key = LocalSigningKey::ecdsa_p256_from_pkcs8(&kp.serialize_der()).unwrap();
    (cert.der().to_vec(), key)
}
