//! Peer public keys extracted from end-entity certificates, and signature
//! verification over them.

use super::SignatureScheme;
use ed25519_dalek::Verifier as _;
use ferrotls_types::{CryptoError, TlsError};
use x509_parser::oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_SIG_ED25519};
use x509_parser::prelude::*;

/// Length of an uncompressed SEC1 P-256 point (0x04 || x || y).
const P256_POINT_LEN: usize = 65;

/// Public key of the peer's leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerPublicKey {
    /// Raw 32-byte Ed25519 key.
    Ed25519([u8; 32]),
    /// SEC1-encoded P-256 point.
    EcdsaP256(Vec<u8>),
    /// A key type this engine parses but cannot verify with (the raw
    /// SubjectPublicKey bits are kept for the session).
    Other(Vec<u8>),
}

impl PeerPublicKey {
    /// Parse the SubjectPublicKeyInfo of a DER certificate.
    pub fn from_certificate(cert_der: &[u8]) -> Result<Self, TlsError> {
        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| TlsError::DecodeError(format!("certificate parse: {e}")))?;
        let spki = cert.public_key();
        let key_bits: &[u8] = &spki.subject_public_key.data;

        if spki.algorithm.algorithm == OID_SIG_ED25519 {
            let raw: [u8; 32] = key_bits
                .try_into()
                .map_err(|_| TlsError::DecodeError("Ed25519 key length".into()))?;
            return Ok(PeerPublicKey::Ed25519(raw));
        }
        if spki.algorithm.algorithm == OID_KEY_TYPE_EC_PUBLIC_KEY
            && key_bits.len() == P256_POINT_LEN
        {
            p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bits)
                .map_err(|_| TlsError::DecodeError("invalid P-256 point".into()))?;
            return Ok(PeerPublicKey::EcdsaP256(key_bits.to_vec()));
        }
        if key_bits.is_empty() {
            return Err(TlsError::DecodeError("empty public key".into()));
        }
        Ok(PeerPublicKey::Other(key_bits.to_vec()))
    }

    /// Verify `signature` over `message` under `scheme`.
    ///
    /// Returns `Ok(false)` when the signature does not verify or when the
    /// scheme does not match the key type.
    pub fn verify(
        &self,
        scheme: SignatureScheme,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        match (self, scheme) {
            (PeerPublicKey::Ed25519(raw), SignatureScheme::ED25519) => {
                let key = ed25519_dalek::VerifyingKey::from_bytes(raw)
                    .map_err(|_| CryptoError::InvalidKey)?;
                let sig = match ed25519_dalek::Signature::from_slice(signature) {
                    Ok(sig) => sig,
                    Err(_) => return Ok(false),
                };
                Ok(key.verify(message, &sig).is_ok())
            }
            (PeerPublicKey::EcdsaP256(point), SignatureScheme::ECDSA_SECP256R1_SHA256) => {
                use p256::ecdsa::signature::Verifier;
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|_| CryptoError::InvalidKey)?;
                let sig = match p256::ecdsa::DerSignature::try_from(signature) {
                    Ok(sig) => sig,
                    Err(_) => return Ok(false),
                };
                Ok(key.verify(message, &sig).is_ok())
            }
            (_, s) if !SignatureScheme::VERIFIABLE.contains(&s) => {
                Err(CryptoError::UnsupportedScheme(s.0))
            }
            _ => Ok(false),
        }
    }
}

/// Whether a certificate may sign handshake transcripts: if a keyUsage
/// extension is present it must assert digitalSignature.
pub fn has_digital_signature_key_usage(cert_der: &[u8]) -> Result<bool, TlsError> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| TlsError::DecodeError(format!("certificate parse: {e}")))?;
    match cert.key_usage() {
        Ok(Some(ku)) => Ok(ku.value.digital_signature()),
        Ok(None) => Ok(true),
        Err(e) => Err(TlsError::DecodeError(format!("keyUsage: {e}"))),
    }
}
