//! Private-key signing capability for CertificateVerify.
//!
//! Signing may complete asynchronously: `sign` starts the operation and may
//! return [`PrivateKeyResult::Retry`]; the handshake then suspends and later
//! calls `complete` to collect the result.

use super::public_key::PeerPublicKey;
use super::SignatureScheme;
use ferrotls_types::CryptoError;
use zeroize::{Zeroize, Zeroizing};

/// Maximum DER-encoded ECDSA P-256 signature size.
const P256_MAX_SIG_LEN: usize = 72;
const ED25519_SIG_LEN: usize = 64;

/// Outcome of a private-key operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKeyResult {
    Success(Vec<u8>),
    /// The operation is still in flight; call `complete` later.
    Retry,
    Failure,
}

/// A signing capability bound to the local certificate's key.
pub trait PrivateKeyMethod {
    /// Schemes the key can produce, in local preference order.
    fn supported_schemes(&self) -> Vec<SignatureScheme>;

    /// Upper bound on the signature size.
    fn max_signature_len(&self) -> usize;

    /// Start signing `input` with `scheme`.
    fn sign(&mut self, scheme: SignatureScheme, input: &[u8], max_out: usize)
        -> PrivateKeyResult;

    /// Poll an operation previously started with `sign`.
    fn complete(&mut self, max_out: usize) -> PrivateKeyResult {
        let _ = max_out;
        PrivateKeyResult::Failure
    }
}

/// In-process signing key material.
#[derive(Debug, Clone)]
pub enum LocalSigningKey {
    /// Ed25519 32-byte seed.
    Ed25519(Vec<u8>),
    /// P-256 private scalar (32 bytes, big-endian).
    EcdsaP256(Vec<u8>),
}

impl Drop for LocalSigningKey {
    fn drop(&mut self) {
        match self {
            LocalSigningKey::Ed25519(seed) => seed.zeroize(),
            LocalSigningKey::EcdsaP256(scalar) => scalar.zeroize(),
        }
    }
}

impl LocalSigningKey {
    /// Load a P-256 key from PKCS#8 DER.
    pub fn ecdsa_p256_from_pkcs8(der: &[u8]) -> Result<Self, CryptoError> {
        use p256::pkcs8::DecodePrivateKey;
        let sk = p256::ecdsa::SigningKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidKey)?;
        Ok(LocalSigningKey::EcdsaP256(sk.to_bytes().to_vec()))
    }

    /// The public half, in the form a peer extracts from our certificate.
    pub fn public_key(&self) -> Result<PeerPublicKey, CryptoError> {
        match self {
            LocalSigningKey::Ed25519(seed) => {
                let sk = ed25519_signing_key(seed)?;
                Ok(PeerPublicKey::Ed25519(sk.verifying_key().to_bytes()))
            }
            LocalSigningKey::EcdsaP256(scalar) => {
                let sk = p256::ecdsa::SigningKey::from_slice(scalar)
                    .map_err(|_| CryptoError::InvalidKey)?;
                let point = sk.verifying_key().to_encoded_point(false);
                Ok(PeerPublicKey::EcdsaP256(point.as_bytes().to_vec()))
            }
        }
    }

    /// Sign `message` with `scheme`.
    pub fn sign_message(
        &self,
        scheme: SignatureScheme,
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match (self, scheme) {
            (LocalSigningKey::Ed25519(seed), SignatureScheme::ED25519) => {
                use ed25519_dalek::Signer;
                let sk = ed25519_signing_key(seed)?;
                Ok(sk.sign(message).to_bytes().to_vec())
            }
            (LocalSigningKey::EcdsaP256(scalar), SignatureScheme::ECDSA_SECP256R1_SHA256) => {
                use p256::ecdsa::signature::Signer;
                let sk = p256::ecdsa::SigningKey::from_slice(scalar)
                    .map_err(|_| CryptoError::InvalidKey)?;
                let sig: p256::ecdsa::DerSignature = sk.sign(message);
                Ok(sig.as_bytes().to_vec())
            }
            (_, s) => Err(CryptoError::UnsupportedScheme(s.0)),
        }
    }
}

fn ed25519_signing_key(seed: &[u8]) -> Result<ed25519_dalek::SigningKey, CryptoError> {
    let mut raw = Zeroizing::new([0u8; 32]);
    if seed.len() != raw.len() {
        return Err(CryptoError::InvalidKey);
    }
    raw.copy_from_slice(seed);
    Ok(ed25519_dalek::SigningKey::from_bytes(&raw))
}

impl PrivateKeyMethod for LocalSigningKey {
    fn supported_schemes(&self) -> Vec<SignatureScheme> {
        match self {
            LocalSigningKey::Ed25519(_) => vec![SignatureScheme::ED25519],
            LocalSigningKey::EcdsaP256(_) => vec![SignatureScheme::ECDSA_SECP256R1_SHA256],
        }
    }

    fn max_signature_len(&self) -> usize {
        match self {
            LocalSigningKey::Ed25519(_) => ED25519_SIG_LEN,
            LocalSigningKey::EcdsaP256(_) => P256_MAX_SIG_LEN,
        }
    }

    fn sign(&mut self, scheme: SignatureScheme, input: &[u8], max_out: usize) -> PrivateKeyResult {
        match self.sign_message(scheme, input) {
            Ok(sig) if sig.len() <= max_out => PrivateKeyResult::Success(sig),
            Ok(_) | Err(_) => PrivateKeyResult::Failure,
        }
    }
}
