//! Cryptographic building blocks and collaborator contracts for the handshake.

pub mod key_schedule;
pub mod private_key;
pub mod public_key;
pub mod transcript;

/// TLS SignatureScheme (RFC 8446 §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureScheme(pub u16);

impl SignatureScheme {
    pub const RSA_PKCS1_SHA256: Self = Self(0x0401);
    pub const RSA_PKCS1_SHA384: Self = Self(0x0501);
    pub const ECDSA_SECP256R1_SHA256: Self = Self(0x0403);
    pub const ECDSA_SECP384R1_SHA384: Self = Self(0x0503);
    pub const RSA_PSS_RSAE_SHA256: Self = Self(0x0804);
    pub const RSA_PSS_RSAE_SHA384: Self = Self(0x0805);
    pub const ED25519: Self = Self(0x0807);

    /// Schemes this engine can verify, in preference order.
    pub const VERIFIABLE: &'static [SignatureScheme] =
        &[SignatureScheme::ED25519, SignatureScheme::ECDSA_SECP256R1_SHA256];
}
