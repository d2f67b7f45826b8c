//! Transcript hash for TLS 1.3 handshake messages.
//!
//! Maintains a running hash over all handshake messages in order.

use ferrotls_types::HashAlgId;
use sha2::{Digest, Sha256, Sha384, Sha512};

#[derive(Clone)]
enum Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

/// Running transcript hash over handshake messages.
///
/// `current_hash()` finalizes a clone of the live state, so the transcript
/// keeps accepting updates afterwards.
#[derive(Clone)]
pub struct TranscriptHash {
    alg: HashAlgId,
    hasher: Hasher,
}

impl std::fmt::Debug for TranscriptHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptHash")
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

impl TranscriptHash {
    /// Create an empty transcript for the negotiated hash.
    pub fn new(alg: HashAlgId) -> Self {
        let hasher = match alg {
            HashAlgId::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgId::Sha384 => Hasher::Sha384(Sha384::new()),
            HashAlgId::Sha512 => Hasher::Sha512(Sha512::new()),
        };
        Self { alg, hasher }
    }

    /// Feed handshake message data into the transcript.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.hasher {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    /// Get the current transcript hash without consuming the state.
    pub fn current_hash(&self) -> Vec<u8> {
        match &self.hasher {
            Hasher::Sha256(h) => h.clone().finalize().to_vec(),
            Hasher::Sha384(h) => h.clone().finalize().to_vec(),
            Hasher::Sha512(h) => h.clone().finalize().to_vec(),
        }
    }

    /// Hash output size in bytes.
    pub fn hash_len(&self) -> usize {
        self.alg.output_len()
    }

    pub fn algorithm(&self) -> HashAlgId {
        self.alg
    }
}
