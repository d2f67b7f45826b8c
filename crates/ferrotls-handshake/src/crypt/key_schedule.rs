//! Key-schedule collaborator contract.
//!
//! Secret derivation lives outside the handshake engine; the engine only asks
//! for Finished MACs and for traffic-key rotation.

use ferrotls_types::{CryptoError, HashAlgId, TlsError, TrafficDirection};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// Key-schedule operations the handshake engine depends on.
pub trait KeySchedule {
    /// Compute the Finished verify_data for one side over `transcript_hash`.
    ///
    /// `from_server` selects the server's finished key.
    fn finished_mac(&mut self, from_server: bool, transcript_hash: &[u8])
        -> Result<Vec<u8>, TlsError>;

    /// Advance the application traffic secret for `direction` and install the
    /// resulting keys in the record layer.
    fn rotate_traffic_key(&mut self, direction: TrafficDirection) -> Result<(), TlsError>;
}

/// Compute Finished verify_data: `HMAC(finished_key, transcript_hash)`
/// (RFC 8446 §4.4.4).
pub fn compute_verify_data(
    alg: HashAlgId,
    finished_key: &[u8],
    transcript_hash: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let out = match alg {
        HashAlgId::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(finished_key)
                .map_err(|_| CryptoError::InvalidMacKey)?;
            mac.update(transcript_hash);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgId::Sha384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(finished_key)
                .map_err(|_| CryptoError::InvalidMacKey)?;
            mac.update(transcript_hash);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgId::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(finished_key)
                .map_err(|_| CryptoError::InvalidMacKey)?;
            mac.update(transcript_hash);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(out)
}

/// Key schedule over already-derived finished keys.
///
/// Traffic-key rotation only advances a generation counter per direction;
/// no record layer is attached.
pub struct DerivedFinishedKeys {
    alg: HashAlgId,
    client_finished_key: Zeroizing<Vec<u8>>,
    server_finished_key: Zeroizing<Vec<u8>>,
    pub read_generation: u64,
    pub write_generation: u64,
}

impl DerivedFinishedKeys {
    pub fn new(alg: HashAlgId, client_finished_key: &[u8], server_finished_key: &[u8]) -> Self {
        Self {
            alg,
            client_finished_key: Zeroizing::new(client_finished_key.to_vec()),
            server_finished_key: Zeroizing::new(server_finished_key.to_vec()),
            read_generation: 0,
            write_generation: 0,
        }
    }
}

impl std::fmt::Debug for DerivedFinishedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFinishedKeys")
            .field("alg", &self.alg)
            .field("read_generation", &self.read_generation)
            .field("write_generation", &self.write_generation)
            .finish_non_exhaustive()
    }
}

impl KeySchedule for DerivedFinishedKeys {
    fn finished_mac(
        &mut self,
        from_server: bool,
        transcript_hash: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let key = if from_server {
            &self.server_finished_key
        } else {
            &self.client_finished_key
        };
        Ok(compute_verify_data(self.alg, key, transcript_hash)?)
    }

    fn rotate_traffic_key(&mut self, direction: TrafficDirection) -> Result<(), TlsError> {
        match direction {
            TrafficDirection::Read => self.read_generation += 1,
            TrafficDirection::Write => self.write_generation += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_verify_data_rfc4231_case2() {
        // HMAC-SHA-256 with key "Jefe" (RFC 4231 test case 2).
        let out = compute_verify_data(
            HashAlgId::Sha256,
            b"Jefe",
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(
            to_hex(&out),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_data_lengths() {
        let key = [0x0b; 48];
        let hash = [0xAA; 48];
        assert_eq!(
            compute_verify_data(HashAlgId::Sha384, &key, &hash)
                .unwrap()
                .len(),
            48
        );
        assert_eq!(
            compute_verify_data(HashAlgId::Sha512, &key, &hash)
                .unwrap()
                .len(),
            64
        );
    }

    #[test]
    fn test_derived_finished_keys_sides_differ() {
        let mut ks = DerivedFinishedKeys::new(HashAlgId::Sha256, &[1; 32], &[2; 32]);
        let hash = [0x55; 32];
        let client = ks.finished_mac(false, &hash).unwrap();
        let server = ks.finished_mac(true, &hash).unwrap();
        assert_eq!(client.len(), 32);
        assert_ne!(client, server);

        ks.rotate_traffic_key(TrafficDirection::Read).unwrap();
        ks.rotate_traffic_key(TrafficDirection::Read).unwrap();
        ks.rotate_traffic_key(TrafficDirection::Write).unwrap();
        assert_eq!(ks.read_generation, 2);
        assert_eq!(ks.write_generation, 1);
    }
}
