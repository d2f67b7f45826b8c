//! The session under construction and the collaborators that post-process it.

use crate::crypt::public_key::PeerPublicKey;
use crate::crypt::SignatureScheme;
use ferrotls_types::TlsError;
use x509_parser::prelude::*;

/// Outcome of peer certificate verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VerifyResult {
    #[default]
    NotVerified,
    /// Verified, or the peer was permitted to stay anonymous.
    Ok,
    Rejected(String),
}

/// Authentication data established during the handshake.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Peer chain, leaf first. `None` means the peer sent no certificates.
    pub peer_certs: Option<Vec<Vec<u8>>>,
    pub peer_public_key: Option<PeerPublicKey>,
    pub peer_signature_algorithm: Option<SignatureScheme>,
    pub verify_result: VerifyResult,
    /// SHA-256 of the peer leaf, kept instead of the chain when configured.
    pub peer_sha256: Option<[u8; 32]>,
    /// Stapled OCSP response from the leaf entry.
    pub ocsp_response: Option<Vec<u8>>,
    /// SignedCertificateTimestampList from the leaf entry.
    pub signed_cert_timestamp_list: Option<Vec<u8>>,
}

impl Session {
    /// The peer leaf certificate, if any.
    pub fn peer_leaf(&self) -> Option<&[u8]> {
        self.peer_certs
            .as_ref()
            .and_then(|chain| chain.first())
            .map(|c| c.as_slice())
    }

    /// Number of certificates the peer presented.
    pub fn peer_chain_len(&self) -> usize {
        self.peer_certs.as_ref().map_or(0, |c| c.len())
    }
}

/// Post-processing hook run once the peer chain is stored in the session
/// (e.g. parsing it into a certificate-library representation).
pub trait SessionObjectCache: Send + Sync {
    fn cache_objects(&self, session: &mut Session) -> Result<(), TlsError>;
}

/// Parses every stored certificate as X.509.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509ChainCache;

impl SessionObjectCache for X509ChainCache {
    fn cache_objects(&self, session: &mut Session) -> Result<(), TlsError> {
        let Some(chain) = session.peer_certs.as_ref() else {
            return Ok(());
        };
        for (i, der) in chain.iter().enumerate() {
            let (rest, _) = X509Certificate::from_der(der)
                .map_err(|e| TlsError::DecodeError(format!("certificate {i}: {e}")))?;
            if !rest.is_empty() {
                return Err(TlsError::DecodeError(format!(
                    "certificate {i}: trailing data"
                )));
            }
        }
        Ok(())
    }
}

/// Consumer of NewSessionTicket messages received after the handshake.
pub trait TicketHandler {
    /// Process one NewSessionTicket body.
    fn process_new_session_ticket(
        &mut self,
        body: &[u8],
        session: &Session,
    ) -> Result<(), TlsError>;
}

/// Keeps every received ticket body.
#[derive(Debug, Default)]
pub struct TicketStore {
    pub tickets: Vec<Vec<u8>>,
}

impl TicketHandler for TicketStore {
    fn process_new_session_ticket(
        &mut self,
        body: &[u8],
        _session: &Session,
    ) -> Result<(), TlsError> {
        // ticket_lifetime(4) || ticket_age_add(4) || nonce<1> || ticket<2> || exts<2>
        if body.len() < 4 + 4 + 1 + 2 + 2 {
            return Err(TlsError::DecodeError("NewSessionTicket: too short".into()));
        }
        self.tickets.push(body.to_vec());
        Ok(())
    }
}
