//! Per-connection handshake state.
//!
//! Everything needed to resume a suspended handshake lives here; nothing is
//! kept on the call stack between driver invocations.

use zeroize::Zeroizing;

use super::{HandshakeMessage, WaitState};
use crate::config::HandshakeConfig;
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::SignatureScheme;
use crate::session::Session;
use crate::TlsRole;
use ferrotls_types::TlsError;

/// State of one connection's handshake.
pub struct HandshakeContext {
    pub config: HandshakeConfig,
    pub wait: WaitState,
    pub transcript: TranscriptHash,
    /// Message most recently delivered by the driver, not yet consumed.
    pub message: Option<HandshakeMessage>,
    /// Signature schemes the peer advertised. Empty means no restriction.
    pub peer_signature_algorithms: Vec<SignatureScheme>,
    /// The peer asked for a stapled OCSP response on our leaf.
    pub ocsp_stapling_requested: bool,
    /// The peer asked for an SCT list on our leaf.
    pub scts_requested: bool,
    /// Client: the server sent a CertificateRequest.
    pub certificate_requested: bool,
    /// A `PrivateKeyMethod::sign` call returned `Retry`.
    pub pending_private_key_op: bool,
    /// Server: client Finished computed ahead of time.
    pub expected_client_finished: Option<Zeroizing<Vec<u8>>>,
    pub can_early_read: bool,
    pub can_early_write: bool,
    /// Consecutive KeyUpdates received since the last other message.
    pub key_update_count: u8,
    /// An acknowledging KeyUpdate is queued but not yet on the wire.
    pub key_update_pending: bool,
    /// The error that moved the context to `WaitState::Error`.
    pub last_error: Option<TlsError>,
    pub session: Session,
}

impl HandshakeContext {
    pub fn new(config: HandshakeConfig) -> Self {
        let transcript = TranscriptHash::new(config.hash_algorithm);
        Self {
            config,
            wait: WaitState::Ok,
            transcript,
            message: None,
            peer_signature_algorithms: Vec::new(),
            ocsp_stapling_requested: false,
            scts_requested: false,
            certificate_requested: false,
            pending_private_key_op: false,
            expected_client_finished: None,
            can_early_read: false,
            can_early_write: false,
            key_update_count: 0,
            key_update_pending: false,
            last_error: None,
            session: Session::default(),
        }
    }

    pub fn role(&self) -> TlsRole {
        self.config.role
    }

    pub fn is_server(&self) -> bool {
        self.config.role.is_server()
    }

    /// Hash output size of the negotiated transcript hash.
    pub fn hash_len(&self) -> usize {
        self.transcript.hash_len()
    }

    /// Take the pending message, leaving none.
    pub fn take_message(&mut self) -> Option<HandshakeMessage> {
        self.message.take()
    }

    /// Body of the pending message, or an empty slice.
    pub fn message_body(&self) -> &[u8] {
        self.message.as_ref().map(|m| m.body.as_slice()).unwrap_or(&[])
    }

    /// Add the pending message to the transcript.
    pub fn hash_current_message(&mut self) {
        if let Some(msg) = &self.message {
            self.transcript.update(&msg.raw);
        }
    }

    /// Add an outgoing message to the transcript.
    pub fn hash_outgoing(&mut self, msg: &[u8]) {
        self.transcript.update(msg);
    }

    /// Queued output reached the transport.
    pub fn note_flushed(&mut self) {
        self.key_update_pending = false;
    }

    /// Leave the `EarlyDataRejected` wait so the handshake can continue
    /// without 0-RTT.
    pub fn reset_early_data_reject(&mut self) -> Result<(), TlsError> {
        if self.wait != WaitState::EarlyDataRejected {
            return Err(TlsError::InternalError(
                "early data was not rejected".into(),
            ));
        }
        self.wait = WaitState::Ok;
        Ok(())
    }

    /// Park the context in the terminal error state.
    pub fn fail(&mut self, err: TlsError) {
        self.wait = WaitState::Error;
        self.last_error = Some(err);
    }
}

impl std::fmt::Debug for HandshakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("role", &self.config.role)
            .field("wait", &self.wait)
            .field("transcript", &self.transcript)
            .field("pending_private_key_op", &self.pending_private_key_op)
            .field("key_update_count", &self.key_update_count)
            .field("key_update_pending", &self.key_update_pending)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
