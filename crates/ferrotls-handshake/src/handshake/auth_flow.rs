//! Authentication flight of a TLS 1.3 handshake.
//!
//! Runs after key exchange: the server sends Certificate, CertificateVerify
//! and Finished, optionally reads the client's certificate, then reads the
//! client Finished. The client mirrors that. Negotiation that happens before
//! this point (hello messages, EncryptedExtensions, CertificateRequest) is
//! recorded on the [`HandshakeContext`] by the caller.

use super::certificate::{add_certificate, process_certificate};
use super::context::HandshakeContext;
use super::driver::HandshakeStage;
use super::finished::{add_finished, process_finished, save_expected_client_finished};
use super::signing::add_certificate_verify;
use super::verify::process_certificate_verify;
use super::{HandshakeEnv, HandshakeType, WaitState};
use crate::alert::AlertDescription;
use crate::crypt::private_key::PrivateKeyResult;
use crate::TlsRole;
use ferrotls_types::{CryptoError, TlsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SendCertificate,
    SendCertificateVerify,
    SendFinished,
    ReadCertificate,
    ReadCertificateVerify,
    ReadFinished,
    Done,
}

/// Stage function for the authentication flight.
#[derive(Debug)]
pub struct AuthFlow {
    role: TlsRole,
    phase: Phase,
}

impl AuthFlow {
    pub fn new(role: TlsRole) -> Self {
        let phase = match role {
            TlsRole::Server => Phase::SendCertificate,
            TlsRole::Client => Phase::ReadCertificate,
        };
        Self { role, phase }
    }

    /// Both Finished messages have been exchanged.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    fn advance(&mut self, next: Phase) {
        log::debug!("{:?} auth {:?} -> {:?}", self.role, self.phase, next);
        self.phase = next;
    }

    /// Run one phase. `Ok(None)` moves straight on to the next phase.
    fn run_phase(
        &mut self,
        hs: &mut HandshakeContext,
        env: &mut HandshakeEnv<'_>,
    ) -> Result<Option<WaitState>, TlsError> {
        match self.phase {
            Phase::SendCertificate => {
                add_certificate(hs, env)?;
                if hs.config.certificate_chain.is_empty() {
                    self.advance(Phase::SendFinished);
                } else {
                    self.advance(Phase::SendCertificateVerify);
                }
                Ok(None)
            }

            Phase::SendCertificateVerify => match add_certificate_verify(hs, env) {
                PrivateKeyResult::Success(_) => {
                    self.advance(Phase::SendFinished);
                    Ok(None)
                }
                PrivateKeyResult::Retry => Ok(Some(WaitState::PrivateKeyOperation)),
                PrivateKeyResult::Failure => Err(hs
                    .last_error
                    .take()
                    .unwrap_or(TlsError::CryptoError(CryptoError::SignFailed))),
            },

            Phase::SendFinished => {
                add_finished(hs, env)?;
                if self.role == TlsRole::Client {
                    self.advance(Phase::Done);
                    return Ok(Some(WaitState::Flush));
                }
                if hs.config.verify_client_cert {
                    self.advance(Phase::ReadCertificate);
                } else {
                    // Nothing else can enter the transcript before the
                    // client Finished.
                    save_expected_client_finished(hs, env)?;
                    self.advance(Phase::ReadFinished);
                }
                Ok(Some(WaitState::FlushAndReadMessage))
            }

            Phase::ReadCertificate => {
                if !expect_message(hs, env, HandshakeType::Certificate)? {
                    return Ok(Some(WaitState::ReadMessage));
                }
                let allow_anonymous =
                    self.role == TlsRole::Server && !hs.config.require_client_cert;
                process_certificate(hs, env, allow_anonymous)?;
                hs.hash_current_message();
                hs.message = None;
                if hs.session.peer_certs.is_some() {
                    self.advance(Phase::ReadCertificateVerify);
                } else {
                    self.advance(Phase::ReadFinished);
                }
                Ok(None)
            }

            Phase::ReadCertificateVerify => {
                if !expect_message(hs, env, HandshakeType::CertificateVerify)? {
                    return Ok(Some(WaitState::ReadMessage));
                }
                process_certificate_verify(hs, env)?;
                hs.hash_current_message();
                hs.message = None;
                self.advance(Phase::ReadFinished);
                Ok(None)
            }

            Phase::ReadFinished => {
                if !expect_message(hs, env, HandshakeType::Finished)? {
                    return Ok(Some(WaitState::ReadMessage));
                }
                let use_saved = self.role == TlsRole::Server && !hs.config.verify_client_cert;
                process_finished(hs, env, use_saved)?;
                hs.hash_current_message();
                hs.message = None;
                match self.role {
                    TlsRole::Server => self.advance(Phase::Done),
                    TlsRole::Client if hs.certificate_requested => {
                        self.advance(Phase::SendCertificate)
                    }
                    TlsRole::Client => self.advance(Phase::SendFinished),
                }
                Ok(None)
            }

            Phase::Done => Ok(Some(WaitState::Ok)),
        }
    }
}

impl HandshakeStage for AuthFlow {
    fn step(&mut self, hs: &mut HandshakeContext, env: &mut HandshakeEnv<'_>) -> WaitState {
        loop {
            match self.run_phase(hs, env) {
                Ok(Some(wait)) => return wait,
                Ok(None) => continue,
                Err(e) => {
                    hs.fail(e);
                    return WaitState::Error;
                }
            }
        }
    }
}

/// `Ok(false)` when no message is pending yet; a message of any other type
/// is fatal.
fn expect_message(
    hs: &HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    expected: HandshakeType,
) -> Result<bool, TlsError> {
    match &hs.message {
        None => Ok(false),
        Some(msg) if msg.msg_type == expected => Ok(true),
        Some(msg) => Err(env.fatal(
            AlertDescription::UnexpectedMessage,
            TlsError::UnexpectedMessage(format!(
                "expected {:?}, got {:?}",
                expected, msg.msg_type
            )),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandshakeConfig;
    use crate::crypt::key_schedule::DerivedFinishedKeys;
    use crate::crypt::private_key::LocalSigningKey;
    use crate::crypt::SignatureScheme;
    use crate::handshake::driver::{drive, DriveOutcome, IoWait};
    use crate::handshake::testing::p256_identity;
    use crate::record::memory::MemoryTransport;
    use crate::session::VerifyResult;
    use ferrotls_types::HashAlgId;

    struct Side {
        hs: HandshakeContext,
        flow: AuthFlow,
        transport: MemoryTransport,
        ks: DerivedFinishedKeys,
        key: Option<LocalSigningKey>,
    }

    impl Side {
        fn new(config: HandshakeConfig, transport: MemoryTransport) -> Self {
            let role = config.role;
            Self {
                hs: HandshakeContext::new(config),
                flow: AuthFlow::new(role),
                transport,
                ks: DerivedFinishedKeys::new(HashAlgId::Sha256, &[0xC1; 32], &[0x5E; 32]),
                key: None,
            }
        }

        fn drive(&mut self) -> DriveOutcome {
            let mut env = HandshakeEnv::new(&mut self.transport, &mut self.ks);
            if let Some(key) = self.key.as_mut() {
                env = env.with_private_key(key);
            }
            drive(&mut self.hs, &mut self.flow, &mut env)
        }
    }

    fn pair(server: HandshakeConfig, client: HandshakeConfig) -> (Side, Side) {
        let (s, c) = MemoryTransport::pair();
        (Side::new(server, s), Side::new(client, c))
    }

    fn server_with_identity(builder: crate::config::HandshakeConfigBuilder) -> (HandshakeConfig, LocalSigningKey) {
        let (cert, key) = p256_identity("server.test");
        (
            builder
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .build(),
            key,
        )
    }

    #[test]
    fn test_server_only_authentication() {
        let (config, key) = server_with_identity(HandshakeConfig::builder());
        let (mut server, mut client) = pair(config, HandshakeConfig::builder().build());
        server.key = Some(key);

        assert!(matches!(
            server.drive(),
            DriveOutcome::NeedsIo(IoWait::Read)
        ));
        assert!(server.hs.expected_client_finished.is_some());

        assert!(matches!(client.drive(), DriveOutcome::Success));
        assert!(client.flow.is_done());
        assert_eq!(client.hs.session.peer_chain_len(), 1);
        assert_eq!(
            client.hs.session.peer_signature_algorithm,
            Some(SignatureScheme::ECDSA_SECP256R1_SHA256)
        );

        assert!(matches!(server.drive(), DriveOutcome::Success));
        assert!(server.flow.is_done());
        assert_eq!(server.hs.transcript.current_hash(), client.hs.transcript.current_hash());
    }

    #[test]
    fn test_mutual_authentication() {
        let (config, key) = server_with_identity(
            HandshakeConfig::builder()
                .verify_client_cert(true)
                .require_client_cert(true),
        );
        let (client_cert, client_key) = p256_identity("client.test");
        let (mut server, mut client) = pair(
            config,
            HandshakeConfig::builder()
                .certificate_chain(vec![client_cert.clone()])
                .build(),
        );
        server.key = Some(key);
        client.key = Some(client_key);
        client.hs.certificate_requested = true;

        assert!(matches!(server.drive(), DriveOutcome::NeedsIo(IoWait::Read)));
        assert!(server.hs.expected_client_finished.is_none());
        assert!(matches!(client.drive(), DriveOutcome::Success));
        assert!(matches!(server.drive(), DriveOutcome::Success));
        assert_eq!(server.hs.session.peer_leaf(), Some(client_cert.as_slice()));
        assert!(server.hs.session.peer_signature_algorithm.is_some());
    }

    #[test]
    fn test_anonymous_client_allowed() {
        let (config, key) =
            server_with_identity(HandshakeConfig::builder().verify_client_cert(true));
        let (mut server, mut client) = pair(config, HandshakeConfig::builder().build());
        server.key = Some(key);
        client.hs.certificate_requested = true;

        server.drive();
        assert!(matches!(client.drive(), DriveOutcome::Success));
        assert!(matches!(server.drive(), DriveOutcome::Success));
        assert!(server.hs.session.peer_certs.is_none());
        assert_eq!(server.hs.session.verify_result, VerifyResult::Ok);
    }

    #[test]
    fn test_required_client_certificate_missing() {
        let (config, key) = server_with_identity(
            HandshakeConfig::builder()
                .verify_client_cert(true)
                .require_client_cert(true),
        );
        let (mut server, mut client) = pair(config, HandshakeConfig::builder().build());
        server.key = Some(key);
        client.hs.certificate_requested = true;

        server.drive();
        client.drive();
        assert!(matches!(
            server.drive(),
            DriveOutcome::Fatal(TlsError::PeerDidNotReturnCertificate)
        ));
        assert_eq!(
            client.transport.received_alerts()[0].description,
            AlertDescription::CertificateRequired
        );
        // Terminal from here on.
        assert!(matches!(
            server.drive(),
            DriveOutcome::Fatal(TlsError::HandshakeFailure)
        ));
    }

    #[test]
    fn test_mismatched_finished_keys() {
        let (config, key) = server_with_identity(HandshakeConfig::builder());
        let (mut server, mut client) = pair(config, HandshakeConfig::builder().build());
        server.key = Some(key);
        client.ks = DerivedFinishedKeys::new(HashAlgId::Sha256, &[0xC1; 32], &[0x00; 32]);

        server.drive();
        assert!(matches!(
            client.drive(),
            DriveOutcome::Fatal(TlsError::DigestCheckFailed)
        ));
        assert_eq!(
            server.transport.received_alerts()[0].description,
            AlertDescription::DecryptError
        );
    }

    #[test]
    fn test_out_of_order_message() {
        use crate::handshake::codec::encode_finished;
        use crate::record::Transport;

        let (mut server_end, client_end) = MemoryTransport::pair();
        let mut client = Side::new(HandshakeConfig::builder().build(), client_end);
        server_end.add_message(encode_finished(&[0; 32]).unwrap()).unwrap();
        assert!(server_end.flush_flight().unwrap().is_ready());

        assert!(matches!(
            client.drive(),
            DriveOutcome::Fatal(TlsError::UnexpectedMessage(_))
        ));
        assert_eq!(
            server_end.received_alerts()[0].description,
            AlertDescription::UnexpectedMessage
        );
    }

    #[test]
    fn test_server_without_key_fails() {
        let (config, _key) = server_with_identity(HandshakeConfig::builder());
        let (mut server, client) = pair(config, HandshakeConfig::builder().build());
        assert!(matches!(
            server.drive(),
            DriveOutcome::Fatal(TlsError::InternalError(_))
        ));
        assert_eq!(client.transport.received_alerts().len(), 1);
    }

    #[test]
    fn test_no_common_signature_algorithm_is_policy_failure() {
        let (config, key) = server_with_identity(HandshakeConfig::builder());
        let (mut server, client) = pair(config, HandshakeConfig::builder().build());
        server.key = Some(key);
        server.hs.peer_signature_algorithms = vec![SignatureScheme::ED25519];

        let err = match server.drive() {
            DriveOutcome::Fatal(err) => err,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert!(matches!(err, TlsError::NoCommonSignatureAlgorithm));
        assert_eq!(err.class(), ferrotls_types::ErrorClass::PolicyViolation);
        assert_eq!(
            client.transport.received_alerts()[0].description,
            AlertDescription::HandshakeFailure
        );
    }
}
