//! Integration tests for ferrotls.
//! Full handshakes between two endpoints over an in-memory transport.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use ferrotls_handshake::alert::AlertDescription;
    use ferrotls_handshake::config::HandshakeConfig;
    use ferrotls_handshake::connection::HandshakeConnection;
    use ferrotls_handshake::crypt::key_schedule::DerivedFinishedKeys;
    use ferrotls_handshake::crypt::private_key::{
        LocalSigningKey, PrivateKeyMethod, PrivateKeyResult,
    };
    use ferrotls_handshake::crypt::SignatureScheme;
    use ferrotls_handshake::handshake::codec::{encode_key_update, wrap_handshake, KeyUpdateRequest};
    use ferrotls_handshake::handshake::driver::{DriveOutcome, ExternalOp, IoWait};
    use ferrotls_handshake::handshake::key_update::MAX_KEY_UPDATES;
    use ferrotls_handshake::handshake::HandshakeType;
    use ferrotls_handshake::record::memory::MemoryTransport;
    use ferrotls_handshake::session::{Session, TicketHandler, VerifyResult, X509ChainCache};
    use ferrotls_handshake::TlsRole;
    use ferrotls_types::{HashAlgId, TlsError};
    use sha2::{Digest, Sha256};

    type Conn = HandshakeConnection<MemoryTransport, DerivedFinishedKeys>;

    fn identity(name: &str) -> (Vec<u8>, LocalSigningKey) {
        let kp = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec![name.to_string()])
            .unwrap()
            .self_signed(&kp)
            .unwrap();
        let key = LocalSigningKey::ecdsa_p256_from_pkcs8(&kp.serialize_der()).unwrap();
        (cert.der().to_vec(), key)
    }

    fn keys() -> DerivedFinishedKeys {
        DerivedFinishedKeys::new(HashAlgId::Sha384, &[0x3C; 48], &[0xC3; 48])
    }

    fn endpoints(server: HandshakeConfig, client: HandshakeConfig) -> (Conn, Conn) {
        let (s, c) = MemoryTransport::pair();
        (
            HandshakeConnection::new(server, s, keys()),
            HandshakeConnection::new(client, c, keys()),
        )
    }

    /// Drive both sides until neither can make progress.
    fn run_to_completion(server: &mut Conn, client: &mut Conn) {
        for _ in 0..8 {
            let s = server.handshake();
            let c = client.handshake();
            if matches!(s, DriveOutcome::Success) && matches!(c, DriveOutcome::Success) {
                return;
            }
            if let DriveOutcome::Fatal(e) = s {
                panic!("server failed: {e}");
            }
            if let DriveOutcome::Fatal(e) = c {
                panic!("client failed: {e}");
            }
        }
        panic!("handshake did not complete");
    }

    /// Holds the signature until `complete` is called.
    struct DeferredSigner {
        inner: LocalSigningKey,
        queued: Option<(SignatureScheme, Vec<u8>)>,
    }

    impl PrivateKeyMethod for DeferredSigner {
        fn supported_schemes(&self) -> Vec<SignatureScheme> {
            self.inner.supported_schemes()
        }

        fn max_signature_len(&self) -> usize {
            self.inner.max_signature_len()
        }

        fn sign(&mut self, scheme: SignatureScheme, input: &[u8], _: usize) -> PrivateKeyResult {
            self.queued = Some((scheme, input.to_vec()));
            PrivateKeyResult::Retry
        }

        fn complete(&mut self, max_out: usize) -> PrivateKeyResult {
            match self.queued.take() {
                Some((scheme, input)) => self.inner.sign(scheme, &input, max_out),
                None => PrivateKeyResult::Failure,
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedTickets(Rc<RefCell<Vec<Vec<u8>>>>);

    impl TicketHandler for SharedTickets {
        fn process_new_session_ticket(
            &mut self,
            body: &[u8],
            _session: &Session,
        ) -> Result<(), TlsError> {
            self.0.borrow_mut().push(body.to_vec());
            Ok(())
        }
    }

    // -------------------------------------------------------
    // 1. Server authentication with OCSP and SCT stapling
    // -------------------------------------------------------
    #[test]
    fn test_server_auth_with_stapling() {
        let (cert, key) = identity("www.example.test");
        let ocsp = vec![0x30, 0x03, 0x0A, 0x01, 0x00];
        let scts = vec![0x00, 0x05, 0x00, 0x03, 0x01, 0x02, 0x03];
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert.clone()])
                .ocsp_response(ocsp.clone())
                .signed_cert_timestamp_list(scts.clone())
                .hash_algorithm(HashAlgId::Sha384)
                .build(),
            HandshakeConfig::builder()
                .ocsp_stapling(true)
                .signed_cert_timestamps(true)
                .hash_algorithm(HashAlgId::Sha384)
                .session_cache(Arc::new(X509ChainCache))
                .build(),
        );
        server = server.with_private_key(Box::new(key));
        server.context_mut().ocsp_stapling_requested = true;
        server.context_mut().scts_requested = true;

        run_to_completion(&mut server, &mut client);

        let session = client.session();
        assert_eq!(session.peer_leaf(), Some(cert.as_slice()));
        assert_eq!(session.ocsp_response.as_deref(), Some(ocsp.as_slice()));
        assert_eq!(
            session.signed_cert_timestamp_list.as_deref(),
            Some(scts.as_slice())
        );
        assert_eq!(
            session.peer_signature_algorithm,
            Some(SignatureScheme::ECDSA_SECP256R1_SHA256)
        );
        assert_eq!(
            server.context().transcript.current_hash(),
            client.context().transcript.current_hash()
        );
    }

    // -------------------------------------------------------
    // 2. Stapled data the client never asked for
    // -------------------------------------------------------
    #[test]
    fn test_unsolicited_ocsp_rejected() {
        let (cert, key) = identity("www.example.test");
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .ocsp_response(vec![0x30, 0x00])
                .build(),
            HandshakeConfig::builder().build(),
        );
        server = server.with_private_key(Box::new(key));
        server.context_mut().ocsp_stapling_requested = true;

        server.handshake();
        assert!(matches!(
            client.handshake(),
            DriveOutcome::Fatal(TlsError::UnexpectedExtension(5))
        ));
        assert_eq!(
            server.transport().received_alerts()[0].description,
            AlertDescription::UnsupportedExtension
        );
    }

    // -------------------------------------------------------
    // 3. Transport back-pressure and asynchronous signing
    // -------------------------------------------------------
    #[test]
    fn test_suspensions_resume() {
        let (cert, key) = identity("async.test");
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .build(),
            HandshakeConfig::builder().build(),
        );
        server = server.with_private_key(Box::new(DeferredSigner {
            inner: key,
            queued: None,
        }));
        server.transport_mut().set_flush_blocked(true);

        assert!(matches!(
            server.handshake(),
            DriveOutcome::NeedsExternal(ExternalOp::PrivateKeyOperation)
        ));
        assert!(matches!(
            server.handshake(),
            DriveOutcome::NeedsIo(IoWait::Flush)
        ));
        assert!(matches!(
            client.handshake(),
            DriveOutcome::NeedsIo(IoWait::Read)
        ));

        server.transport_mut().set_flush_blocked(false);
        assert!(matches!(
            server.handshake(),
            DriveOutcome::NeedsIo(IoWait::Read)
        ));
        assert!(matches!(client.handshake(), DriveOutcome::Success));
        assert!(matches!(server.handshake(), DriveOutcome::Success));
    }

    // -------------------------------------------------------
    // 4. Mutual authentication keeping only the client leaf hash
    // -------------------------------------------------------
    #[test]
    fn test_mutual_auth_retains_sha256() {
        let (server_cert, server_key) = identity("server.test");
        let (client_cert, client_key) = identity("client.test");
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![server_cert])
                .verify_client_cert(true)
                .require_client_cert(true)
                .retain_only_sha256_of_peer_certs(true)
                .build(),
            HandshakeConfig::builder()
                .certificate_chain(vec![client_cert.clone()])
                .retain_only_sha256_of_peer_certs(true)
                .build(),
        );
        server = server.with_private_key(Box::new(server_key));
        client = client.with_private_key(Box::new(client_key));
        client.context_mut().certificate_requested = true;

        run_to_completion(&mut server, &mut client);

        let expected: [u8; 32] = Sha256::digest(&client_cert).into();
        assert_eq!(server.session().peer_sha256, Some(expected));
        // Only the server side retains the hash.
        assert!(client.session().peer_sha256.is_none());
    }

    // -------------------------------------------------------
    // 5. Client declines to authenticate
    // -------------------------------------------------------
    #[test]
    fn test_anonymous_client() {
        let (cert, key) = identity("server.test");
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .verify_client_cert(true)
                .build(),
            HandshakeConfig::builder().build(),
        );
        server = server.with_private_key(Box::new(key));
        client.context_mut().certificate_requested = true;

        run_to_completion(&mut server, &mut client);
        assert_eq!(server.session().verify_result, VerifyResult::Ok);
        assert!(server.session().peer_certs.is_none());
    }

    // -------------------------------------------------------
    // 6. KeyUpdate flood
    // -------------------------------------------------------
    #[test]
    fn test_key_update_flood() {
        let (cert, key) = identity("server.test");
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .build(),
            HandshakeConfig::builder().build(),
        );
        server = server.with_private_key(Box::new(key));
        run_to_completion(&mut server, &mut client);

        let update = encode_key_update(KeyUpdateRequest::UpdateNotRequested);
        for _ in 0..=MAX_KEY_UPDATES {
            client.transport_mut().inject(&update);
        }
        for _ in 0..MAX_KEY_UPDATES {
            assert!(server.process_post_handshake().unwrap().is_ready());
        }
        assert!(matches!(
            server.process_post_handshake(),
            Err(TlsError::TooManyKeyUpdates)
        ));
        assert_eq!(server.key_schedule().read_generation, MAX_KEY_UPDATES as u64);
        assert_eq!(
            client.transport().received_alerts()[0].description,
            AlertDescription::UnexpectedMessage
        );
    }

    // -------------------------------------------------------
    // 7. Session tickets after the handshake
    // -------------------------------------------------------
    #[test]
    fn test_session_ticket_delivery() {
        let (cert, key) = identity("server.test");
        let tickets = SharedTickets::default();
        let (mut server, mut client) = endpoints(
            HandshakeConfig::builder()
                .role(TlsRole::Server)
                .certificate_chain(vec![cert])
                .build(),
            HandshakeConfig::builder().build(),
        );
        server = server.with_private_key(Box::new(key));
        client = client.with_ticket_handler(Box::new(tickets.clone()));
        run_to_completion(&mut server, &mut client);

        let ticket = wrap_handshake(HandshakeType::NewSessionTicket, &[0xAB; 24]).unwrap();
        server.transport_mut().inject(&ticket);
        // A KeyUpdate in between resets nothing for tickets.
        server
            .transport_mut()
            .inject(&encode_key_update(KeyUpdateRequest::UpdateNotRequested));
        server.transport_mut().inject(&ticket);

        for _ in 0..3 {
            assert!(client.process_post_handshake().unwrap().is_ready());
        }
        assert_eq!(tickets.0.borrow().len(), 2);
        assert_eq!(client.key_schedule().read_generation, 1);
    }
}
