//! Owning wrapper that ties a handshake context to its collaborators.
//!
//! The engine functions borrow their collaborators per call; this type keeps
//! them together for the lifetime of a connection and exposes the
//! caller-facing operations: drive the handshake, process post-handshake
//! messages, flush, and start a key update.

use std::task::Poll;

use crate::config::HandshakeConfig;
use crate::crypt::key_schedule::KeySchedule;
use crate::crypt::private_key::PrivateKeyMethod;
use crate::handshake::auth_flow::AuthFlow;
use crate::handshake::codec::KeyUpdateRequest;
use crate::handshake::context::HandshakeContext;
use crate::handshake::driver::{drive, DriveOutcome};
use crate::handshake::key_update::{post_handshake, send_key_update};
use crate::handshake::{HandshakeEnv, WaitState};
use crate::record::Transport;
use crate::session::{Session, TicketHandler};
use ferrotls_types::TlsError;

/// A TLS 1.3 endpoint's handshake state plus the collaborators it drives.
pub struct HandshakeConnection<T: Transport, K: KeySchedule> {
    hs: HandshakeContext,
    flow: AuthFlow,
    transport: T,
    key_schedule: K,
    private_key: Option<Box<dyn PrivateKeyMethod>>,
    tickets: Option<Box<dyn TicketHandler>>,
    complete: bool,
}

impl<T: Transport, K: KeySchedule> HandshakeConnection<T, K> {
    pub fn new(config: HandshakeConfig, transport: T, key_schedule: K) -> Self {
        let flow = AuthFlow::new(config.role);
        Self {
            hs: HandshakeContext::new(config),
            flow,
            transport,
            key_schedule,
            private_key: None,
            tickets: None,
            complete: false,
        }
    }

    /// Signing capability for our CertificateVerify.
    pub fn with_private_key(mut self, key: Box<dyn PrivateKeyMethod>) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Receiver for NewSessionTicket messages (client only).
    pub fn with_ticket_handler(mut self, tickets: Box<dyn TicketHandler>) -> Self {
        self.tickets = Some(tickets);
        self
    }

    fn parts(&mut self) -> (&mut HandshakeContext, &mut AuthFlow, HandshakeEnv<'_>) {
        let Self {
            hs,
            flow,
            transport,
            key_schedule,
            private_key,
            tickets,
            ..
        } = self;
        let mut env = HandshakeEnv::new(transport, key_schedule);
        if let Some(key) = private_key.as_deref_mut() {
            env = env.with_private_key(key);
        }
        if let Some(tickets) = tickets.as_deref_mut() {
            env = env.with_tickets(tickets);
        }
        (hs, flow, env)
    }

    /// Advance the handshake. Call again after the reported condition clears.
    pub fn handshake(&mut self) -> DriveOutcome {
        let (hs, flow, mut env) = self.parts();
        let outcome = drive(hs, flow, &mut env);
        if matches!(outcome, DriveOutcome::Success) {
            self.complete = true;
        }
        outcome
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.complete
    }

    /// Read and process one post-handshake message.
    ///
    /// Any error is fatal for the connection; its alert has been sent.
    pub fn process_post_handshake(&mut self) -> Result<Poll<()>, TlsError> {
        if !self.complete || self.hs.wait == WaitState::Error {
            return Err(TlsError::InternalError(
                "post-handshake processing before the handshake completed".into(),
            ));
        }
        let (hs, _, mut env) = self.parts();
        let msg = match env.transport.read_message() {
            Ok(Poll::Ready(msg)) => msg,
            Ok(Poll::Pending) => return Ok(Poll::Pending),
            Err(e) => {
                hs.wait = WaitState::Error;
                return Err(env.transport_error(e));
            }
        };
        hs.message = Some(msg);
        let result = post_handshake(hs, &mut env);
        hs.message = None;
        if result.is_err() {
            hs.wait = WaitState::Error;
        }
        result.map(Poll::Ready)
    }

    /// Push queued handshake output to the transport.
    pub fn flush(&mut self) -> Result<Poll<()>, TlsError> {
        let flushed = self.transport.flush_flight()?;
        if flushed.is_ready() {
            self.hs.note_flushed();
        }
        Ok(flushed)
    }

    /// Queue a KeyUpdate and rotate our write key. No-op while an earlier
    /// update is still unflushed.
    pub fn key_update(&mut self, request: KeyUpdateRequest) -> Result<(), TlsError> {
        if !self.complete {
            return Err(TlsError::InternalError(
                "key update before the handshake completed".into(),
            ));
        }
        let (hs, _, mut env) = self.parts();
        send_key_update(hs, &mut env, request)
    }

    /// Continue without 0-RTT after `DriveOutcome::EarlyDataRejected`.
    pub fn reset_early_data_reject(&mut self) -> Result<(), TlsError> {
        self.hs.reset_early_data_reject()
    }

    pub fn session(&self) -> &Session {
        &self.hs.session
    }

    pub fn context(&self) -> &HandshakeContext {
        &self.hs
    }

    /// Mutable context, for recording negotiation done before the
    /// authentication flight (peer signature algorithms, CertificateRequest,
    /// stapling requests, early data state).
    pub fn context_mut(&mut self) -> &mut HandshakeContext {
        &mut self.hs
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn key_schedule(&self) -> &K {
        &self.key_schedule
    }
}

impl<T: Transport, K: KeySchedule> std::fmt::Debug for HandshakeConnection<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeConnection")
            .field("hs", &self.hs)
            .field("flow", &self.flow)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}
