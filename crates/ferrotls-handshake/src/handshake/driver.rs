//! Resumable handshake driver.
//!
//! [`drive`] resolves whatever the context is waiting on, runs the stage
//! function, and repeats until the handshake completes, fails, or has to
//! suspend. Suspension never loses state: calling `drive` again resumes from
//! `HandshakeContext::wait`.

use std::task::Poll;

use super::context::HandshakeContext;
use super::{HandshakeEnv, WaitState};
use ferrotls_types::TlsError;

/// Transport readiness the caller must wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoWait {
    Flush,
    Read,
    ChangeCipherSpec,
}

/// Out-of-band work the caller must finish before resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalOp {
    X509Lookup,
    ChannelIdLookup,
    PrivateKeyOperation,
    PendingTicket,
    CertificateVerify,
}

/// Result of one call to [`drive`].
#[derive(Debug)]
pub enum DriveOutcome {
    /// The handshake is complete.
    Success,
    NeedsIo(IoWait),
    NeedsExternal(ExternalOp),
    /// Early data may be read before the handshake finishes.
    EarlyReturn,
    /// 0-RTT was rejected; writes of early data must stop. Persists until
    /// `HandshakeContext::reset_early_data_reject`.
    EarlyDataRejected,
    Fatal(TlsError),
}

/// The state-specific part of the handshake.
pub trait HandshakeStage {
    /// Advance as far as possible and report what to wait on next.
    ///
    /// Returning `WaitState::Error` requires that the alert was already sent
    /// and the error recorded with `HandshakeContext::fail`.
    fn step(&mut self, hs: &mut HandshakeContext, env: &mut HandshakeEnv<'_>) -> WaitState;
}

/// Run the handshake until it completes or must suspend.
pub fn drive(
    hs: &mut HandshakeContext,
    stage: &mut dyn HandshakeStage,
    env: &mut HandshakeEnv<'_>,
) -> DriveOutcome {
    loop {
        match hs.wait {
            WaitState::Error => return DriveOutcome::Fatal(TlsError::HandshakeFailure),

            WaitState::Flush | WaitState::FlushAndReadMessage => {
                match env.transport.flush_flight() {
                    Ok(Poll::Ready(())) => hs.note_flushed(),
                    Ok(Poll::Pending) => {
                        log::trace!("handshake suspended on flush");
                        return DriveOutcome::NeedsIo(IoWait::Flush);
                    }
                    Err(e) => return transport_failure(hs, env, e),
                }
                if hs.wait == WaitState::FlushAndReadMessage {
                    env.transport.expect_flight();
                    hs.wait = WaitState::ReadMessage;
                    if let Some(outcome) = read_message(hs, env) {
                        return outcome;
                    }
                }
            }

            WaitState::ReadMessage => {
                if let Some(outcome) = read_message(hs, env) {
                    return outcome;
                }
            }

            WaitState::ReadChangeCipherSpec => match env.transport.read_change_cipher_spec() {
                Ok(Poll::Ready(())) => {}
                Ok(Poll::Pending) => {
                    log::trace!("handshake suspended on ChangeCipherSpec");
                    return DriveOutcome::NeedsIo(IoWait::ChangeCipherSpec);
                }
                Err(e) => return transport_failure(hs, env, e),
            },

            WaitState::ReadEndOfEarlyData => {
                if hs.can_early_read {
                    return DriveOutcome::EarlyReturn;
                }
                hs.wait = WaitState::Ok;
            }

            WaitState::X509Lookup => return suspend_external(hs, ExternalOp::X509Lookup),
            WaitState::ChannelIdLookup => return suspend_external(hs, ExternalOp::ChannelIdLookup),
            WaitState::PrivateKeyOperation => {
                return suspend_external(hs, ExternalOp::PrivateKeyOperation)
            }
            WaitState::PendingTicket => return suspend_external(hs, ExternalOp::PendingTicket),
            WaitState::CertificateVerifyPending => {
                return suspend_external(hs, ExternalOp::CertificateVerify)
            }

            WaitState::EarlyDataRejected => {
                hs.can_early_write = false;
                return DriveOutcome::EarlyDataRejected;
            }

            WaitState::Ok => {}
        }

        let next = stage.step(hs, env);
        hs.wait = next;
        match next {
            // The stage already sent its alert.
            WaitState::Error => {
                let err = hs.last_error.take().unwrap_or(TlsError::HandshakeFailure);
                return DriveOutcome::Fatal(err);
            }
            WaitState::Ok => return DriveOutcome::Success,
            other => log::trace!("handshake waiting on {:?}", other),
        }
    }
}

fn suspend_external(hs: &mut HandshakeContext, op: ExternalOp) -> DriveOutcome {
    log::trace!("handshake suspended on {:?}", op);
    hs.wait = WaitState::Ok;
    DriveOutcome::NeedsExternal(op)
}

fn read_message(hs: &mut HandshakeContext, env: &mut HandshakeEnv<'_>) -> Option<DriveOutcome> {
    match env.transport.read_message() {
        Ok(Poll::Ready(msg)) => {
            hs.message = Some(msg);
            None
        }
        Ok(Poll::Pending) => {
            log::trace!("handshake suspended on read");
            Some(DriveOutcome::NeedsIo(IoWait::Read))
        }
        Err(e) => Some(transport_failure(hs, env, e)),
    }
}

/// Fail the handshake on a transport error.
fn transport_failure(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    err: TlsError,
) -> DriveOutcome {
    let err = env.transport_error(err);
    hs.wait = WaitState::Error;
    DriveOutcome::Fatal(err)
}
