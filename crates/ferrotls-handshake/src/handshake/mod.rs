//! TLS 1.3 handshake protocol: message handlers and the resumable driver.

pub mod auth_flow;
pub mod certificate;
pub mod codec;
pub mod context;
pub mod driver;
pub mod finished;
pub mod key_update;
pub mod signing;
#[cfg(test)]
pub(crate) mod testing;
pub mod verify;

use crate::alert::{AlertDescription, AlertLevel};
use crate::crypt::key_schedule::KeySchedule;
use crate::crypt::private_key::PrivateKeyMethod;
use crate::record::Transport;
use crate::session::TicketHandler;
use ferrotls_types::TlsError;

/// Handshake message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    ClientHello = 1,
    ServerHello = 2,
    NewSessionTicket = 4,
    EndOfEarlyData = 5,
    EncryptedExtensions = 8,
    Certificate = 11,
    CertificateRequest = 13,
    CertificateVerify = 15,
    Finished = 20,
    KeyUpdate = 24,
    MessageHash = 254,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(HandshakeType::ClientHello),
            2 => Some(HandshakeType::ServerHello),
            4 => Some(HandshakeType::NewSessionTicket),
            5 => Some(HandshakeType::EndOfEarlyData),
            8 => Some(HandshakeType::EncryptedExtensions),
            11 => Some(HandshakeType::Certificate),
            13 => Some(HandshakeType::CertificateRequest),
            15 => Some(HandshakeType::CertificateVerify),
            20 => Some(HandshakeType::Finished),
            24 => Some(HandshakeType::KeyUpdate),
            254 => Some(HandshakeType::MessageHash),
            _ => None,
        }
    }
}

/// What the handshake is blocked on when a stage function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Terminal failure.
    Error,
    Flush,
    FlushAndReadMessage,
    ReadMessage,
    ReadChangeCipherSpec,
    ReadEndOfEarlyData,
    X509Lookup,
    ChannelIdLookup,
    PrivateKeyOperation,
    PendingTicket,
    CertificateVerifyPending,
    EarlyDataRejected,
    /// Nothing to wait on; run the stage function.
    Ok,
}

/// A complete handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub msg_type: HandshakeType,
    pub body: Vec<u8>,
    /// Header and body as received, for the transcript.
    pub raw: Vec<u8>,
}

/// Collaborators borrowed for one call into the engine.
pub struct HandshakeEnv<'a> {
    pub transport: &'a mut dyn Transport,
    pub key_schedule: &'a mut dyn KeySchedule,
    pub private_key: Option<&'a mut dyn PrivateKeyMethod>,
    pub tickets: Option<&'a mut dyn TicketHandler>,
}

impl<'a> HandshakeEnv<'a> {
    pub fn new(transport: &'a mut dyn Transport, key_schedule: &'a mut dyn KeySchedule) -> Self {
        Self {
            transport,
            key_schedule,
            private_key: None,
            tickets: None,
        }
    }

    pub fn with_private_key(mut self, key: &'a mut dyn PrivateKeyMethod) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn with_tickets(mut self, tickets: &'a mut dyn TicketHandler) -> Self {
        self.tickets = Some(tickets);
        self
    }

    /// Send the one fatal alert for a failing path and hand back `err`.
    pub(crate) fn fatal(&mut self, alert: AlertDescription, err: TlsError) -> TlsError {
        log::warn!("fatal alert {:?}: {}", alert, err);
        self.transport.send_alert(AlertLevel::Fatal, alert);
        err
    }

    /// Report a transport read or flush failure. Framing errors are sent to
    /// the peer; a broken transport gets no alert.
    pub(crate) fn transport_error(&mut self, err: TlsError) -> TlsError {
        match err {
            TlsError::IoError(_) => err,
            TlsError::UnexpectedMessage(_) => self.fatal(AlertDescription::UnexpectedMessage, err),
            TlsError::DecodeError(_) => self.fatal(AlertDescription::DecodeError, err),
            _ => self.fatal(AlertDescription::InternalError, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_type_from_u8() {
        for ty in [
            HandshakeType::ClientHello,
            HandshakeType::NewSessionTicket,
            HandshakeType::Certificate,
            HandshakeType::CertificateVerify,
            HandshakeType::Finished,
            HandshakeType::KeyUpdate,
            HandshakeType::MessageHash,
        ] {
            assert_eq!(HandshakeType::from_u8(ty as u8), Some(ty));
        }
        assert_eq!(HandshakeType::from_u8(3), None);
        assert_eq!(HandshakeType::from_u8(255), None);
    }
}
