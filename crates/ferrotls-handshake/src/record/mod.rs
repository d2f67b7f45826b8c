//! Record-layer contract used by the handshake driver.
//!
//! Framing, encryption and socket I/O live behind [`Transport`]. Every
//! operation that may block returns `Poll::Pending` instead; the driver then
//! suspends and is re-entered once the transport can make progress.

pub mod memory;

use std::task::Poll;

use crate::alert::{AlertDescription, AlertLevel};
use crate::handshake::HandshakeMessage;
use ferrotls_types::TlsError;

/// Message transport for one connection.
pub trait Transport {
    /// Write all queued handshake messages to the peer.
    fn flush_flight(&mut self) -> Result<Poll<()>, TlsError>;

    /// Note that the next read starts a new peer flight.
    fn expect_flight(&mut self);

    /// Read the next complete handshake message.
    fn read_message(&mut self) -> Result<Poll<HandshakeMessage>, TlsError>;

    /// Consume a compatibility-mode ChangeCipherSpec record.
    fn read_change_cipher_spec(&mut self) -> Result<Poll<()>, TlsError>;

    /// Queue an encoded handshake message (header included) for the next
    /// flush.
    fn add_message(&mut self, msg: Vec<u8>) -> Result<(), TlsError>;

    /// Send an alert immediately.
    fn send_alert(&mut self, level: AlertLevel, description: AlertDescription);
}
