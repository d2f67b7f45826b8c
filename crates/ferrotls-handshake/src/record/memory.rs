//! In-memory transport pair.
//!
//! Each side buffers its outgoing flight until `flush_flight`, then appends
//! it to the peer's byte stream. The reader reassembles handshake messages
//! from that stream, so a message split across flushes is only delivered
//! once complete.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::task::Poll;

use super::Transport;
use crate::alert::{Alert, AlertDescription, AlertLevel};
use crate::handshake::codec::parse_handshake_header;
use crate::handshake::HandshakeMessage;
use ferrotls_types::TlsError;

#[derive(Debug, Default)]
struct Pipe {
    handshake: VecDeque<u8>,
    change_cipher_specs: usize,
    alerts: Vec<Alert>,
}

type SharedPipe = Rc<RefCell<Pipe>>;

/// One end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    incoming: SharedPipe,
    outgoing: SharedPipe,
    pending_flight: Vec<u8>,
    flush_blocked: bool,
    flights_flushed: usize,
    flights_expected: usize,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let a_to_b: SharedPipe = Rc::default();
        let b_to_a: SharedPipe = Rc::default();
        let a = MemoryTransport::new(b_to_a.clone(), a_to_b.clone());
        let b = MemoryTransport::new(a_to_b, b_to_a);
        (a, b)
    }

    fn new(incoming: SharedPipe, outgoing: SharedPipe) -> Self {
        Self {
            incoming,
            outgoing,
            pending_flight: Vec::new(),
            flush_blocked: false,
            flights_flushed: 0,
            flights_expected: 0,
        }
    }

    /// While set, `flush_flight` reports `Pending` and keeps the flight.
    pub fn set_flush_blocked(&mut self, blocked: bool) {
        self.flush_blocked = blocked;
    }

    /// Bytes queued but not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.pending_flight.len()
    }

    pub fn flights_flushed(&self) -> usize {
        self.flights_flushed
    }

    pub fn flights_expected(&self) -> usize {
        self.flights_expected
    }

    /// Alerts this end has sent.
    pub fn sent_alerts(&self) -> Vec<Alert> {
        self.outgoing.borrow().alerts.clone()
    }

    /// Alerts the peer has sent.
    pub fn received_alerts(&self) -> Vec<Alert> {
        self.incoming.borrow().alerts.clone()
    }

    /// Send a ChangeCipherSpec record to the peer.
    pub fn send_change_cipher_spec(&mut self) {
        self.outgoing.borrow_mut().change_cipher_specs += 1;
    }

    /// Append raw bytes to the peer's stream, bypassing the flight buffer.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.outgoing.borrow_mut().handshake.extend(bytes);
    }
}

impl Transport for MemoryTransport {
    fn flush_flight(&mut self) -> Result<Poll<()>, TlsError> {
        if self.flush_blocked {
            return Ok(Poll::Pending);
        }
        if !self.pending_flight.is_empty() {
            let flight = std::mem::take(&mut self.pending_flight);
            self.outgoing.borrow_mut().handshake.extend(flight);
        }
        self.flights_flushed += 1;
        Ok(Poll::Ready(()))
    }

    fn expect_flight(&mut self) {
        self.flights_expected += 1;
    }

    fn read_message(&mut self) -> Result<Poll<HandshakeMessage>, TlsError> {
        let mut pipe = self.incoming.borrow_mut();
        let data = pipe.handshake.make_contiguous();
        let (msg_type, body, raw) = match parse_handshake_header(data)? {
            None => return Ok(Poll::Pending),
            Some((msg_type, body, total)) => (msg_type, body.to_vec(), data[..total].to_vec()),
        };
        pipe.handshake.drain(..raw.len());
        Ok(Poll::Ready(HandshakeMessage {
            msg_type,
            body,
            raw,
        }))
    }

    fn read_change_cipher_spec(&mut self) -> Result<Poll<()>, TlsError> {
        let mut pipe = self.incoming.borrow_mut();
        if pipe.change_cipher_specs == 0 {
            return Ok(Poll::Pending);
        }
        pipe.change_cipher_specs -= 1;
        Ok(Poll::Ready(()))
    }

    fn add_message(&mut self, msg: Vec<u8>) -> Result<(), TlsError> {
        self.pending_flight.extend_from_slice(&msg);
        Ok(())
    }

    fn send_alert(&mut self, level: AlertLevel, description: AlertDescription) {
        self.outgoing
            .borrow_mut()
            .alerts
            .push(Alert { level, description });
    }
}
