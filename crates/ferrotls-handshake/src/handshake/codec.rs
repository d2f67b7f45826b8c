//! TLS 1.3 handshake message framing and the small fixed-layout messages
//! (RFC 8446 §4).

use crate::crypt::SignatureScheme;
use ferrotls_types::TlsError;

use super::HandshakeType;

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Cursor over untrusted bytes. Every getter fails instead of reading past
/// the end.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.data.len() < n {
            return None;
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Some(head)
    }

    pub fn get_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn get_u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn get_u24(&mut self) -> Option<u32> {
        self.take(3).map(read_u24)
    }

    /// Read a body preceded by a 1-byte length.
    pub fn get_u8_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = self.get_u8()? as usize;
        self.take(len)
    }

    /// Read a body preceded by a 2-byte length.
    pub fn get_u16_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = self.get_u16()? as usize;
        self.take(len)
    }

    /// Read a body preceded by a 3-byte length.
    pub fn get_u24_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = self.get_u24()? as usize;
        self.take(len)
    }
}

/// Read a 3-byte big-endian integer.
fn read_u24(data: &[u8]) -> u32 {
    ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32)
}

const U24_MAX: usize = 0xFF_FFFF;

/// Append a 3-byte big-endian length. Lengths that do not fit are an
/// internal error, never truncated.
pub(crate) fn put_u24(out: &mut Vec<u8>, len: usize) -> Result<(), TlsError> {
    if len > U24_MAX {
        return Err(TlsError::InternalError(format!(
            "length {len} exceeds 24-bit field"
        )));
    }
    out.push((len >> 16) as u8);
    out.push((len >> 8) as u8);
    out.push(len as u8);
    Ok(())
}

/// Append `body` preceded by its 2-byte length.
pub(crate) fn put_u16_prefixed(out: &mut Vec<u8>, body: &[u8]) -> Result<(), TlsError> {
    let len = u16::try_from(body.len()).map_err(|_| {
        TlsError::InternalError(format!("length {} exceeds 16-bit field", body.len()))
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}

/// Append `body` preceded by its 3-byte length.
pub(crate) fn put_u24_prefixed(out: &mut Vec<u8>, body: &[u8]) -> Result<(), TlsError> {
    put_u24(out, body.len())?;
    out.extend_from_slice(body);
    Ok(())
}

// ---------------------------------------------------------------------------
// Handshake header
// ---------------------------------------------------------------------------

/// Parse a handshake header: msg_type(1) || length(3).
///
/// Returns `Ok(None)` when `data` does not yet hold the complete message,
/// otherwise (HandshakeType, body_slice, total_bytes_consumed).
pub fn parse_handshake_header(
    data: &[u8],
) -> Result<Option<(HandshakeType, &[u8], usize)>, TlsError> {
    if data.len() < 4 {
        return Ok(None);
    }
    let msg_type = HandshakeType::from_u8(data[0]).ok_or_else(|| {
        TlsError::UnexpectedMessage(format!("unknown handshake type: {}", data[0]))
    })?;
    let length = read_u24(&data[1..4]) as usize;
    let total = 4 + length;
    if data.len() < total {
        return Ok(None);
    }
    Ok(Some((msg_type, &data[4..total], total)))
}

/// Wrap a handshake body with the 4-byte header.
pub fn wrap_handshake(msg_type: HandshakeType, body: &[u8]) -> Result<Vec<u8>, TlsError> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.push(msg_type as u8);
    put_u24_prefixed(&mut out, body)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// CertificateVerify
// ---------------------------------------------------------------------------

/// CertificateVerify message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerifyMsg {
    pub algorithm: SignatureScheme,
    pub signature: Vec<u8>,
}

/// Decode a CertificateVerify body: algorithm(2) || signature<0..2^16-1>.
pub fn decode_certificate_verify(data: &[u8]) -> Result<CertificateVerifyMsg, TlsError> {
    let mut r = Reader::new(data);
    let (algorithm, signature) = match (r.get_u16(), r.get_u16_prefixed()) {
        (Some(alg), Some(sig)) if r.is_empty() => (alg, sig),
        _ => {
            return Err(TlsError::DecodeError(
                "CertificateVerify: malformed body".into(),
            ))
        }
    };
    Ok(CertificateVerifyMsg {
        algorithm: SignatureScheme(algorithm),
        signature: signature.to_vec(),
    })
}

/// Encode a CertificateVerify as a complete handshake message.
pub fn encode_certificate_verify(cv: &CertificateVerifyMsg) -> Result<Vec<u8>, TlsError> {
    let mut body = Vec::with_capacity(4 + cv.signature.len());
    body.extend_from_slice(&cv.algorithm.0.to_be_bytes());
    put_u16_prefixed(&mut body, &cv.signature)?;
    wrap_handshake(HandshakeType::CertificateVerify, &body)
}

// ---------------------------------------------------------------------------
// Finished
// ---------------------------------------------------------------------------

/// Encode a Finished message as a complete handshake message.
pub fn encode_finished(verify_data: &[u8]) -> Result<Vec<u8>, TlsError> {
    wrap_handshake(HandshakeType::Finished, verify_data)
}

// ---------------------------------------------------------------------------
// KeyUpdate
// ---------------------------------------------------------------------------

/// KeyUpdateRequest (RFC 8446 §4.6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyUpdateRequest {
    UpdateNotRequested = 0,
    UpdateRequested = 1,
}

/// Decode a KeyUpdate body: exactly one byte holding a defined request code.
pub fn decode_key_update(data: &[u8]) -> Result<KeyUpdateRequest, TlsError> {
    match data {
        [0] => Ok(KeyUpdateRequest::UpdateNotRequested),
        [1] => Ok(KeyUpdateRequest::UpdateRequested),
        [v] => Err(TlsError::DecodeError(format!(
            "KeyUpdate: undefined request value {v}"
        ))),
        _ => Err(TlsError::DecodeError(format!(
            "KeyUpdate: body length {}",
            data.len()
        ))),
    }
}

/// Encode a KeyUpdate as a complete handshake message.
pub fn encode_key_update(request: KeyUpdateRequest) -> Vec<u8> {
    vec![HandshakeType::KeyUpdate as u8, 0, 0, 1, request as u8]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
