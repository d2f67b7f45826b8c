//! CertificateVerify signature input and verification of the peer's
//! CertificateVerify (RFC 8446 §4.4.3).

use super::codec::decode_certificate_verify;
use super::context::HandshakeContext;
use super::HandshakeEnv;
use crate::alert::AlertDescription;
use crate::crypt::public_key::PeerPublicKey;
use crate::crypt::SignatureScheme;
use ferrotls_types::{CryptoError, TlsError};

/// Which party a CertificateVerify signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CertVerifyContext {
    Server = 0,
    Client = 1,
    ChannelId = 2,
}

impl CertVerifyContext {
    /// Context string, including the trailing NUL.
    pub fn label(self) -> &'static [u8] {
        match self {
            CertVerifyContext::Server => b"TLS 1.3, server CertificateVerify\0",
            CertVerifyContext::Client => b"TLS 1.3, client CertificateVerify\0",
            CertVerifyContext::ChannelId => b"TLS 1.3, Channel ID\0",
        }
    }

    /// The context used when `is_server` signs.
    pub fn for_signer(is_server: bool) -> Self {
        if is_server {
            CertVerifyContext::Server
        } else {
            CertVerifyContext::Client
        }
    }
}

impl TryFrom<u8> for CertVerifyContext {
    type Error = TlsError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(CertVerifyContext::Server),
            1 => Ok(CertVerifyContext::Client),
            2 => Ok(CertVerifyContext::ChannelId),
            _ => Err(TlsError::InternalError(format!(
                "unknown CertificateVerify context {v}"
            ))),
        }
    }
}

/// Build the content covered by a CertificateVerify signature:
/// 64 spaces || context label || 0x00 || transcript hash.
pub fn build_signature_input(transcript_hash: &[u8], context: CertVerifyContext) -> Vec<u8> {
    let label = context.label();
    let mut input = Vec::with_capacity(64 + label.len() + transcript_hash.len());
    input.extend_from_slice(&[0x20; 64]);
    input.extend_from_slice(label);
    input.extend_from_slice(transcript_hash);
    input
}

/// Verify a CertificateVerify signature against the peer's key.
pub fn verify_certificate_signature(
    peer_key: &PeerPublicKey,
    scheme: SignatureScheme,
    signature: &[u8],
    input: &[u8],
) -> Result<bool, CryptoError> {
    peer_key.verify(scheme, input, signature)
}

/// Process the pending CertificateVerify message.
///
/// The signature is checked over the transcript up to, but not including,
/// this message.
pub fn process_certificate_verify(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
) -> Result<(), TlsError> {
    let Some(peer_key) = hs.session.peer_public_key.clone() else {
        return Err(env.fatal(
            AlertDescription::InternalError,
            TlsError::InternalError("CertificateVerify without a peer key".into()),
        ));
    };

    let cv = decode_certificate_verify(hs.message_body())
        .map_err(|e| env.fatal(AlertDescription::DecodeError, e))?;

    if let Err(alert) = hs
        .config
        .signature_policy
        .check_peer_signature_algorithm(cv.algorithm)
    {
        return Err(env.fatal(
            alert,
            TlsError::SignatureAlgorithmRejected(cv.algorithm.0),
        ));
    }
    hs.session.peer_signature_algorithm = Some(cv.algorithm);

    // The peer signed with its own role's context.
    let context = CertVerifyContext::for_signer(!hs.is_server());
    let input = build_signature_input(&hs.transcript.current_hash(), context);

    let sig_ok = verify_certificate_signature(&peer_key, cv.algorithm, &cv.signature, &input)
        .unwrap_or(false);
    if !sig_ok && !hs.config.insecure_fuzzer_mode() {
        return Err(env.fatal(AlertDescription::DecryptError, TlsError::BadSignature));
    }
    log::debug!("peer CertificateVerify ok ({:#06x})", cv.algorithm.0);
    Ok(())
}
