//! Certificate message: decoding the peer chain into the session and
//! encoding our own chain (RFC 8446 §4.4.2).

use sha2::{Digest, Sha256};

use super::codec::{put_u16_prefixed, put_u24, put_u24_prefixed, wrap_handshake, Reader};
use super::context::HandshakeContext;
use super::{HandshakeEnv, HandshakeType};
use crate::alert::AlertDescription;
use crate::config::SctListValidator;
use crate::crypt::public_key::{has_digital_signature_key_usage, PeerPublicKey};
use crate::extensions::{
    encode_extensions, parse_extensions, CertificateExtensionPolicy, Extension, ExtensionType,
};
use crate::session::VerifyResult;
use ferrotls_types::TlsError;

/// CertificateStatusType ocsp (RFC 6066).
const STATUS_TYPE_OCSP: u8 = 1;

/// Local policy applied while decoding a peer Certificate.
pub struct CertificateDecodeOptions<'a> {
    /// We are the server, so the peer is a client and may not staple.
    pub is_server: bool,
    pub ocsp_stapling: bool,
    pub signed_cert_timestamps: bool,
    pub extension_policy: &'a CertificateExtensionPolicy,
    pub sct_validator: &'a dyn SctListValidator,
}

impl<'a> CertificateDecodeOptions<'a> {
    pub fn from_context(hs: &'a HandshakeContext) -> Self {
        Self {
            is_server: hs.is_server(),
            ocsp_stapling: hs.config.ocsp_stapling,
            signed_cert_timestamps: hs.config.signed_cert_timestamps,
            extension_policy: &hs.config.certificate_extensions,
            sct_validator: hs.config.sct_validator.as_ref(),
        }
    }
}

/// Leaf data to attach when encoding our chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateEncodeOptions<'a> {
    pub ocsp_response: Option<&'a [u8]>,
    pub sct_list: Option<&'a [u8]>,
}

/// A decoded Certificate message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCertificate {
    /// DER certificates, leaf first.
    pub chain: Vec<Vec<u8>>,
    pub leaf_public_key: Option<PeerPublicKey>,
    pub ocsp_response: Option<Vec<u8>>,
    pub sct_list: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Decode Certificate
// ---------------------------------------------------------------------------

/// Decode a Certificate body.
///
/// Extensions are checked on every entry but only the leaf's OCSP response
/// and SCT list are returned.
pub fn decode_certificate(
    data: &[u8],
    opts: &CertificateDecodeOptions<'_>,
) -> Result<DecodedCertificate, TlsError> {
    let err = |msg: &str| TlsError::DecodeError(format!("Certificate: {msg}"));

    let mut r = Reader::new(data);
    let context = r.get_u8_prefixed().ok_or_else(|| err("truncated context"))?;
    if !context.is_empty() {
        return Err(err("non-empty request context"));
    }
    let list = r.get_u24_prefixed().ok_or_else(|| err("truncated list"))?;
    if !r.is_empty() {
        return Err(err("trailing data"));
    }

    let mut out = DecodedCertificate::default();
    let mut list = Reader::new(list);
    while !list.is_empty() {
        let cert = list.get_u24_prefixed().ok_or(TlsError::CertLengthMismatch)?;
        let ext_block = list.get_u16_prefixed().ok_or(TlsError::CertLengthMismatch)?;
        if cert.is_empty() {
            return Err(TlsError::CertLengthMismatch);
        }

        let is_leaf = out.chain.is_empty();
        if is_leaf {
            let key = PeerPublicKey::from_certificate(cert)
                .map_err(|e| err(&format!("leaf public key: {e}")))?;
            if !has_digital_signature_key_usage(cert)? {
                return Err(TlsError::IllegalParameter(
                    "leaf certificate lacks digitalSignature key usage".into(),
                ));
            }
            out.leaf_public_key = Some(key);
        }
        out.chain.push(cert.to_vec());

        // Checked in a fixed order regardless of wire order. Other types the
        // policy permits are well-formed and not stored.
        let exts = parse_extensions(ext_block, opts.extension_policy)?;
        let find = |ty: ExtensionType| exts.iter().find(|e| e.extension_type == ty);

        if let Some(ext) = find(ExtensionType::STATUS_REQUEST) {
            if opts.is_server || !opts.ocsp_stapling {
                return Err(TlsError::UnexpectedExtension(ext.extension_type.0));
            }
            let response =
                decode_status_request(&ext.data).ok_or_else(|| err("malformed status_request"))?;
            if is_leaf {
                out.ocsp_response = Some(response.to_vec());
            }
        }
        if let Some(ext) = find(ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP) {
            if opts.is_server || !opts.signed_cert_timestamps {
                return Err(TlsError::UnexpectedExtension(ext.extension_type.0));
            }
            if !opts.sct_validator.is_valid(&ext.data) {
                return Err(TlsError::ExtensionParse(
                    "invalid SignedCertificateTimestampList".into(),
                ));
            }
            if is_leaf {
                out.sct_list = Some(ext.data.clone());
            }
        }
    }
    Ok(out)
}

/// CertificateStatus: status_type(1) || OCSPResponse<1..2^24-1>.
fn decode_status_request(data: &[u8]) -> Option<&[u8]> {
    let mut r = Reader::new(data);
    if r.get_u8()? != STATUS_TYPE_OCSP {
        return None;
    }
    let response = r.get_u24_prefixed()?;
    if response.is_empty() || !r.is_empty() {
        return None;
    }
    Some(response)
}

/// The alert a Certificate decoding failure is reported with.
pub fn certificate_alert(err: &TlsError) -> AlertDescription {
    match err {
        TlsError::UnexpectedExtension(_) => AlertDescription::UnsupportedExtension,
        TlsError::IllegalParameter(_) => AlertDescription::IllegalParameter,
        TlsError::PeerDidNotReturnCertificate => AlertDescription::CertificateRequired,
        TlsError::InternalError(_) => AlertDescription::InternalError,
        _ => AlertDescription::DecodeError,
    }
}

/// Process the pending Certificate message into the session.
///
/// With `allow_anonymous`, an empty chain is accepted and the verify result
/// is set to `Ok` since there is nothing to verify.
pub fn process_certificate(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    allow_anonymous: bool,
) -> Result<(), TlsError> {
    let decoded = {
        let opts = CertificateDecodeOptions::from_context(hs);
        decode_certificate(hs.message_body(), &opts)
    };
    let decoded = decoded.map_err(|e| env.fatal(certificate_alert(&e), e))?;

    let retain_sha256 = hs.is_server() && hs.config.retain_only_sha256_of_peer_certs;
    let session = &mut hs.session;
    if retain_sha256 {
        session.peer_sha256 = decoded.chain.first().map(|leaf| Sha256::digest(leaf).into());
    }
    session.peer_public_key = decoded.leaf_public_key;
    if decoded.ocsp_response.is_some() {
        session.ocsp_response = decoded.ocsp_response;
    }
    if decoded.sct_list.is_some() {
        session.signed_cert_timestamp_list = decoded.sct_list;
    }
    session.peer_certs = if decoded.chain.is_empty() {
        None
    } else {
        Some(decoded.chain)
    };

    if let Some(cache) = hs.config.session_cache.clone() {
        cache
            .cache_objects(&mut hs.session)
            .map_err(|e| env.fatal(AlertDescription::DecodeError, e))?;
    }

    if hs.session.peer_certs.is_none() {
        if !allow_anonymous {
            let e = TlsError::PeerDidNotReturnCertificate;
            return Err(env.fatal(certificate_alert(&e), e));
        }
        hs.session.verify_result = VerifyResult::Ok;
    }
    log::debug!(
        "peer certificate chain: {} entries",
        hs.session.peer_chain_len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Encode Certificate
// ---------------------------------------------------------------------------

/// Encode our chain as a complete Certificate handshake message.
///
/// Only the leaf carries extensions: SCT list first, then the OCSP status.
pub fn encode_certificate(
    chain: &[Vec<u8>],
    opts: &CertificateEncodeOptions<'_>,
) -> Result<Vec<u8>, TlsError> {
    let mut list = Vec::new();
    if let Some((leaf, rest)) = chain.split_first() {
        put_u24_prefixed(&mut list, leaf)?;

        let mut exts = Vec::new();
        if let Some(sct) = opts.sct_list {
            exts.push(Extension::new(
                ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP,
                sct.to_vec(),
            ));
        }
        if let Some(ocsp) = opts.ocsp_response {
            let mut status = vec![STATUS_TYPE_OCSP];
            put_u24_prefixed(&mut status, ocsp)?;
            exts.push(Extension::new(ExtensionType::STATUS_REQUEST, status));
        }
        put_u16_prefixed(&mut list, &encode_extensions(&exts)?)?;

        for cert in rest {
            put_u24_prefixed(&mut list, cert)?;
            list.extend_from_slice(&[0, 0]);
        }
    }

    let mut body = Vec::with_capacity(4 + list.len());
    // certificate_request_context is always empty during the handshake.
    body.push(0);
    put_u24(&mut body, list.len())?;
    body.extend_from_slice(&list);
    wrap_handshake(HandshakeType::Certificate, &body)
}

/// Queue our Certificate message.
pub fn add_certificate(hs: &mut HandshakeContext, env: &mut HandshakeEnv<'_>) -> Result<(), TlsError> {
    let opts = CertificateEncodeOptions {
        ocsp_response: hs
            .config
            .ocsp_response
            .as_deref()
            .filter(|_| hs.ocsp_stapling_requested),
        sct_list: hs
            .config
            .signed_cert_timestamp_list
            .as_deref()
            .filter(|_| hs.scts_requested),
    };
    let msg = encode_certificate(&hs.config.certificate_chain, &opts)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;
    hs.hash_outgoing(&msg);
    env.transport
        .add_message(msg)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))
}
