//! Producing our CertificateVerify.

use super::codec::{encode_certificate_verify, CertificateVerifyMsg};
use super::context::HandshakeContext;
use super::verify::{build_signature_input, CertVerifyContext};
use super::HandshakeEnv;
use crate::alert::AlertDescription;
use crate::crypt::private_key::PrivateKeyResult;
use ferrotls_types::{CryptoError, TlsError};

/// Sign the transcript and queue a CertificateVerify.
///
/// `Retry` leaves `pending_private_key_op` set; calling again resumes the
/// operation through `PrivateKeyMethod::complete`. Every `Failure` has
/// already sent its alert and left its error in `hs.last_error`.
pub fn add_certificate_verify(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
) -> PrivateKeyResult {
    let local = env
        .private_key
        .as_ref()
        .map(|key| (key.supported_schemes(), key.max_signature_len()));
    let Some((local_schemes, max_out)) = local else {
        return fail(
            hs,
            env,
            AlertDescription::InternalError,
            TlsError::InternalError("no private key for CertificateVerify".into()),
        );
    };

    let Some(scheme) = hs
        .config
        .signature_policy
        .choose_signature_algorithm(&local_schemes, &hs.peer_signature_algorithms)
    else {
        return fail(
            hs,
            env,
            AlertDescription::HandshakeFailure,
            TlsError::NoCommonSignatureAlgorithm,
        );
    };

    let result = match env.private_key.as_deref_mut() {
        Some(key) if hs.pending_private_key_op => key.complete(max_out),
        Some(key) => {
            let context = CertVerifyContext::for_signer(hs.is_server());
            let input = build_signature_input(&hs.transcript.current_hash(), context);
            key.sign(scheme, &input, max_out)
        }
        None => PrivateKeyResult::Failure,
    };

    match result {
        PrivateKeyResult::Retry => {
            log::trace!("CertificateVerify signature pending");
            hs.pending_private_key_op = true;
            PrivateKeyResult::Retry
        }
        PrivateKeyResult::Failure => {
            hs.pending_private_key_op = false;
            fail(
                hs,
                env,
                AlertDescription::InternalError,
                TlsError::CryptoError(CryptoError::SignFailed),
            )
        }
        PrivateKeyResult::Success(signature) => {
            hs.pending_private_key_op = false;
            if signature.len() > max_out {
                return fail(
                    hs,
                    env,
                    AlertDescription::InternalError,
                    TlsError::InternalError("signature exceeds key bound".into()),
                );
            }
            let encoded = encode_certificate_verify(&CertificateVerifyMsg {
                algorithm: scheme,
                signature: signature.clone(),
            });
            let msg = match encoded {
                Ok(msg) => msg,
                Err(e) => return fail(hs, env, AlertDescription::InternalError, e),
            };
            hs.hash_outgoing(&msg);
            if let Err(e) = env.transport.add_message(msg) {
                return fail(hs, env, AlertDescription::InternalError, e);
            }
            PrivateKeyResult::Success(signature)
        }
    }
}

fn fail(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    alert: AlertDescription,
    err: TlsError,
) -> PrivateKeyResult {
    hs.last_error = Some(env.fatal(alert, err));
    PrivateKeyResult::Failure
}
