//! Finished message handling (RFC 8446 §4.4.4).

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::codec::encode_finished;
use super::context::HandshakeContext;
use super::HandshakeEnv;
use crate::alert::AlertDescription;
use ferrotls_types::TlsError;

/// Compare received verify_data with the expected value in constant time.
/// A length mismatch fails without comparing.
pub fn verify_finished(expected: &[u8], received: &[u8]) -> bool {
    expected.len() == received.len() && bool::from(expected.ct_eq(received))
}

/// Process the peer's pending Finished message.
///
/// With `use_saved_value` the server checks against the client Finished it
/// computed before sending its own flight.
pub fn process_finished(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    use_saved_value: bool,
) -> Result<(), TlsError> {
    let expected = if use_saved_value {
        match (hs.is_server(), hs.expected_client_finished.take()) {
            (true, Some(saved)) => saved,
            _ => {
                return Err(env.fatal(
                    AlertDescription::InternalError,
                    TlsError::InternalError("no saved client Finished".into()),
                ))
            }
        }
    } else {
        let transcript_hash = hs.transcript.current_hash();
        let peer_is_server = !hs.is_server();
        match env.key_schedule.finished_mac(peer_is_server, &transcript_hash) {
            Ok(mac) => Zeroizing::new(mac),
            Err(e) => return Err(env.fatal(AlertDescription::InternalError, e)),
        }
    };

    let finished_ok = verify_finished(&expected, hs.message_body());
    if !finished_ok && !hs.config.insecure_fuzzer_mode() {
        return Err(env.fatal(AlertDescription::DecryptError, TlsError::DigestCheckFailed));
    }
    Ok(())
}

/// Queue our Finished message.
pub fn add_finished(hs: &mut HandshakeContext, env: &mut HandshakeEnv<'_>) -> Result<(), TlsError> {
    let transcript_hash = hs.transcript.current_hash();
    let verify_data = match env.key_schedule.finished_mac(hs.is_server(), &transcript_hash) {
        Ok(mac) => Zeroizing::new(mac),
        Err(_) => {
            return Err(env.fatal(
                AlertDescription::InternalError,
                TlsError::DigestCheckFailed,
            ))
        }
    };
    let msg = encode_finished(&verify_data)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;
    hs.hash_outgoing(&msg);
    env.transport
        .add_message(msg)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))
}

/// Server: compute the client's Finished over the current transcript and
/// keep it for `process_finished(.., true)`.
pub fn save_expected_client_finished(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
) -> Result<(), TlsError> {
    let transcript_hash = hs.transcript.current_hash();
    let mac = env
        .key_schedule
        .finished_mac(false, &transcript_hash)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;
    hs.expected_client_finished = Some(Zeroizing::new(mac));
    Ok(())
}
