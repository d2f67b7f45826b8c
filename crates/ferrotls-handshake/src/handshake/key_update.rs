//! Post-handshake messages: KeyUpdate (RFC 8446 §4.6.3) and NewSessionTicket
//! routing.

use super::codec::{decode_key_update, encode_key_update, KeyUpdateRequest};
use super::context::HandshakeContext;
use super::{HandshakeEnv, HandshakeType};
use crate::alert::AlertDescription;
use ferrotls_types::{TlsError, TrafficDirection};

/// Consecutive KeyUpdates processed before the connection is failed.
/// Bounds the work a peer can force without sending application data.
pub const MAX_KEY_UPDATES: u8 = 32;

/// Process the pending KeyUpdate: rotate the read key and, if the peer asked
/// for it, queue one acknowledgement and rotate the write key.
///
/// While an earlier acknowledgement is still unflushed, further requests are
/// not acknowledged again.
pub fn receive_key_update(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
) -> Result<(), TlsError> {
    let request = decode_key_update(hs.message_body())
        .map_err(|e| env.fatal(AlertDescription::DecodeError, e))?;

    env.key_schedule
        .rotate_traffic_key(TrafficDirection::Read)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;

    if request == KeyUpdateRequest::UpdateRequested && !hs.key_update_pending {
        queue_key_update(hs, env, KeyUpdateRequest::UpdateNotRequested)?;
    }
    Ok(())
}

/// Dispatch a message received after the handshake completed.
pub fn post_handshake(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
) -> Result<(), TlsError> {
    let Some(msg_type) = hs.message.as_ref().map(|m| m.msg_type) else {
        return Err(env.fatal(
            AlertDescription::InternalError,
            TlsError::InternalError("no post-handshake message".into()),
        ));
    };
    log::debug!("post-handshake {:?}", msg_type);

    if msg_type == HandshakeType::KeyUpdate {
        hs.key_update_count = hs.key_update_count.saturating_add(1);
        if hs.key_update_count > MAX_KEY_UPDATES {
            return Err(env.fatal(
                AlertDescription::UnexpectedMessage,
                TlsError::TooManyKeyUpdates,
            ));
        }
        return receive_key_update(hs, env);
    }

    hs.key_update_count = 0;

    if msg_type == HandshakeType::NewSessionTicket && !hs.is_server() {
        let result = match env.tickets.as_deref_mut() {
            Some(tickets) => tickets.process_new_session_ticket(hs.message_body(), &hs.session),
            None => {
                log::debug!("no ticket handler, NewSessionTicket dropped");
                Ok(())
            }
        };
        return result.map_err(|e| {
            let alert = match e {
                TlsError::DecodeError(_) => AlertDescription::DecodeError,
                _ => AlertDescription::InternalError,
            };
            env.fatal(alert, e)
        });
    }

    Err(env.fatal(
        AlertDescription::UnexpectedMessage,
        TlsError::UnexpectedMessage(format!("{:?} after handshake", msg_type)),
    ))
}

/// Start a locally initiated key update. No-op while an earlier update is
/// still unflushed.
pub fn send_key_update(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    request: KeyUpdateRequest,
) -> Result<(), TlsError> {
    if hs.key_update_pending {
        return Ok(());
    }
    queue_key_update(hs, env, request)
}

fn queue_key_update(
    hs: &mut HandshakeContext,
    env: &mut HandshakeEnv<'_>,
    request: KeyUpdateRequest,
) -> Result<(), TlsError> {
    env.transport
        .add_message(encode_key_update(request))
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;
    env.key_schedule
        .rotate_traffic_key(TrafficDirection::Write)
        .map_err(|e| env.fatal(AlertDescription::InternalError, e))?;
    hs.key_update_pending = true;
    Ok(())
}
