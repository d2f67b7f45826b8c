#![no_main]
use libfuzzer_sys::fuzz_target;

use ferrotls_handshake::config::HandshakeConfig;
use ferrotls_handshake::crypt::key_schedule::DerivedFinishedKeys;
use ferrotls_handshake::handshake::codec::{
    decode_certificate_verify, decode_key_update, parse_handshake_header,
};
use ferrotls_handshake::handshake::context::HandshakeContext;
use ferrotls_handshake::handshake::key_update::post_handshake;
use ferrotls_handshake::handshake::{HandshakeEnv, HandshakeMessage};
use ferrotls_handshake::record::memory::MemoryTransport;
use ferrotls_handshake::session::TicketStore;
use ferrotls_types::HashAlgId;

fuzz_target!(|data: &[u8]| {
    let mut hs = HandshakeContext::new(
        HandshakeConfig::builder().insecure_fuzzer_mode(true).build(),
    );
    let (mut local, _peer) = MemoryTransport::pair();
    let mut ks = DerivedFinishedKeys::new(HashAlgId::Sha256, &[1; 32], &[2; 32]);
    let mut tickets = TicketStore::default();
    let mut env = HandshakeEnv::new(&mut local, &mut ks).with_tickets(&mut tickets);

    let mut rest = data;
    while let Ok(Some((msg_type, body, total))) = parse_handshake_header(rest) {
        let _ = decode_certificate_verify(body);
        let _ = decode_key_update(body);
        hs.message = Some(HandshakeMessage {
            msg_type,
            body: body.to_vec(),
            raw: rest[..total].to_vec(),
        });
        if post_handshake(&mut hs, &mut env).is_err() {
            break;
        }
        rest = &rest[total..];
    }
});
