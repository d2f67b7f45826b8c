#![no_main]
use libfuzzer_sys::fuzz_target;

use ferrotls_handshake::config::StructuralSctValidator;
use ferrotls_handshake::extensions::CertificateExtensionPolicy;
use ferrotls_handshake::handshake::certificate::{decode_certificate, CertificateDecodeOptions};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte selects the local policy.
    let flags = data[0];
    let policy = CertificateExtensionPolicy::default();
    let opts = CertificateDecodeOptions {
        is_server: flags & 1 != 0,
        ocsp_stapling: flags & 2 != 0,
        signed_cert_timestamps: flags & 4 != 0,
        extension_policy: &policy,
        sct_validator: &StructuralSctValidator,
    };
    let _ = decode_certificate(&data[1..], &opts);
});
