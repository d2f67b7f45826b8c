//! Handshake configuration with builder pattern.

use std::fmt;
use std::sync::Arc;

use crate::alert::AlertDescription;
use crate::crypt::SignatureScheme;
use crate::extensions::CertificateExtensionPolicy;
use crate::session::SessionObjectCache;
use crate::TlsRole;
use ferrotls_types::HashAlgId;

// ---------------------------------------------------------------------------
// Signature algorithm policy
// ---------------------------------------------------------------------------

/// Decides which signature algorithms are acceptable from the peer and which
/// one we sign with.
pub trait SignaturePolicy: Send + Sync {
    /// Check a peer CertificateVerify algorithm. `Err` carries the alert to
    /// send.
    fn check_peer_signature_algorithm(
        &self,
        scheme: SignatureScheme,
    ) -> Result<(), AlertDescription>;

    /// Pick a scheme from `local` (what our key can produce) that the peer
    /// accepts. An empty `peer` list places no restriction.
    fn choose_signature_algorithm(
        &self,
        local: &[SignatureScheme],
        peer: &[SignatureScheme],
    ) -> Option<SignatureScheme>;
}

/// Accepts the schemes in a configured preference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSignaturePolicy {
    pub schemes: Vec<SignatureScheme>,
}

impl ListSignaturePolicy {
    pub fn new(schemes: &[SignatureScheme]) -> Self {
        Self {
            schemes: schemes.to_vec(),
        }
    }
}

impl SignaturePolicy for ListSignaturePolicy {
    fn check_peer_signature_algorithm(
        &self,
        scheme: SignatureScheme,
    ) -> Result<(), AlertDescription> {
        if self.schemes.contains(&scheme) {
            Ok(())
        } else {
            Err(AlertDescription::IllegalParameter)
        }
    }

    fn choose_signature_algorithm(
        &self,
        local: &[SignatureScheme],
        peer: &[SignatureScheme],
    ) -> Option<SignatureScheme> {
        self.schemes
            .iter()
            .copied()
            .find(|s| local.contains(s) && (peer.is_empty() || peer.contains(s)))
    }
}

// ---------------------------------------------------------------------------
// SCT list validation
// ---------------------------------------------------------------------------

/// Validates a SignedCertificateTimestampList received on the leaf.
pub trait SctListValidator: Send + Sync {
    fn is_valid(&self, sct_list: &[u8]) -> bool;
}

/// Checks RFC 6962 framing only: a non-empty u16-prefixed list of non-empty
/// u16-prefixed entries with no trailing bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSctValidator;

impl SctListValidator for StructuralSctValidator {
    fn is_valid(&self, sct_list: &[u8]) -> bool {
        if sct_list.len() < 2 {
            return false;
        }
        let list_len = u16::from_be_bytes([sct_list[0], sct_list[1]]) as usize;
        let list = &sct_list[2..];
        if list.len() != list_len || list.is_empty() {
            return false;
        }
        let mut pos = 0;
        while pos < list.len() {
            if list.len() - pos < 2 {
                return false;
            }
            let len = u16::from_be_bytes([list[pos], list[pos + 1]]) as usize;
            pos += 2;
            if len == 0 || list.len() - pos < len {
                return false;
            }
            pos += len;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// HandshakeConfig
// ---------------------------------------------------------------------------

/// Handshake configuration.
#[derive(Clone)]
pub struct HandshakeConfig {
    /// The role (client or server).
    pub role: TlsRole,
    /// Local certificate chain (DER-encoded, leaf first). Empty means we
    /// send an empty Certificate message.
    pub certificate_chain: Vec<Vec<u8>>,
    /// OCSP response stapled to our leaf when the peer asks for it.
    pub ocsp_response: Option<Vec<u8>>,
    /// SCT list attached to our leaf when the peer asks for it.
    pub signed_cert_timestamp_list: Option<Vec<u8>>,
    /// Client: accept a stapled OCSP response on the server leaf.
    pub ocsp_stapling: bool,
    /// Client: accept an SCT list on the server leaf.
    pub signed_cert_timestamps: bool,
    /// Server: keep only the SHA-256 of the client leaf.
    pub retain_only_sha256_of_peer_certs: bool,
    /// Supported signature algorithms (in preference order).
    pub signature_algorithms: Vec<SignatureScheme>,
    pub signature_policy: Arc<dyn SignaturePolicy>,
    pub sct_validator: Arc<dyn SctListValidator>,
    /// Run after the peer chain is stored. `None` skips the step.
    pub session_cache: Option<Arc<dyn SessionObjectCache>>,
    /// Extension types permitted inside CertificateEntry blocks.
    pub certificate_extensions: CertificateExtensionPolicy,
    /// Transcript hash of the negotiated cipher suite.
    pub hash_algorithm: HashAlgId,
    /// Server: send a CertificateRequest-driven client auth flight.
    pub verify_client_cert: bool,
    /// Server: reject a client that answers with an empty Certificate.
    pub require_client_cert: bool,
    #[cfg(feature = "fuzzing")]
    insecure_fuzzer_mode: bool,
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("role", &self.role)
            .field("certificate_chain_len", &self.certificate_chain.len())
            .field(
                "ocsp_response",
                &self
                    .ocsp_response
                    .as_ref()
                    .map(|r| format!("[{} bytes]", r.len())),
            )
            .field("ocsp_stapling", &self.ocsp_stapling)
            .field("signed_cert_timestamps", &self.signed_cert_timestamps)
            .field("signature_algorithms", &self.signature_algorithms)
            .field(
                "session_cache",
                &self.session_cache.as_ref().map(|_| "<callback>"),
            )
            .field("certificate_extensions", &self.certificate_extensions)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("verify_client_cert", &self.verify_client_cert)
            .field("require_client_cert", &self.require_client_cert)
            .finish_non_exhaustive()
    }
}

impl HandshakeConfig {
    /// Create a builder for handshake configuration.
    pub fn builder() -> HandshakeConfigBuilder {
        HandshakeConfigBuilder::default()
    }

    /// Skip signature and Finished checks. Always `false` unless built with
    /// the `fuzzing` feature.
    pub fn insecure_fuzzer_mode(&self) -> bool {
        #[cfg(feature = "fuzzing")]
        {
            self.insecure_fuzzer_mode
        }
        #[cfg(not(feature = "fuzzing"))]
        {
            false
        }
    }
}

/// Builder for `HandshakeConfig`.
pub struct HandshakeConfigBuilder {
    role: TlsRole,
    certificate_chain: Vec<Vec<u8>>,
    ocsp_response: Option<Vec<u8>>,
    signed_cert_timestamp_list: Option<Vec<u8>>,
    ocsp_stapling: bool,
    signed_cert_timestamps: bool,
    retain_only_sha256_of_peer_certs: bool,
    signature_algorithms: Vec<SignatureScheme>,
    signature_policy: Option<Arc<dyn SignaturePolicy>>,
    sct_validator: Arc<dyn SctListValidator>,
    session_cache: Option<Arc<dyn SessionObjectCache>>,
    certificate_extensions: CertificateExtensionPolicy,
    hash_algorithm: HashAlgId,
    verify_client_cert: bool,
    require_client_cert: bool,
    #[cfg(feature = "fuzzing")]
    insecure_fuzzer_mode: bool,
}

impl Default for HandshakeConfigBuilder {
    fn default() -> Self {
        Self {
            role: TlsRole::Client,
            certificate_chain: Vec::new(),
            ocsp_response: None,
            signed_cert_timestamp_list: None,
            ocsp_stapling: false,
            signed_cert_timestamps: false,
            retain_only_sha256_of_peer_certs: false,
            signature_algorithms: SignatureScheme::VERIFIABLE.to_vec(),
            signature_policy: None,
            sct_validator: Arc::new(StructuralSctValidator),
            session_cache: None,
            certificate_extensions: CertificateExtensionPolicy::default(),
            hash_algorithm: HashAlgId::Sha256,
            verify_client_cert: false,
            require_client_cert: false,
            #[cfg(feature = "fuzzing")]
            insecure_fuzzer_mode: false,
        }
    }
}

impl fmt::Debug for HandshakeConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeConfigBuilder")
            .field("role", &self.role)
            .field("signature_algorithms", &self.signature_algorithms)
            .finish_non_exhaustive()
    }
}

impl HandshakeConfigBuilder {
    pub fn role(mut self, role: TlsRole) -> Self {
        self.role = role;
        self
    }

    pub fn certificate_chain(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.certificate_chain = certs;
        self
    }

    pub fn ocsp_response(mut self, response: Vec<u8>) -> Self {
        self.ocsp_response = Some(response);
        self
    }

    pub fn signed_cert_timestamp_list(mut self, list: Vec<u8>) -> Self {
        self.signed_cert_timestamp_list = Some(list);
        self
    }

    pub fn ocsp_stapling(mut self, enabled: bool) -> Self {
        self.ocsp_stapling = enabled;
        self
    }

    pub fn signed_cert_timestamps(mut self, enabled: bool) -> Self {
        self.signed_cert_timestamps = enabled;
        self
    }

    pub fn retain_only_sha256_of_peer_certs(mut self, enabled: bool) -> Self {
        self.retain_only_sha256_of_peer_certs = enabled;
        self
    }

    pub fn signature_algorithms(mut self, schemes: &[SignatureScheme]) -> Self {
        self.signature_algorithms = schemes.to_vec();
        self
    }

    /// Replace the default list-based policy.
    pub fn signature_policy(mut self, policy: Arc<dyn SignaturePolicy>) -> Self {
        self.signature_policy = Some(policy);
        self
    }

    pub fn sct_validator(mut self, validator: Arc<dyn SctListValidator>) -> Self {
        self.sct_validator = validator;
        self
    }

    pub fn session_cache(mut self, cache: Arc<dyn SessionObjectCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    pub fn certificate_extensions(mut self, policy: CertificateExtensionPolicy) -> Self {
        self.certificate_extensions = policy;
        self
    }

    pub fn hash_algorithm(mut self, alg: HashAlgId) -> Self {
        self.hash_algorithm = alg;
        self
    }

    pub fn verify_client_cert(mut self, enabled: bool) -> Self {
        self.verify_client_cert = enabled;
        self
    }

    pub fn require_client_cert(mut self, required: bool) -> Self {
        self.require_client_cert = required;
        self
    }

    #[cfg(feature = "fuzzing")]
    pub fn insecure_fuzzer_mode(mut self, enabled: bool) -> Self {
        self.insecure_fuzzer_mode = enabled;
        self
    }

    pub fn build(self) -> HandshakeConfig {
        let signature_policy = match self.signature_policy {
            Some(policy) => policy,
            None => Arc::new(ListSignaturePolicy::new(&self.signature_algorithms)),
        };
        HandshakeConfig {
            role: self.role,
            certificate_chain: self.certificate_chain,
            ocsp_response: self.ocsp_response,
            signed_cert_timestamp_list: self.signed_cert_timestamp_list,
            ocsp_stapling: self.ocsp_stapling,
            signed_cert_timestamps: self.signed_cert_timestamps,
            retain_only_sha256_of_peer_certs: self.retain_only_sha256_of_peer_certs,
            signature_algorithms: self.signature_algorithms,
            signature_policy,
            sct_validator: self.sct_validator,
            session_cache: self.session_cache,
            certificate_extensions: self.certificate_extensions,
            hash_algorithm: self.hash_algorithm,
            verify_client_cert: self.verify_client_cert,
            require_client_cert: self.require_client_cert,
            #[cfg(feature = "fuzzing")]
            insecure_fuzzer_mode: self.insecure_fuzzer_mode,
        }
    }
}
