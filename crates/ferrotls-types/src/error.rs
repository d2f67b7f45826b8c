/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key")]
    InvalidKey,
    #[error("malformed signature")]
    InvalidSignature,
    #[error("unsupported signature scheme: 0x{0:04x}")]
    UnsupportedScheme(u16),
    #[error("signing operation failed")]
    SignFailed,
    #[error("invalid mac key length")]
    InvalidMacKey,
}

/// Coarse failure taxonomy reported to the owner of a failed connection.
///
/// Every class is fatal; none is retried by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed lengths, trailing bytes, wrong sizes.
    Decode,
    /// Disallowed or unknown extension, missing peer certificate, too many
    /// key updates, unexpected message.
    PolicyViolation,
    /// Signature or MAC verification failure.
    CryptoFailure,
    /// Allocation, transport or collaborator failure.
    ResourceFailure,
}

/// TLS handshake errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("certificate length mismatch")]
    CertLengthMismatch,
    #[error("unexpected extension: {0}")]
    UnexpectedExtension(u16),
    #[error("error parsing extension: {0}")]
    ExtensionParse(String),
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),
    #[error("peer did not return a certificate")]
    PeerDidNotReturnCertificate,
    #[error("too many key updates")]
    TooManyKeyUpdates,
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
    #[error("bad signature")]
    BadSignature,
    #[error("digest check failed")]
    DigestCheckFailed,
    #[error("signature algorithm rejected: 0x{0:04x}")]
    SignatureAlgorithmRejected(u16),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("no signature algorithm in common with the peer")]
    NoCommonSignatureAlgorithm,
    #[error("handshake failure")]
    HandshakeFailure,
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

impl TlsError {
    /// Map this error onto the coarse failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            TlsError::DecodeError(_)
            | TlsError::CertLengthMismatch
            | TlsError::ExtensionParse(_) => ErrorClass::Decode,
            TlsError::UnexpectedExtension(_)
            | TlsError::IllegalParameter(_)
            | TlsError::PeerDidNotReturnCertificate
            | TlsError::TooManyKeyUpdates
            | TlsError::UnexpectedMessage(_)
            | TlsError::SignatureAlgorithmRejected(_)
            | TlsError::NoCommonSignatureAlgorithm => ErrorClass::PolicyViolation,
            TlsError::BadSignature | TlsError::DigestCheckFailed | TlsError::CryptoError(_) => {
                ErrorClass::CryptoFailure
            }
            TlsError::InternalError(_) | TlsError::HandshakeFailure | TlsError::IoError(_) => {
                ErrorClass::ResourceFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TlsError::UnexpectedExtension(0x1234).to_string(),
            "unexpected extension: 4660"
        );
        assert_eq!(
            TlsError::SignatureAlgorithmRejected(0x0807).to_string(),
            "signature algorithm rejected: 0x0807"
        );
        assert_eq!(
            CryptoError::UnsupportedScheme(0x0804).to_string(),
            "unsupported signature scheme: 0x0804"
        );
    }

    #[test]
    fn test_error_class_taxonomy() {
        assert_eq!(TlsError::CertLengthMismatch.class(), ErrorClass::Decode);
        assert_eq!(
            TlsError::DecodeError("x".into()).class(),
            ErrorClass::Decode
        );
        assert_eq!(
            TlsError::TooManyKeyUpdates.class(),
            ErrorClass::PolicyViolation
        );
        assert_eq!(
            TlsError::PeerDidNotReturnCertificate.class(),
            ErrorClass::PolicyViolation
        );
        assert_eq!(
            TlsError::NoCommonSignatureAlgorithm.class(),
            ErrorClass::PolicyViolation
        );
        assert_eq!(TlsError::BadSignature.class(), ErrorClass::CryptoFailure);
        assert_eq!(
            TlsError::DigestCheckFailed.class(),
            ErrorClass::CryptoFailure
        );
        assert_eq!(
            TlsError::InternalError("oom".into()).class(),
            ErrorClass::ResourceFailure
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: TlsError = io.into();
        assert_eq!(err.class(), ErrorClass::ResourceFailure);
        assert!(err.to_string().contains("gone"));
    }
}
