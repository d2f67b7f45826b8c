//! TLS extensions carried inside CertificateEntry blocks.

use crate::handshake::codec::put_u16_prefixed;
use ferrotls_types::TlsError;

/// TLS extension type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    pub const STATUS_REQUEST: Self = Self(5);
    pub const SIGNED_CERTIFICATE_TIMESTAMP: Self = Self(18);
}

/// A raw TLS extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, data: Vec<u8>) -> Self {
        Self {
            extension_type,
            data,
        }
    }
}

/// Which extension types a CertificateEntry may carry.
///
/// Anything outside `recognized` is rejected with unsupported_extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExtensionPolicy {
    pub recognized: Vec<ExtensionType>,
}

impl Default for CertificateExtensionPolicy {
    fn default() -> Self {
        Self {
            recognized: vec![
                ExtensionType::STATUS_REQUEST,
                ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP,
            ],
        }
    }
}

impl CertificateExtensionPolicy {
    pub fn is_recognized(&self, ext: ExtensionType) -> bool {
        self.recognized.contains(&ext)
    }

    /// Add `ext` to the recognized set.
    pub fn allow(mut self, ext: ExtensionType) -> Self {
        if !self.recognized.contains(&ext) {
            self.recognized.push(ext);
        }
        self
    }
}

/// Parse the contents of an extension block (without its 2-byte prefix).
///
/// Fails with `UnexpectedExtension` on a type outside `policy`, and with
/// `DecodeError` on a duplicate type or truncated entry.
pub fn parse_extensions(
    data: &[u8],
    policy: &CertificateExtensionPolicy,
) -> Result<Vec<Extension>, TlsError> {
    let mut out: Vec<Extension> = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if data.len() - pos < 4 {
            return Err(TlsError::DecodeError("extension header truncated".into()));
        }
        let ext_type = ExtensionType(u16::from_be_bytes([data[pos], data[pos + 1]]));
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;
        if data.len() - pos < len {
            return Err(TlsError::DecodeError(format!(
                "extension {} body truncated",
                ext_type.0
            )));
        }
        if !policy.is_recognized(ext_type) {
            return Err(TlsError::UnexpectedExtension(ext_type.0));
        }
        if out.iter().any(|e| e.extension_type == ext_type) {
            return Err(TlsError::DecodeError(format!(
                "duplicate extension {}",
                ext_type.0
            )));
        }
        out.push(Extension::new(ext_type, data[pos..pos + len].to_vec()));
        pos += len;
    }
    Ok(out)
}

/// Encode extensions as a block body (without the 2-byte prefix).
pub fn encode_extensions(exts: &[Extension]) -> Result<Vec<u8>, TlsError> {
    let mut out = Vec::new();
    for ext in exts {
        out.extend_from_slice(&ext.extension_type.0.to_be_bytes());
        put_u16_prefixed(&mut out, &ext.data)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_extensions() {
        let exts = vec![
            Extension::new(ExtensionType::STATUS_REQUEST, vec![1, 0, 0, 2, 0xAA, 0xBB]),
            Extension::new(ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP, vec![]),
        ];
        let block = encode_extensions(&exts).unwrap();
        let parsed = parse_extensions(&block, &CertificateExtensionPolicy::default()).unwrap();
        assert_eq!(parsed, exts);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let block = encode_extensions(&[Extension::new(ExtensionType(0x1234), vec![0])]).unwrap();
        assert!(matches!(
            parse_extensions(&block, &CertificateExtensionPolicy::default()),
            Err(TlsError::UnexpectedExtension(0x1234))
        ));
    }

    #[test]
    fn test_policy_allows_additional_type() {
        let block = encode_extensions(&[Extension::new(ExtensionType(0x1234), vec![0])]).unwrap();
        let policy = CertificateExtensionPolicy::default().allow(ExtensionType(0x1234));
        assert_eq!(parse_extensions(&block, &policy).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let ext = Extension::new(ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP, vec![]);
        let block = encode_extensions(&[ext.clone(), ext]).unwrap();
        assert!(matches!(
            parse_extensions(&block, &CertificateExtensionPolicy::default()),
            Err(TlsError::DecodeError(_))
        ));
    }

    #[test]
    fn test_encode_oversize_extension() {
        let ext = Extension::new(ExtensionType::SIGNED_CERTIFICATE_TIMESTAMP, vec![0; 0x1_0000]);
        assert!(matches!(
            encode_extensions(&[ext]),
            Err(TlsError::InternalError(_))
        ));
    }

    #[test]
    fn test_truncated_extension() {
        assert!(parse_extensions(&[0x00, 0x05, 0x00], &CertificateExtensionPolicy::default())
            .is_err());
        assert!(parse_extensions(
            &[0x00, 0x05, 0x00, 0x03, 0x01],
            &CertificateExtensionPolicy::default()
        )
        .is_err());
        assert!(parse_extensions(&[], &CertificateExtensionPolicy::default())
            .unwrap()
            .is_empty());
    }
}
