/// Hash algorithm identifiers usable for the handshake transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgId {
    /// Digest output size in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgId::Sha256 => 32,
            HashAlgId::Sha384 => 48,
            HashAlgId::Sha512 => 64,
        }
    }
}

/// Direction of a traffic key inside the record layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficDirection {
    /// Keys used to open (decrypt) incoming records.
    Read,
    /// Keys used to seal (encrypt) outgoing records.
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_output_len() {
        assert_eq!(HashAlgId::Sha256.output_len(), 32);
        assert_eq!(HashAlgId::Sha384.output_len(), 48);
        assert_eq!(HashAlgId::Sha512.output_len(), 64);
    }
}
