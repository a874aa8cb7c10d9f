//! Operator key material
//!
//! The operator private key is accepted in two encodings:
//! - DER (PKCS#8) hex, as exported by the network portal
//! - raw 32-byte hex, optionally prefixed with `0x`
//!
//! A `0x` prefix makes raw hex the preferred reading; otherwise DER is tried
//! first. Whichever reading fails is retried against the other encoding
//! before the key is rejected.
//!
//! Only Ed25519 keys are supported. Portal-exported `0x` keys are often
//! ECDSA (secp256k1); any 32 bytes form a valid Ed25519 seed, so such a key
//! parses here but derives a different public key, and the network rejects
//! the operator's signatures. Export an Ed25519 key for the operator.

use crate::{Error, Result};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fmt;
use tracing::warn;

/// PKCS#8 header for an Ed25519 private key (16 bytes, followed by the seed)
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Key encodings understood by [`OperatorKey::parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// PKCS#8 DER, hex encoded
    Der,
    /// Raw 32-byte seed, hex encoded
    Raw,
}

impl KeyEncoding {
    fn alternate(self) -> Self {
        match self {
            KeyEncoding::Der => KeyEncoding::Raw,
            KeyEncoding::Raw => KeyEncoding::Der,
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<[u8; 32]> {
        match self {
            KeyEncoding::Der => {
                if bytes.len() == 48 && bytes[..16] == ED25519_PKCS8_PREFIX {
                    bytes[16..].try_into().ok()
                } else {
                    None
                }
            }
            KeyEncoding::Raw => bytes.try_into().ok(),
        }
    }
}

/// Ed25519 operator key
#[derive(Clone)]
pub struct OperatorKey {
    signing_key: SigningKey,
    encoding: KeyEncoding,
}

impl OperatorKey {
    /// Parse key material, falling back to the alternate encoding
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("operator key is empty".to_string()));
        }

        let (hex_part, primary) = match trimmed.strip_prefix("0x") {
            Some(rest) => (rest, KeyEncoding::Raw),
            None => (trimmed, KeyEncoding::Der),
        };

        let bytes = hex::decode(hex_part)
            .map_err(|e| Error::Config(format!("operator key is not valid hex: {}", e)))?;

        if let Some(seed) = primary.decode(&bytes) {
            return Ok(Self::from_seed(&seed, primary));
        }

        let alternate = primary.alternate();
        warn!(
            "Operator key did not decode as {:?}, retrying as {:?}",
            primary, alternate
        );

        alternate
            .decode(&bytes)
            .map(|seed| Self::from_seed(&seed, alternate))
            .ok_or_else(|| {
                Error::Config(format!(
                    "operator key is neither DER nor raw Ed25519 ({} bytes)",
                    bytes.len()
                ))
            })
    }

    /// Create from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32], encoding: KeyEncoding) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
            encoding,
        }
    }

    /// Encoding the key was read from
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    /// Verifying half of the key pair
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a request body, hex encoded
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }

    /// DER hex form of the private key
    pub fn to_der_hex(&self) -> String {
        let mut der = ED25519_PKCS8_PREFIX.to_vec();
        der.extend_from_slice(&self.signing_key.to_bytes());
        hex::encode(der)
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorKey")
            .field("public_key", &hex::encode(self.public_key()))
            .field("encoding", &self.encoding)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    const SEED: [u8; 32] = [7u8; 32];

    #[test]
    fn test_parse_der() {
        let der = OperatorKey::from_seed(&SEED, KeyEncoding::Raw).to_der_hex();
        let key = OperatorKey::parse(&der).unwrap();
        assert_eq!(key.encoding(), KeyEncoding::Der);
        assert_eq!(key.signing_key.to_bytes(), SEED);
    }

    #[test]
    fn test_parse_raw_with_prefix() {
        let key = OperatorKey::parse(&format!("0x{}", hex::encode(SEED))).unwrap();
        assert_eq!(key.encoding(), KeyEncoding::Raw);
    }

    #[test]
    fn test_prefixed_key_is_read_as_ed25519_seed() {
        let key = OperatorKey::parse(&format!("0x{}", hex::encode(SEED))).unwrap();
        let expected = SigningKey::from_bytes(&SEED).verifying_key().to_bytes();
        assert_eq!(key.public_key(), expected);
    }

    #[test]
    fn test_raw_without_prefix_falls_back() {
        let key = OperatorKey::parse(&hex::encode(SEED)).unwrap();
        assert_eq!(key.encoding(), KeyEncoding::Raw);
        assert_eq!(key.signing_key.to_bytes(), SEED);
    }

    #[test]
    fn test_der_with_prefix_falls_back() {
        let der = OperatorKey::from_seed(&SEED, KeyEncoding::Raw).to_der_hex();
        let key = OperatorKey::parse(&format!("0x{}", der)).unwrap();
        assert_eq!(key.encoding(), KeyEncoding::Der);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(OperatorKey::parse("YOUR_PRIVATE_KEY"), Err(Error::Config(_))));
        assert!(matches!(OperatorKey::parse("abcd"), Err(Error::Config(_))));
        assert!(matches!(OperatorKey::parse("  "), Err(Error::Config(_))));
    }

    #[test]
    fn test_signature_verifies() {
        let key = OperatorKey::from_seed(&SEED, KeyEncoding::Raw);
        let sig_bytes: [u8; 64] = hex::decode(key.sign_hex(b"payload"))
            .unwrap()
            .try_into()
            .unwrap();
        let sig = Signature::from_bytes(&sig_bytes);
        assert!(key.verifying_key().verify(b"payload", &sig).is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = OperatorKey::from_seed(&SEED, KeyEncoding::Raw);
        let printed = format!("{:?}", key);
        assert!(!printed.contains(&hex::encode(SEED)));
    }
}
