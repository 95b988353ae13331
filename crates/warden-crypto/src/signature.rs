//! Ed25519 signatures used to chain-link the audit log.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

use crate::error::{CryptoError, CryptoResult};

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignatureLength`] if the slice is not
    /// exactly 64 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != 64 {
            return Err(CryptoError::InvalidSignatureLength {
                expected: 64,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Encode as hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 64 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::try_from_slice(&bytes)
    }

    /// Verify this signature against a message and a raw public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification
    /// fails, including if `public_key` is not a valid point on the curve.
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> CryptoResult<()> {
        let verifying_key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        let sig = DalekSignature::from_bytes(&self.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl From<DalekSignature> for Signature {
    fn from(sig: DalekSignature) -> Self {
        Self(sig.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn sign_then_verify_succeeds() {
        let pair = KeyPair::generate();
        let sig = pair.sign(b"message");
        assert!(sig.verify(b"message", pair.public_key_bytes()).is_ok());
    }

    #[test]
    fn verify_fails_on_tampered_message() {
        let pair = KeyPair::generate();
        let sig = pair.sign(b"message");
        assert!(sig.verify(b"tampered", pair.public_key_bytes()).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let pair = KeyPair::generate();
        let sig = pair.sign(b"message");
        let decoded = Signature::from_hex(&sig.to_hex()).unwrap();
        assert!(decoded.verify(b"message", pair.public_key_bytes()).is_ok());
    }
}
