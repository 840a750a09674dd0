//! Signature validation against the signer registry
//!
//! Shared by the transaction gate and the redemption verifier. Checks run
//! in a fixed order: signer authorization, structural well-formedness,
//! then cryptographic verification against the signer's public key. The
//! signer identity must be the hex-encoded public key itself so the
//! signature is verified against real key material; the registry may hold
//! either the pubkey or its derived address.

use std::sync::Arc;

use thiserror::Error;

use crate::crypto::{public_key_from_hex, verify_signature, KeyError, COMPACT_SIGNATURE_LEN};
use crate::registry::SignerRegistry;

/// Reasons a signature fails validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Signer is not authorized: {0}")]
    UnauthorizedSigner(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Signature does not verify against the signer's key")]
    BadSignature,
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Validates signatures for one signer registry
#[derive(Clone)]
pub struct SignatureValidator {
    registry: Arc<SignerRegistry>,
}

impl SignatureValidator {
    pub fn new(registry: Arc<SignerRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `signature` by `signer_pubkey` over `message`
    pub fn validate(
        &self,
        message: &[u8],
        signer_pubkey: &str,
        signature: &[u8],
    ) -> Result<(), ValidationError> {
        // (a) authorization
        if !self.registry.is_authorized_signer(signer_pubkey) {
            return Err(ValidationError::UnauthorizedSigner(
                signer_pubkey.to_string(),
            ));
        }

        // (b) structure
        if signature.is_empty() {
            return Err(ValidationError::MalformedSignature("empty".to_string()));
        }
        if signature.len() != COMPACT_SIGNATURE_LEN {
            return Err(ValidationError::MalformedSignature(format!(
                "expected {} bytes, got {}",
                COMPACT_SIGNATURE_LEN,
                signature.len()
            )));
        }

        // (c) cryptographic verification against the presented key
        let pubkey = public_key_from_hex(signer_pubkey)
            .map_err(|_| ValidationError::MalformedSignature("bad public key".to_string()))?;

        if !verify_signature(&pubkey, message, signature)? {
            return Err(ValidationError::BadSignature);
        }

        Ok(())
    }

    /// Same check for hex-encoded signatures in transit
    pub fn validate_hex(
        &self,
        message: &[u8],
        signer_pubkey: &str,
        signature_hex: &str,
    ) -> Result<(), ValidationError> {
        let bytes = hex::decode(signature_hex)
            .map_err(|_| ValidationError::MalformedSignature("bad hex".to_string()))?;
        self.validate(message, signer_pubkey, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::registry::RegistryConfig;

    fn setup() -> (SignatureValidator, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let pubkeys = keys.iter().map(|k| k.public_key_hex()).collect();
        let registry = SignerRegistry::new(RegistryConfig::new(pubkeys, 2)).unwrap();
        (SignatureValidator::new(Arc::new(registry)), keys)
    }

    #[test]
    fn test_valid_signature_passes() {
        let (validator, keys) = setup();
        let message = b"gate message";
        let sig = keys[0].sign(message).unwrap();

        assert!(validator
            .validate(message, &keys[0].public_key_hex(), &sig)
            .is_ok());
    }

    #[test]
    fn test_unauthorized_signer_rejected_before_crypto() {
        let (validator, _) = setup();
        let outsider = KeyPair::generate();
        let message = b"gate message";
        let sig = outsider.sign(message).unwrap();

        let result = validator.validate(message, &outsider.public_key_hex(), &sig);
        assert!(matches!(
            result,
            Err(ValidationError::UnauthorizedSigner(_))
        ));
    }

    #[test]
    fn test_empty_and_truncated_signatures_rejected() {
        let (validator, keys) = setup();
        let pubkey = keys[0].public_key_hex();

        assert!(matches!(
            validator.validate(b"m", &pubkey, &[]),
            Err(ValidationError::MalformedSignature(_))
        ));
        assert!(matches!(
            validator.validate(b"m", &pubkey, &[1u8; 30]),
            Err(ValidationError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_signature_by_other_key_rejected() {
        let (validator, keys) = setup();
        let message = b"gate message";
        // keys[1] signs but claims to be keys[0]
        let sig = keys[1].sign(message).unwrap();

        let result = validator.validate(message, &keys[0].public_key_hex(), &sig);
        assert!(matches!(result, Err(ValidationError::BadSignature)));
    }

    #[test]
    fn test_hex_wrapper() {
        let (validator, keys) = setup();
        let message = b"gate message";
        let sig = hex::encode(keys[0].sign(message).unwrap());

        assert!(validator
            .validate_hex(message, &keys[0].public_key_hex(), &sig)
            .is_ok());
        assert!(validator
            .validate_hex(message, &keys[0].public_key_hex(), "zz-not-hex")
            .is_err());
    }
}
