//! ECDSA key management for signers
//!
//! Provides key pair generation, signing, and verification using the
//! secp256k1 elliptic curve. Signer identities are either the compressed
//! public key (hex) or the Base58Check address derived from it, so a
//! signature can always be bound back to a registered identity.

use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::hash::sha256;

/// Compact secp256k1 signatures are always 64 bytes
pub const COMPACT_SIGNATURE_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature encoding")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A signer key pair (private key plus derived public key)
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Get the Base58Check address for this key pair
    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key)
    }

    /// Sign a message (hashed to 32 bytes if not already)
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message)
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message, signature)
    }
}

/// Convert a public key to an address: Base58Check(RIPEMD160(SHA256(pubkey)))
pub fn public_key_to_address(public_key: &PublicKey) -> String {
    let sha256_hash = sha256(&public_key.serialize());

    let mut ripemd = Ripemd160::new();
    ripemd.update(&sha256_hash);
    let ripemd_hash = ripemd.finalize();

    // Version byte 0x00, then 4-byte double-SHA256 checksum
    let mut address_bytes = vec![0x00];
    address_bytes.extend_from_slice(&ripemd_hash);

    let checksum = {
        let first = Sha256::digest(&address_bytes);
        let second = Sha256::digest(first);
        second[..4].to_vec()
    };
    address_bytes.extend_from_slice(&checksum);

    bs58::encode(address_bytes).into_string()
}

/// Parse a public key from a hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

fn digest32(message: &[u8]) -> Vec<u8> {
    if message.len() == 32 {
        message.to_vec()
    } else {
        sha256(message)
    }
}

/// Sign a message with a secret key, returning a compact 64-byte signature
pub fn sign_message(secret_key: &SecretKey, message: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(&digest32(message))?;
    let signature = secp.sign_ecdsa(&msg, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(&digest32(message))?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&msg, &sig, public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert!(!kp.public_key_hex().is_empty());
        assert!(!kp.address().is_empty());
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let message = b"approve payout #42";

        let signature = kp.sign(message).unwrap();
        assert_eq!(signature.len(), COMPACT_SIGNATURE_LEN);
        assert!(kp.verify(message, &signature).unwrap());
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let message = b"approve payout #42";

        let signature = kp.sign(message).unwrap();
        assert!(!other.verify(message, &signature).unwrap());
    }

    #[test]
    fn test_tampered_message_fails_verification() {
        let kp = KeyPair::generate();
        let signature = kp.sign(b"amount=50").unwrap();
        assert!(!kp.verify(b"amount=5000", &signature).unwrap());
    }

    #[test]
    fn test_key_pair_from_hex_roundtrip() {
        let kp1 = KeyPair::generate();
        let kp2 =
            KeyPair::from_private_key_hex(&hex::encode(kp1.secret_key.secret_bytes())).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_address_is_deterministic() {
        let kp = KeyPair::generate();
        assert_eq!(kp.address(), public_key_to_address(&kp.public_key));
        // Mainnet-style version byte produces addresses starting with 1
        assert!(kp.address().starts_with('1'));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let kp = KeyPair::generate();
        let result = kp.verify(b"message", &[0u8; 10]);
        assert!(matches!(result, Err(KeyError::InvalidSignature)));
    }
}
