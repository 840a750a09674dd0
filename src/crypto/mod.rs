//! Cryptographic primitives for the approval gate
//!
//! This module provides:
//! - SHA-256 hashing
//! - ECDSA key management (secp256k1) with address derivation
//! - Canonical signing-message construction

pub mod hash;
pub mod keys;
pub mod message;

pub use hash::sha256;
pub use keys::{
    public_key_from_hex, public_key_to_address, sign_message, verify_signature, KeyError, KeyPair,
    COMPACT_SIGNATURE_LEN,
};
pub use message::{canonical_digest, canonical_message, MESSAGE_FORMAT_VERSION};
