//! Redemption claims
//!
//! A claim asserts "redeemer R is entitled to amount A from capsule C",
//! backed by an authorized signer's signature over the claim's canonical
//! message. Claims are immutable once issued; verification is a pure
//! function of the claim, the registry, and the nonce ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::crypto::message::canonical_digest;
use crate::crypto::{KeyError, KeyPair};
use crate::redemption::nonce::generate_nonce;

/// Errors raised while verifying a redemption claim
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Malformed claim: {0}")]
    MalformedClaim(String),
    #[error("Claim expired")]
    Expired,
    #[error("Replay detected: nonce already consumed")]
    ReplayDetected,
    #[error("Unauthorized signer: {0}")]
    Unauthorized(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Quorum not met: have {have} of {need} signers")]
    QuorumNotMet { have: usize, need: usize },
    #[error("Claims disagree on {0}")]
    ClaimMismatch(String),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Optional advisory metadata attached to a claim
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClaimMetadata {
    /// Quality/grief score of the redeemed item, 0-100
    pub grief_score: Option<u8>,
    /// Whether a validator pre-approved the claim
    pub validator_approved: bool,
    /// Requests the emergency-redeem path
    pub emergency: bool,
    /// Batch this claim was issued in
    pub batch_id: Option<String>,
}

/// A signed redemption entitlement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedemptionClaim {
    pub capsule_id: String,
    pub redeemer: String,
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
    /// Single-use token preventing replay
    pub nonce: String,
    /// Compact signature over the canonical message (hex)
    pub signature: String,
    /// Public key of the issuing signer (hex)
    pub signer_pubkey: String,
    pub metadata: ClaimMetadata,
}

impl RedemptionClaim {
    /// Issue a freshly signed claim with a random nonce
    pub fn create_signed(
        capsule_id: &str,
        redeemer: &str,
        amount: u64,
        key: &KeyPair,
    ) -> Result<Self, ClaimError> {
        let mut claim = Self {
            capsule_id: capsule_id.to_string(),
            redeemer: redeemer.to_string(),
            amount,
            timestamp: Utc::now(),
            nonce: generate_nonce(),
            signature: String::new(),
            signer_pubkey: key.public_key_hex(),
            metadata: ClaimMetadata::default(),
        };
        claim.signature = hex::encode(key.sign(&claim.signing_message())?);
        Ok(claim)
    }

    /// Canonical signing message: capsule_id, redeemer, amount, nonce,
    /// timestamp (unix seconds), key-sorted. A wire contract; see
    /// `crypto::message`.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut fields = BTreeMap::new();
        fields.insert("amount", json!(self.amount));
        fields.insert("capsule_id", json!(self.capsule_id));
        fields.insert("nonce", json!(self.nonce));
        fields.insert("redeemer", json!(self.redeemer));
        fields.insert("timestamp", json!(self.timestamp.timestamp()));
        canonical_digest(&fields)
    }

    /// Structural checks that gate everything else
    pub fn validate_shape(&self) -> Result<(), ClaimError> {
        if self.capsule_id.is_empty() {
            return Err(ClaimError::MalformedClaim("empty capsule id".to_string()));
        }
        if self.redeemer.is_empty() {
            return Err(ClaimError::MalformedClaim("empty redeemer".to_string()));
        }
        if self.signature.is_empty() {
            return Err(ClaimError::MalformedClaim("empty signature".to_string()));
        }
        if self.signer_pubkey.is_empty() {
            return Err(ClaimError::MalformedClaim("empty signer".to_string()));
        }
        if self.nonce.len() < 8 {
            return Err(ClaimError::MalformedClaim("nonce too short".to_string()));
        }
        if self.amount == 0 {
            return Err(ClaimError::MalformedClaim("amount must be > 0".to_string()));
        }
        if self.timestamp.timestamp() <= 0 {
            return Err(ClaimError::MalformedClaim("invalid timestamp".to_string()));
        }
        Ok(())
    }
}
