//! Challenge/response proof of possession
//!
//! A lightweight step usable before issuing a full redemption claim: the
//! verifier hands out a short-lived challenge, the prospective signer
//! signs its canonical message, and the response is checked against the
//! registry. Challenge nonces go through the shared ledger so a captured
//! response cannot be replayed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::crypto::message::canonical_digest;
use crate::redemption::claim::ClaimError;
use crate::redemption::nonce::generate_nonce;
use crate::redemption::verifier::RedemptionVerifier;
use crate::validator::ValidationError;

/// Challenge lifetime, deliberately shorter than the claim freshness window
pub const CHALLENGE_TTL_MINUTES: i64 = 5;

/// A short-lived proof-of-possession challenge
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedemptionChallenge {
    pub capsule_id: String,
    pub redeemer: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RedemptionChallenge {
    /// Canonical message the responder must sign
    pub fn signing_message(&self) -> Vec<u8> {
        let mut fields = BTreeMap::new();
        fields.insert("capsule_id", json!(self.capsule_id));
        fields.insert("nonce", json!(self.nonce));
        fields.insert("redeemer", json!(self.redeemer));
        fields.insert("timestamp", json!(self.issued_at.timestamp()));
        canonical_digest(&fields)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl RedemptionVerifier {
    /// Issue a fresh challenge for a capsule/redeemer pair
    pub fn create_challenge(&self, capsule_id: &str, redeemer: &str) -> RedemptionChallenge {
        let now = Utc::now();
        RedemptionChallenge {
            capsule_id: capsule_id.to_string(),
            redeemer: redeemer.to_string(),
            nonce: generate_nonce(),
            issued_at: now,
            expires_at: now + Duration::minutes(CHALLENGE_TTL_MINUTES),
        }
    }

    /// Check a signed challenge response from the expected signer.
    ///
    /// On success the challenge nonce is consumed, so each challenge
    /// verifies at most once.
    pub fn verify_challenge_response(
        &self,
        challenge: &RedemptionChallenge,
        response: &[u8],
        expected_signer: &str,
    ) -> Result<(), ClaimError> {
        if challenge.is_expired(Utc::now()) {
            return Err(ClaimError::Expired);
        }

        if !self.registry.is_authorized_signer(expected_signer) {
            return Err(ClaimError::Unauthorized(expected_signer.to_string()));
        }

        self.validator
            .validate(&challenge.signing_message(), expected_signer, response)
            .map_err(|e| match e {
                ValidationError::UnauthorizedSigner(id) => ClaimError::Unauthorized(id),
                _ => ClaimError::InvalidSignature,
            })?;

        if !self.lock_ledger().consume(&challenge.nonce) {
            return Err(ClaimError::ReplayDetected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::registry::{RegistryConfig, SignerRegistry};
    use std::sync::Arc;

    fn setup() -> (RedemptionVerifier, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        let pubkeys = keys.iter().map(|k| k.public_key_hex()).collect();
        let registry = Arc::new(SignerRegistry::new(RegistryConfig::new(pubkeys, 1)).unwrap());
        (RedemptionVerifier::new(registry), keys)
    }

    #[test]
    fn test_challenge_roundtrip() {
        let (verifier, keys) = setup();
        let challenge = verifier.create_challenge("cap-1", "redeemer-1");
        assert!(!challenge.is_expired(Utc::now()));

        let response = keys[0].sign(&challenge.signing_message()).unwrap();
        verifier
            .verify_challenge_response(&challenge, &response, &keys[0].public_key_hex())
            .unwrap();
    }

    #[test]
    fn test_response_cannot_be_replayed() {
        let (verifier, keys) = setup();
        let challenge = verifier.create_challenge("cap-1", "redeemer-1");
        let response = keys[0].sign(&challenge.signing_message()).unwrap();
        let signer = keys[0].public_key_hex();

        verifier
            .verify_challenge_response(&challenge, &response, &signer)
            .unwrap();
        let replay = verifier.verify_challenge_response(&challenge, &response, &signer);
        assert!(matches!(replay, Err(ClaimError::ReplayDetected)));
    }

    #[test]
    fn test_expired_challenge_rejected() {
        let (verifier, keys) = setup();
        let mut challenge = verifier.create_challenge("cap-1", "redeemer-1");
        challenge.expires_at = Utc::now() - Duration::seconds(1);

        let response = keys[0].sign(&challenge.signing_message()).unwrap();
        let result =
            verifier.verify_challenge_response(&challenge, &response, &keys[0].public_key_hex());
        assert!(matches!(result, Err(ClaimError::Expired)));
    }

    #[test]
    fn test_wrong_responder_rejected() {
        let (verifier, keys) = setup();
        let challenge = verifier.create_challenge("cap-1", "redeemer-1");

        // keys[1] responds but the verifier expects keys[0]
        let response = keys[1].sign(&challenge.signing_message()).unwrap();
        let result =
            verifier.verify_challenge_response(&challenge, &response, &keys[0].public_key_hex());
        assert!(matches!(result, Err(ClaimError::InvalidSignature)));

        // Unregistered responder fails on authorization
        let outsider = KeyPair::generate();
        let response = outsider.sign(&challenge.signing_message()).unwrap();
        let result =
            verifier.verify_challenge_response(&challenge, &response, &outsider.public_key_hex());
        assert!(matches!(result, Err(ClaimError::Unauthorized(_))));
    }
}
