//! Redemption claim verification
//!
//! Validates cryptographically signed claims of the form "redeemer R is
//! entitled to amount A from capsule C": replay protection through a
//! bounded nonce ledger, freshness windows, signer authorization, optional
//! multi-signature attestation, and an advisory security score.
//!
//! # Example
//!
//! ```ignore
//! use multisig_gate::redemption::{RedemptionClaim, RedemptionVerifier};
//!
//! let verifier = RedemptionVerifier::new(registry);
//! let claim = RedemptionClaim::create_signed("cap-1", "redeemer-1", 50, &signer_key)?;
//!
//! let report = verifier.verify(&claim, &[])?;
//! assert_eq!(report.score, 100);
//!
//! // The nonce is now spent; resubmission fails with ReplayDetected
//! assert!(verifier.verify(&claim, &[]).is_err());
//! ```

pub mod challenge;
pub mod claim;
pub mod nonce;
pub mod verifier;

pub use challenge::{RedemptionChallenge, CHALLENGE_TTL_MINUTES};
pub use claim::{ClaimError, ClaimMetadata, RedemptionClaim};
pub use nonce::{generate_nonce, NonceLedger, DEFAULT_LEDGER_CAPACITY};
pub use verifier::{
    RedemptionVerifier, VerificationReport, VerificationStats, VerifierConfig, Warning,
};
