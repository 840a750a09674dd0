//! Multisig Gate: quorum-based approval for critical operations
//!
//! This crate provides the authorization core behind irreversible
//! operations (payouts, vault transfers, emergency actions, governance
//! execution, contract upgrades):
//! - M-of-N signature collection with per-kind quorum thresholds
//! - Per-kind approval timeouts with lazy expiry
//! - Admin rejection and an audited emergency-override path
//! - Cryptographically verified redemption claims with replay protection
//! - Challenge/response proof of possession
//! - Real ECDSA signatures (secp256k1) bound to registered signer keys
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use multisig_gate::crypto::KeyPair;
//! use multisig_gate::gate::{
//!     DispatchError, ExecutionDispatcher, ExecutionReceipt, MultisigGate, TransactionMetadata,
//! };
//! use multisig_gate::registry::{OperationKind, RegistryConfig, SignerRegistry};
//!
//! struct NoopDispatcher;
//! impl ExecutionDispatcher for NoopDispatcher {
//!     fn execute(
//!         &self,
//!         kind: OperationKind,
//!         _payload: &serde_json::Value,
//!         _metadata: &TransactionMetadata,
//!     ) -> Result<ExecutionReceipt, DispatchError> {
//!         Ok(ExecutionReceipt::new(format!("{}-done", kind)))
//!     }
//! }
//!
//! let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! let pubkeys: Vec<String> = keys.iter().map(|k| k.public_key_hex()).collect();
//! let registry = Arc::new(
//!     SignerRegistry::new(RegistryConfig::new(pubkeys, 2)).unwrap(),
//! );
//!
//! let gate = MultisigGate::new(registry, Arc::new(NoopDispatcher));
//! let tx = gate
//!     .create_transaction(
//!         OperationKind::Payout,
//!         serde_json::json!({ "amount": 50, "recipient": "addr-1" }),
//!         "proposer",
//!         TransactionMetadata::default(),
//!         None,
//!     )
//!     .unwrap();
//!
//! for key in &keys[..2] {
//!     let sig = key.sign(&tx.signing_message()).unwrap();
//!     gate.sign(&tx.id, &key.public_key_hex(), &sig, None).unwrap();
//! }
//!
//! let receipt = gate.execute(&tx.id, &keys[0].public_key_hex()).unwrap();
//! println!("executed: {}", receipt.reference);
//! ```

pub mod crypto;
pub mod gate;
pub mod redemption;
pub mod registry;
pub mod validator;

// Re-export commonly used types
pub use crypto::KeyPair;
pub use gate::{
    ExecutionDispatcher, ExecutionReceipt, GateError, MultisigGate, MultisigTransaction, Priority,
    TimeoutPolicy, TransactionMetadata, TransactionStatus,
};
pub use redemption::{
    ClaimError, RedemptionChallenge, RedemptionClaim, RedemptionVerifier, VerificationReport,
    VerifierConfig,
};
pub use registry::{OperationKind, RegistryConfig, SignerRegistry};
pub use validator::{SignatureValidator, ValidationError};
