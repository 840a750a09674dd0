//! Approval gate for critical, irreversible operations
//!
//! Requires a quorum of authorized signer approvals before an operation
//! may execute, with per-kind timeouts, admin rejection, and an audited
//! emergency override path.
//!
//! # Example
//!
//! ```ignore
//! use multisig_gate::gate::{MultisigGate, TransactionMetadata};
//! use multisig_gate::registry::OperationKind;
//!
//! let gate = MultisigGate::new(registry, dispatcher);
//! let tx = gate.create_transaction(
//!     OperationKind::Payout,
//!     payload,
//!     "proposer",
//!     TransactionMetadata::default(),
//!     None,
//! )?;
//!
//! gate.sign(&tx.id, &signer_a, &sig_a, None)?;
//! let outcome = gate.sign(&tx.id, &signer_b, &sig_b, None)?;
//! assert!(outcome.approved);
//!
//! let receipt = gate.execute(&tx.id, &signer_a)?;
//! ```

pub mod dispatch;
pub mod manager;
pub mod transaction;

pub use dispatch::{DispatchError, ExecutionDispatcher, ExecutionReceipt};
pub use manager::{GateStats, MultisigGate, SignOutcome, TimeoutPolicy};
pub use transaction::{
    CollectedSignature, EmergencyOverrideRecord, GateError, MultisigTransaction, Priority,
    RejectionRecord, TransactionMetadata, TransactionStatus,
};
