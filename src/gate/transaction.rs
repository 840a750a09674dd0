//! Approval-gated transaction records
//!
//! A `MultisigTransaction` tracks one pending operation from creation
//! through signature collection to execution, rejection, or expiry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::crypto::message::canonical_digest;
use crate::crypto::sha256;
use crate::gate::dispatch::{DispatchError, ExecutionReceipt};
use crate::registry::OperationKind;

/// Errors raised by gate operations
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Transaction expired")]
    Expired,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Signer has already signed this transaction")]
    DuplicateSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Transaction is not approved")]
    NotApproved,
    #[error("Execution failed: {0}")]
    ExecutionFailed(#[from] DispatchError),
}

/// Lifecycle state of a gated transaction.
///
/// Allowed edges: Pending -> Approved -> Executed, Pending -> Rejected,
/// Pending -> Expired. Executed, Rejected, and Expired are terminal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Pending,
    Approved,
    Executed,
    Rejected,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Executed | TransactionStatus::Rejected | TransactionStatus::Expired
        )
    }
}

/// Priority tier attached to a transaction
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// One collected approval signature
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectedSignature {
    /// Public key of the signer (hex)
    pub signer_pubkey: String,
    /// Compact signature over the transaction's signing message (hex)
    pub signature: String,
    /// When the signature was added
    pub signed_at: DateTime<Utc>,
    /// Optional note from the signer
    pub message: Option<String>,
}

/// Audit record left by an emergency override
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmergencyOverrideRecord {
    pub contact_id: String,
    pub justification: String,
    pub overridden_at: DateTime<Utc>,
}

/// Audit record left by an admin rejection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub rejected_by: String,
    pub reason: Option<String>,
    pub rejected_at: DateTime<Utc>,
}

/// Operation-specific metadata the gate carries but never interprets
/// beyond the declared fields
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub priority: Priority,
    pub amount: Option<u64>,
    pub recipient: Option<String>,
    pub contract_address: Option<String>,
    pub emergency_override: Option<EmergencyOverrideRecord>,
    pub rejection: Option<RejectionRecord>,
}

impl TransactionMetadata {
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

/// One approval-gated operation and its collected signatures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigTransaction {
    /// Unguessable unique id
    pub id: String,
    /// What kind of operation is being gated
    pub kind: OperationKind,
    /// Opaque operation payload owned by the caller
    pub payload: Value,
    /// Quorum size resolved at creation time
    pub required_signatures: usize,
    /// Collected signatures, signer-unique, in arrival order
    pub signatures: Vec<CollectedSignature>,
    /// Identity that proposed the operation
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Derived from the per-kind timeout policy
    pub expires_at: DateTime<Utc>,
    pub status: TransactionStatus,
    pub metadata: TransactionMetadata,
    /// Populated only once Executed
    pub executed_at: Option<DateTime<Utc>>,
    pub execution_receipt: Option<ExecutionReceipt>,
}

impl MultisigTransaction {
    /// Create a new pending transaction
    pub fn new(
        kind: OperationKind,
        payload: Value,
        created_by: String,
        required_signatures: usize,
        expires_at: DateTime<Utc>,
        metadata: TransactionMetadata,
    ) -> Self {
        Self {
            id: generate_transaction_id(),
            kind,
            payload,
            required_signatures,
            signatures: Vec::new(),
            created_by,
            created_at: Utc::now(),
            expires_at,
            status: TransactionStatus::Pending,
            metadata,
            executed_at: None,
            execution_receipt: None,
        }
    }

    /// Canonical signing message for this transaction.
    ///
    /// Every signer must reproduce these exact bytes, so the field set is
    /// fixed: id, kind, payload, timestamp (creation, unix seconds).
    pub fn signing_message(&self) -> Vec<u8> {
        let mut fields = BTreeMap::new();
        fields.insert("id", json!(self.id));
        fields.insert("kind", json!(self.kind.as_str()));
        fields.insert("payload", self.payload.clone());
        fields.insert("timestamp", json!(self.created_at.timestamp()));
        canonical_digest(&fields)
    }

    /// Check expiry against a supplied clock (lazy, no background timer)
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn has_signed(&self, signer_pubkey: &str) -> bool {
        self.signatures
            .iter()
            .any(|s| s.signer_pubkey == signer_pubkey)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Quorum check over distinct signers (the signature list is already
    /// signer-unique, but count defensively anyway)
    pub fn has_quorum(&self) -> bool {
        let distinct: std::collections::HashSet<&str> = self
            .signatures
            .iter()
            .map(|s| s.signer_pubkey.as_str())
            .collect();
        distinct.len() >= self.required_signatures
    }
}

/// Generate an unguessable transaction id from OS randomness and the clock
fn generate_transaction_id() -> String {
    let mut seed = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut seed);

    let mut data = seed.to_vec();
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    data.extend_from_slice(&nanos.to_le_bytes());

    hex::encode(&sha256(&data)[..16])
}
