//! Execution dispatcher interface
//!
//! Once a transaction reaches quorum, the gate hands the operation to an
//! externally implemented dispatcher (payout processor, vault contract
//! caller, upgrade runner). The gate defines the interface and the receipt
//! shape only; implementations live with the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::gate::transaction::TransactionMetadata;
use crate::registry::OperationKind;

/// Errors surfaced by a dispatcher
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No dispatcher registered for {0}")]
    Unsupported(OperationKind),
    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Proof of a completed side effect, recorded on the transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// Dispatcher-assigned reference (payment id, tx hash, ...)
    pub reference: String,
    /// When the effect completed
    pub completed_at: DateTime<Utc>,
    /// Optional dispatcher-specific detail
    pub detail: Option<Value>,
}

impl ExecutionReceipt {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            completed_at: Utc::now(),
            detail: None,
        }
    }
}

/// Performs the side effect for an approved transaction.
///
/// A failed dispatch must leave no partial gate state; the gate keeps the
/// transaction Approved so execution can be retried.
pub trait ExecutionDispatcher: Send + Sync {
    fn execute(
        &self,
        kind: OperationKind,
        payload: &Value,
        metadata: &TransactionMetadata,
    ) -> Result<ExecutionReceipt, DispatchError>;
}
