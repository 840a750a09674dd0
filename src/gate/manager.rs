//! Multisig transaction gate
//!
//! Owns the lifecycle of approval-gated operations: creation, signature
//! collection, quorum detection, execution, rejection, expiry, and the
//! audited emergency override. All state lives behind a mutex so the
//! check-then-append sequence in `sign` and the quorum flip are atomic
//! under concurrent callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::gate::dispatch::{ExecutionDispatcher, ExecutionReceipt};
use crate::gate::transaction::{
    CollectedSignature, EmergencyOverrideRecord, GateError, MultisigTransaction, Priority,
    RejectionRecord, TransactionMetadata, TransactionStatus,
};
use crate::registry::{OperationKind, SignerRegistry};
use crate::validator::{SignatureValidator, ValidationError};

// =============================================================================
// Timeout policy
// =============================================================================

/// Fallback window for kinds without an explicit entry
const DEFAULT_TIMEOUT_HOURS: i64 = 24;

/// Per-kind approval windows.
///
/// Blast radius and deliberation time differ by kind: emergencies must
/// resolve quickly, while governance-scale actions get room to collect
/// signatures. Deployments may supply their own table.
#[derive(Clone, Debug)]
pub struct TimeoutPolicy {
    windows: HashMap<OperationKind, Duration>,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        let mut windows = HashMap::new();
        windows.insert(OperationKind::Payout, Duration::hours(24));
        windows.insert(OperationKind::VaultTransfer, Duration::hours(24));
        windows.insert(OperationKind::EmergencyAction, Duration::hours(1));
        windows.insert(OperationKind::GovernanceExecution, Duration::hours(72));
        windows.insert(OperationKind::ContractUpgrade, Duration::days(7));
        Self { windows }
    }
}

impl TimeoutPolicy {
    pub fn timeout_for(&self, kind: OperationKind) -> Duration {
        self.windows
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Duration::hours(DEFAULT_TIMEOUT_HOURS))
    }

    pub fn with_window(mut self, kind: OperationKind, window: Duration) -> Self {
        self.windows.insert(kind, window);
        self
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a successful sign call
#[derive(Clone, Copy, Debug)]
pub struct SignOutcome {
    /// Whether this specific signature caused the approval transition
    pub approved: bool,
    /// Signatures collected so far
    pub signatures: usize,
    /// Quorum size
    pub required: usize,
}

/// Aggregate gate statistics
#[derive(Clone, Debug, Default)]
pub struct GateStats {
    pub total: usize,
    pub by_status: HashMap<TransactionStatus, usize>,
    pub by_kind: HashMap<OperationKind, usize>,
    /// Signatures contributed per signer, across all transactions
    pub signer_participation: HashMap<String, usize>,
    /// Mean executed_at - created_at over Executed transactions, in ms
    pub mean_approval_latency_ms: Option<f64>,
}

// =============================================================================
// Gate
// =============================================================================

/// The multisig transaction manager
pub struct MultisigGate {
    registry: Arc<SignerRegistry>,
    validator: SignatureValidator,
    dispatcher: Arc<dyn ExecutionDispatcher>,
    timeouts: TimeoutPolicy,
    transactions: Mutex<HashMap<String, MultisigTransaction>>,
}

impl MultisigGate {
    pub fn new(registry: Arc<SignerRegistry>, dispatcher: Arc<dyn ExecutionDispatcher>) -> Self {
        Self::with_timeouts(registry, dispatcher, TimeoutPolicy::default())
    }

    pub fn with_timeouts(
        registry: Arc<SignerRegistry>,
        dispatcher: Arc<dyn ExecutionDispatcher>,
        timeouts: TimeoutPolicy,
    ) -> Self {
        Self {
            validator: SignatureValidator::new(registry.clone()),
            registry,
            dispatcher,
            timeouts,
            transactions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MultisigTransaction>> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new pending transaction.
    ///
    /// The quorum is resolved through the registry (a caller-supplied
    /// threshold may only raise it) and the expiry window comes from the
    /// per-kind timeout policy.
    pub fn create_transaction(
        &self,
        kind: OperationKind,
        payload: serde_json::Value,
        created_by: &str,
        metadata: TransactionMetadata,
        custom_threshold: Option<usize>,
    ) -> Result<MultisigTransaction, GateError> {
        let required = self.registry.effective_threshold(kind, custom_threshold);
        let expires_at = Utc::now() + self.timeouts.timeout_for(kind);

        let tx = MultisigTransaction::new(
            kind,
            payload,
            created_by.to_string(),
            required,
            expires_at,
            metadata,
        );

        log::info!(
            "Created {} transaction {} requiring {} signatures (expires {})",
            kind,
            tx.id,
            required,
            expires_at
        );

        self.lock().insert(tx.id.clone(), tx.clone());
        Ok(tx)
    }

    /// Submit a signature for a pending transaction.
    ///
    /// Returns whether this call caused the approval transition, so the
    /// caller can notify the last signer.
    pub fn sign(
        &self,
        tx_id: &str,
        signer_pubkey: &str,
        signature: &[u8],
        message: Option<String>,
    ) -> Result<SignOutcome, GateError> {
        let now = Utc::now();
        let mut txs = self.lock();
        let tx = txs
            .get_mut(tx_id)
            .ok_or_else(|| GateError::NotFound(tx_id.to_string()))?;

        if expire_if_due(tx, now) {
            return Err(GateError::Expired);
        }

        if tx.status != TransactionStatus::Pending {
            return Err(GateError::InvalidState(format!(
                "cannot sign a {:?} transaction",
                tx.status
            )));
        }

        if !self.registry.is_authorized_signer(signer_pubkey) {
            return Err(GateError::Unauthorized(signer_pubkey.to_string()));
        }

        if tx.has_signed(signer_pubkey) {
            return Err(GateError::DuplicateSignature);
        }

        let signing_message = tx.signing_message();
        self.validator
            .validate(&signing_message, signer_pubkey, signature)
            .map_err(|e| match e {
                ValidationError::UnauthorizedSigner(id) => GateError::Unauthorized(id),
                _ => GateError::InvalidSignature,
            })?;

        tx.signatures.push(CollectedSignature {
            signer_pubkey: signer_pubkey.to_string(),
            signature: hex::encode(signature),
            signed_at: now,
            message,
        });

        let approved = tx.has_quorum();
        if approved {
            tx.status = TransactionStatus::Approved;
            log::info!(
                "Transaction {} approved ({}/{} signatures)",
                tx.id,
                tx.signature_count(),
                tx.required_signatures
            );
        }

        Ok(SignOutcome {
            approved,
            signatures: tx.signature_count(),
            required: tx.required_signatures,
        })
    }

    /// Execute an approved transaction through the dispatcher.
    ///
    /// A dispatcher failure leaves the transaction Approved so execution
    /// can be retried; it never corrupts the approval state.
    pub fn execute(&self, tx_id: &str, executor: &str) -> Result<ExecutionReceipt, GateError> {
        let now = Utc::now();
        let mut txs = self.lock();
        let tx = txs
            .get_mut(tx_id)
            .ok_or_else(|| GateError::NotFound(tx_id.to_string()))?;

        if expire_if_due(tx, now) {
            return Err(GateError::Expired);
        }

        if tx.status != TransactionStatus::Approved {
            return Err(GateError::NotApproved);
        }

        if !self.registry.is_authorized_executor(tx.kind, executor) {
            return Err(GateError::Unauthorized(executor.to_string()));
        }

        match self.dispatcher.execute(tx.kind, &tx.payload, &tx.metadata) {
            Ok(receipt) => {
                tx.executed_at = Some(Utc::now());
                tx.execution_receipt = Some(receipt.clone());
                tx.status = TransactionStatus::Executed;
                log::info!(
                    "Transaction {} executed by {} (receipt {})",
                    tx.id,
                    executor,
                    receipt.reference
                );
                Ok(receipt)
            }
            Err(e) => {
                log::warn!(
                    "Execution of transaction {} failed, still approved and retryable: {}",
                    tx.id,
                    e
                );
                Err(GateError::ExecutionFailed(e))
            }
        }
    }

    /// Reject a pending transaction. Admin-only.
    pub fn reject(
        &self,
        tx_id: &str,
        rejector: &str,
        reason: Option<String>,
    ) -> Result<bool, GateError> {
        let now = Utc::now();
        let mut txs = self.lock();
        let tx = txs
            .get_mut(tx_id)
            .ok_or_else(|| GateError::NotFound(tx_id.to_string()))?;

        if !self.registry.is_admin(rejector) {
            return Err(GateError::Unauthorized(rejector.to_string()));
        }

        if expire_if_due(tx, now) {
            return Err(GateError::Expired);
        }

        if tx.status != TransactionStatus::Pending {
            return Err(GateError::InvalidState(format!(
                "cannot reject a {:?} transaction",
                tx.status
            )));
        }

        tx.status = TransactionStatus::Rejected;
        tx.metadata.rejection = Some(RejectionRecord {
            rejected_by: rejector.to_string(),
            reason,
            rejected_at: now,
        });
        log::info!("Transaction {} rejected by {}", tx.id, rejector);
        Ok(true)
    }

    /// Bypass quorum on a critical-priority transaction.
    ///
    /// Restricted to registered emergency contacts; admin status alone is
    /// never sufficient. Every use leaves an audit record and a warn-level
    /// log line. Calling on an already-approved transaction is a no-op.
    pub fn emergency_override(
        &self,
        tx_id: &str,
        contact_id: &str,
        justification: &str,
    ) -> Result<bool, GateError> {
        let now = Utc::now();
        let mut txs = self.lock();
        let tx = txs
            .get_mut(tx_id)
            .ok_or_else(|| GateError::NotFound(tx_id.to_string()))?;

        if !self.registry.is_emergency_contact(contact_id) {
            return Err(GateError::Unauthorized(contact_id.to_string()));
        }

        if tx.metadata.priority != Priority::Critical {
            return Err(GateError::InvalidState(
                "emergency override requires critical priority".to_string(),
            ));
        }

        if tx.status == TransactionStatus::Approved {
            return Ok(false);
        }

        if expire_if_due(tx, now) {
            return Err(GateError::Expired);
        }

        if tx.status != TransactionStatus::Pending {
            return Err(GateError::InvalidState(format!(
                "cannot override a {:?} transaction",
                tx.status
            )));
        }

        tx.status = TransactionStatus::Approved;
        tx.metadata.emergency_override = Some(EmergencyOverrideRecord {
            contact_id: contact_id.to_string(),
            justification: justification.to_string(),
            overridden_at: now,
        });
        log::warn!(
            "EMERGENCY OVERRIDE on transaction {} by contact {}",
            tx.id,
            contact_id
        );
        Ok(true)
    }

    /// Non-terminal, non-expired transactions, oldest first.
    ///
    /// With a signer id, transactions that signer has already signed are
    /// excluded so the list contains only actionable items.
    pub fn list_pending(&self, signer: Option<&str>) -> Vec<MultisigTransaction> {
        let now = Utc::now();
        let mut txs = self.lock();

        let mut pending: Vec<MultisigTransaction> = txs
            .values_mut()
            .filter_map(|tx| {
                expire_if_due(tx, now);
                if tx.status.is_terminal() {
                    return None;
                }
                if let Some(id) = signer {
                    if tx.has_signed(id) {
                        return None;
                    }
                }
                Some(tx.clone())
            })
            .collect();

        pending.sort_by_key(|tx| tx.created_at);
        pending
    }

    /// Fetch a transaction by id, applying lazy expiry first
    pub fn get_transaction(&self, tx_id: &str) -> Option<MultisigTransaction> {
        let now = Utc::now();
        let mut txs = self.lock();
        let tx = txs.get_mut(tx_id)?;
        expire_if_due(tx, now);
        Some(tx.clone())
    }

    /// Aggregate counts and approval latency
    pub fn stats(&self) -> GateStats {
        let now = Utc::now();
        let mut txs = self.lock();

        let mut stats = GateStats::default();
        let mut latency_sum_ms: i64 = 0;
        let mut executed = 0usize;

        for tx in txs.values_mut() {
            expire_if_due(tx, now);

            stats.total += 1;
            *stats.by_status.entry(tx.status).or_insert(0) += 1;
            *stats.by_kind.entry(tx.kind).or_insert(0) += 1;

            for sig in &tx.signatures {
                *stats
                    .signer_participation
                    .entry(sig.signer_pubkey.clone())
                    .or_insert(0) += 1;
            }

            if let Some(executed_at) = tx.executed_at {
                executed += 1;
                latency_sum_ms += (executed_at - tx.created_at).num_milliseconds();
            }
        }

        if executed > 0 {
            stats.mean_approval_latency_ms = Some(latency_sum_ms as f64 / executed as f64);
        }
        stats
    }
}

/// Lazily flip an overdue transaction to Expired.
///
/// Applies to Pending and Approved records: once the window has passed,
/// neither signing nor execution may succeed.
fn expire_if_due(tx: &mut MultisigTransaction, now: DateTime<Utc>) -> bool {
    let expirable = matches!(
        tx.status,
        TransactionStatus::Pending | TransactionStatus::Approved
    );
    if expirable && tx.is_expired(now) {
        tx.status = TransactionStatus::Expired;
        log::info!("Transaction {} expired", tx.id);
        true
    } else {
        false
    }
}
