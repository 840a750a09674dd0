//! Redemption claim verification pipeline
//!
//! Verifies claims in a fixed order, short-circuiting on hard failures
//! (structure, expiry, replay, authorization, cryptography, quorum) while
//! accumulating soft warnings that only reduce an advisory 0-100 security
//! score. Policy issues inform downstream judgment; they never block.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};

use crate::redemption::claim::{ClaimError, RedemptionClaim};
use crate::redemption::nonce::{NonceLedger, DEFAULT_LEDGER_CAPACITY};
use crate::registry::SignerRegistry;
use crate::validator::{SignatureValidator, ValidationError};

/// Score bonus for a satisfied multi-signature quorum
const MULTI_SIG_BONUS: i32 = 15;

/// Soft issues surfaced alongside a successful verification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Claim is inside the last stretch of its freshness window
    NearExpiry,
    /// Timestamp is ahead of our clock beyond the skew tolerance
    FutureTimestamp,
    /// Amount exceeds the configured large-amount threshold
    LargeAmount,
    /// Amount is out of proportion to a low quality/grief score
    DisproportionateAmount,
    /// Claim came through the reduced-assurance emergency path
    EmergencyPath,
}

impl Warning {
    /// Penalty applied to the security score
    pub fn penalty(&self) -> i32 {
        match self {
            Warning::NearExpiry => 10,
            Warning::FutureTimestamp => 5,
            Warning::LargeAmount => 5,
            Warning::DisproportionateAmount => 5,
            Warning::EmergencyPath => 20,
        }
    }
}

/// Successful verification verdict
#[derive(Clone, Debug)]
pub struct VerificationReport {
    /// Advisory 0-100 score; callers pick their own acceptance threshold
    pub score: u8,
    pub warnings: Vec<Warning>,
}

/// Tunable verification policy
#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Maximum claim age before a hard Expired failure
    pub max_age: Duration,
    /// Tolerated clock skew for future timestamps
    pub clock_skew: Duration,
    /// Fraction of the window, from the end, that counts as near expiry
    pub near_expiry_fraction: f64,
    /// Amounts above this draw a soft warning
    pub large_amount_threshold: u64,
    /// Grief scores below this count as low quality
    pub low_grief_score: u8,
    /// Distinct signers needed when additional attestations are supplied
    pub required_signers: usize,
    /// Subset of authorized signers allowed on the emergency path
    pub emergency_signers: HashSet<String>,
    /// Consumed-nonce window size
    pub ledger_capacity: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::minutes(15),
            clock_skew: Duration::seconds(30),
            near_expiry_fraction: 0.2,
            large_amount_threshold: 10_000,
            low_grief_score: 30,
            required_signers: 2,
            emergency_signers: HashSet::new(),
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
        }
    }
}

/// Counters kept across the verifier's lifetime
#[derive(Debug, Default)]
struct StatsInner {
    total: usize,
    accepted: usize,
    rejected: usize,
    replays_detected: usize,
    accepted_score_sum: u64,
}

/// Snapshot of verification activity
#[derive(Clone, Debug, Default)]
pub struct VerificationStats {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub replays_detected: usize,
    pub mean_accepted_score: Option<f64>,
}

/// Verifies redemption claims against the registry and nonce ledger
pub struct RedemptionVerifier {
    pub(crate) registry: Arc<SignerRegistry>,
    pub(crate) validator: SignatureValidator,
    pub(crate) config: VerifierConfig,
    pub(crate) ledger: Mutex<NonceLedger>,
    stats: Mutex<StatsInner>,
}

impl RedemptionVerifier {
    pub fn new(registry: Arc<SignerRegistry>) -> Self {
        Self::with_config(registry, VerifierConfig::default())
    }

    pub fn with_config(registry: Arc<SignerRegistry>, config: VerifierConfig) -> Self {
        Self {
            validator: SignatureValidator::new(registry.clone()),
            registry,
            ledger: Mutex::new(NonceLedger::new(config.ledger_capacity)),
            config,
            stats: Mutex::new(StatsInner::default()),
        }
    }

    pub(crate) fn lock_ledger(&self) -> MutexGuard<'_, NonceLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Verify a claim, optionally with additional independent attestations.
    ///
    /// Hard failures return an error; soft issues come back as warnings on
    /// the report. The claim's nonce (and any attestation nonces) are
    /// consumed only when the whole pipeline passes.
    pub fn verify(
        &self,
        claim: &RedemptionClaim,
        additional: &[RedemptionClaim],
    ) -> Result<VerificationReport, ClaimError> {
        let result = self.verify_inner(claim, additional);

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total += 1;
        match &result {
            Ok(report) => {
                stats.accepted += 1;
                stats.accepted_score_sum += report.score as u64;
            }
            Err(e) => {
                stats.rejected += 1;
                if matches!(e, ClaimError::ReplayDetected) {
                    stats.replays_detected += 1;
                }
                log::warn!(
                    "Redemption claim for capsule {} rejected: {}",
                    claim.capsule_id,
                    e
                );
            }
        }
        result
    }

    fn verify_inner(
        &self,
        claim: &RedemptionClaim,
        additional: &[RedemptionClaim],
    ) -> Result<VerificationReport, ClaimError> {
        let mut warnings = Vec::new();
        let mut score: i32 = 100;

        // 1. Structure
        claim.validate_shape()?;

        // 2. Freshness
        let now = Utc::now();
        if claim.timestamp > now + self.config.clock_skew {
            warnings.push(Warning::FutureTimestamp);
        }
        let age = now - claim.timestamp;
        if age > self.config.max_age {
            return Err(ClaimError::Expired);
        }
        let near_cutoff_ms =
            self.config.max_age.num_milliseconds() as f64 * (1.0 - self.config.near_expiry_fraction);
        if age.num_milliseconds() as f64 > near_cutoff_ms {
            warnings.push(Warning::NearExpiry);
        }

        // 3. Replay (early check; the authoritative consume happens last)
        {
            let ledger = self.lock_ledger();
            if ledger.is_consumed(&claim.nonce) {
                return Err(ClaimError::ReplayDetected);
            }
            for extra in additional {
                if ledger.is_consumed(&extra.nonce) {
                    return Err(ClaimError::ReplayDetected);
                }
            }
        }

        // 4. Authorization
        if !self.registry.is_authorized_signer(&claim.signer_pubkey) {
            return Err(ClaimError::Unauthorized(claim.signer_pubkey.clone()));
        }

        // 5. Cryptographic integrity
        self.check_signature(claim)?;

        // 6. Multi-signature quorum
        if !additional.is_empty() {
            let mut signers: HashSet<&str> = HashSet::new();
            signers.insert(claim.signer_pubkey.as_str());

            for extra in additional {
                extra.validate_shape()?;
                if extra.capsule_id != claim.capsule_id {
                    return Err(ClaimError::ClaimMismatch("capsule_id".to_string()));
                }
                if extra.redeemer != claim.redeemer {
                    return Err(ClaimError::ClaimMismatch("redeemer".to_string()));
                }
                if extra.amount != claim.amount {
                    return Err(ClaimError::ClaimMismatch("amount".to_string()));
                }
                self.check_signature(extra)?;
                signers.insert(extra.signer_pubkey.as_str());
            }

            if signers.len() < self.config.required_signers {
                return Err(ClaimError::QuorumNotMet {
                    have: signers.len(),
                    need: self.config.required_signers,
                });
            }
            score += MULTI_SIG_BONUS;
        }

        // 7. Amount policy (advisory only)
        if claim.amount > self.config.large_amount_threshold {
            warnings.push(Warning::LargeAmount);
        }
        if let Some(grief) = claim.metadata.grief_score {
            if grief < self.config.low_grief_score
                && claim.amount > self.config.large_amount_threshold / 10
            {
                warnings.push(Warning::DisproportionateAmount);
            }
        }

        // 8. Emergency path: distinct, smaller signer subset
        if claim.metadata.emergency {
            if !self.config.emergency_signers.contains(&claim.signer_pubkey) {
                return Err(ClaimError::Unauthorized(claim.signer_pubkey.clone()));
            }
            warnings.push(Warning::EmergencyPath);
        }

        // Consume nonces all-or-nothing under one lock: re-check every
        // nonce first, then record them. A concurrent verify sharing any
        // nonce (primary or attestation) loses here even if it passed the
        // early check.
        {
            let mut ledger = self.lock_ledger();
            if ledger.is_consumed(&claim.nonce)
                || additional.iter().any(|e| ledger.is_consumed(&e.nonce))
            {
                return Err(ClaimError::ReplayDetected);
            }
            ledger.consume(&claim.nonce);
            for extra in additional {
                ledger.consume(&extra.nonce);
            }
        }

        score -= warnings.iter().map(Warning::penalty).sum::<i32>();
        Ok(VerificationReport {
            score: score.clamp(0, 100) as u8,
            warnings,
        })
    }

    fn check_signature(&self, claim: &RedemptionClaim) -> Result<(), ClaimError> {
        self.validator
            .validate_hex(&claim.signing_message(), &claim.signer_pubkey, &claim.signature)
            .map_err(|e| match e {
                ValidationError::UnauthorizedSigner(id) => ClaimError::Unauthorized(id),
                _ => ClaimError::InvalidSignature,
            })
    }

    /// Verify a batch independently, in order. The shared nonce ledger is
    /// the only cross-claim state, so ordering decides which of two
    /// duplicate nonces wins.
    pub fn verify_all(
        &self,
        claims: &[RedemptionClaim],
    ) -> Vec<Result<VerificationReport, ClaimError>> {
        claims.iter().map(|c| self.verify(c, &[])).collect()
    }

    /// Snapshot of verification counters
    pub fn stats(&self) -> VerificationStats {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        VerificationStats {
            total: stats.total,
            accepted: stats.accepted,
            rejected: stats.rejected,
            replays_detected: stats.replays_detected,
            mean_accepted_score: if stats.accepted > 0 {
                Some(stats.accepted_score_sum as f64 / stats.accepted as f64)
            } else {
                None
            },
        }
    }
}
