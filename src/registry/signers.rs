//! Authorized signer registry
//!
//! Holds the signer set, per-operation-kind quorum minimums, admin
//! identities, and emergency contacts. Admin and emergency-contact are
//! deliberately distinct trust tiers: an admin cannot use the emergency
//! path and an emergency contact gets no admin privileges.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{public_key_from_hex, public_key_to_address};

/// Errors raised while constructing a registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Signer set is empty")]
    NoSigners,
    #[error("Duplicate signer identity: {0}")]
    DuplicateSigner(String),
    #[error("Admin {0} is not a registered signer")]
    AdminNotSigner(String),
}

/// Kinds of approval-gated operations
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Payout,
    VaultTransfer,
    EmergencyAction,
    GovernanceExecution,
    ContractUpgrade,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Payout => "payout",
            OperationKind::VaultTransfer => "vault_transfer",
            OperationKind::EmergencyAction => "emergency_action",
            OperationKind::GovernanceExecution => "governance_execution",
            OperationKind::ContractUpgrade => "contract_upgrade",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a signer registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Authorized signer identities (hex public keys or derived addresses)
    pub signers: Vec<String>,
    /// Global default quorum size
    pub default_threshold: usize,
    /// Per-kind minimum quorum overrides
    pub kind_thresholds: HashMap<OperationKind, usize>,
    /// Admin identities (must be registered signers)
    pub admins: Vec<String>,
    /// Emergency contact identities (distinct tier, need not be signers)
    pub emergency_contacts: Vec<String>,
    /// Kinds only admins may execute
    pub admin_only_kinds: HashSet<OperationKind>,
}

impl RegistryConfig {
    /// Create a config with the default admin-only policy (ContractUpgrade)
    pub fn new(signers: Vec<String>, default_threshold: usize) -> Self {
        Self {
            signers,
            default_threshold,
            kind_thresholds: HashMap::new(),
            admins: Vec::new(),
            emergency_contacts: Vec::new(),
            admin_only_kinds: [OperationKind::ContractUpgrade].into_iter().collect(),
        }
    }

    pub fn with_kind_threshold(mut self, kind: OperationKind, threshold: usize) -> Self {
        self.kind_thresholds.insert(kind, threshold);
        self
    }

    pub fn with_admins(mut self, admins: Vec<String>) -> Self {
        self.admins = admins;
        self
    }

    pub fn with_emergency_contacts(mut self, contacts: Vec<String>) -> Self {
        self.emergency_contacts = contacts;
        self
    }
}

/// The authorized signer set and trust-tier lookup
#[derive(Clone, Debug)]
pub struct SignerRegistry {
    signers: Vec<String>,
    signer_lookup: HashSet<String>,
    default_threshold: usize,
    kind_thresholds: HashMap<OperationKind, usize>,
    admins: HashSet<String>,
    emergency_contacts: HashSet<String>,
    admin_only_kinds: HashSet<OperationKind>,
}

impl SignerRegistry {
    /// Build a registry, validating thresholds and identity sets
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        if config.signers.is_empty() {
            return Err(RegistryError::NoSigners);
        }

        if config.default_threshold == 0 {
            return Err(RegistryError::InvalidThreshold(
                "default threshold must be at least 1".to_string(),
            ));
        }

        if config.default_threshold > config.signers.len() {
            return Err(RegistryError::InvalidThreshold(format!(
                "default threshold {} exceeds signer count {}",
                config.default_threshold,
                config.signers.len()
            )));
        }

        for (kind, threshold) in &config.kind_thresholds {
            if *threshold == 0 || *threshold > config.signers.len() {
                return Err(RegistryError::InvalidThreshold(format!(
                    "threshold {} for {} out of range (1..={})",
                    threshold,
                    kind,
                    config.signers.len()
                )));
            }
        }

        // Index both the raw identity and, for pubkey entries, the
        // derived address, so either form authorizes.
        let mut signer_lookup = HashSet::new();
        for signer in &config.signers {
            if !signer_lookup.insert(signer.clone()) {
                return Err(RegistryError::DuplicateSigner(signer.clone()));
            }
            if let Ok(pk) = public_key_from_hex(signer) {
                signer_lookup.insert(public_key_to_address(&pk));
            }
        }

        for admin in &config.admins {
            if !signer_lookup.contains(admin) {
                return Err(RegistryError::AdminNotSigner(admin.clone()));
            }
        }

        Ok(Self {
            signers: config.signers,
            signer_lookup,
            default_threshold: config.default_threshold,
            kind_thresholds: config.kind_thresholds,
            admins: config.admins.into_iter().collect(),
            emergency_contacts: config.emergency_contacts.into_iter().collect(),
            admin_only_kinds: config.admin_only_kinds,
        })
    }

    /// Resolve the effective quorum for a kind.
    ///
    /// A caller-supplied override may only raise the quorum; anything below
    /// the kind's configured minimum is clamped up to it.
    pub fn effective_threshold(&self, kind: OperationKind, requested: Option<usize>) -> usize {
        let minimum = self
            .kind_thresholds
            .get(&kind)
            .copied()
            .unwrap_or(self.default_threshold);

        match requested {
            Some(n) if n > minimum => n,
            _ => minimum,
        }
    }

    /// Check if an identity (pubkey hex or address) is an authorized signer
    pub fn is_authorized_signer(&self, identity: &str) -> bool {
        if self.signer_lookup.contains(identity) {
            return true;
        }
        // A caller may present a pubkey while the registry holds the address
        if let Ok(pk) = public_key_from_hex(identity) {
            return self.signer_lookup.contains(&public_key_to_address(&pk));
        }
        false
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.admins.contains(identity)
    }

    pub fn is_emergency_contact(&self, identity: &str) -> bool {
        self.emergency_contacts.contains(identity)
    }

    /// Check execution rights: admins may execute any kind; ordinary
    /// signers may execute anything not marked admin-only.
    pub fn is_authorized_executor(&self, kind: OperationKind, identity: &str) -> bool {
        if self.is_admin(identity) {
            return true;
        }
        if self.admin_only_kinds.contains(&kind) {
            return false;
        }
        self.is_authorized_signer(identity)
    }

    /// Number of registered signers
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Registered signer identities, in registration order
    pub fn signers(&self) -> &[String] {
        &self.signers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_registry() -> (SignerRegistry, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let pubkeys: Vec<String> = keys.iter().map(|k| k.public_key_hex()).collect();

        let config = RegistryConfig::new(pubkeys.clone(), 2)
            .with_kind_threshold(OperationKind::ContractUpgrade, 3)
            .with_admins(vec![pubkeys[0].clone()])
            .with_emergency_contacts(vec!["contact-1".to_string()]);

        (SignerRegistry::new(config).unwrap(), keys)
    }

    #[test]
    fn test_config_validation() {
        // Empty signer set
        assert!(matches!(
            SignerRegistry::new(RegistryConfig::new(vec![], 1)),
            Err(RegistryError::NoSigners)
        ));

        // Zero threshold
        assert!(SignerRegistry::new(RegistryConfig::new(vec!["a".to_string()], 0)).is_err());

        // Threshold above signer count
        assert!(SignerRegistry::new(RegistryConfig::new(vec!["a".to_string()], 2)).is_err());

        // Duplicate signers
        let dup = RegistryConfig::new(vec!["a".to_string(), "a".to_string()], 1);
        assert!(matches!(
            SignerRegistry::new(dup),
            Err(RegistryError::DuplicateSigner(_))
        ));

        // Admin outside the signer set
        let bad_admin =
            RegistryConfig::new(vec!["a".to_string()], 1).with_admins(vec!["b".to_string()]);
        assert!(matches!(
            SignerRegistry::new(bad_admin),
            Err(RegistryError::AdminNotSigner(_))
        ));
    }

    #[test]
    fn test_effective_threshold_resolution() {
        let (registry, _) = sample_registry();

        // Kind without an override falls back to the default
        assert_eq!(
            registry.effective_threshold(OperationKind::Payout, None),
            2
        );
        // Kind minimum wins over the default
        assert_eq!(
            registry.effective_threshold(OperationKind::ContractUpgrade, None),
            3
        );
        // Caller may raise the quorum
        assert_eq!(
            registry.effective_threshold(OperationKind::Payout, Some(4)),
            4
        );
        // But never lower it below the kind minimum
        assert_eq!(
            registry.effective_threshold(OperationKind::ContractUpgrade, Some(1)),
            3
        );
    }

    #[test]
    fn test_signer_lookup_by_pubkey_or_address() {
        let (registry, keys) = sample_registry();

        assert!(registry.is_authorized_signer(&keys[0].public_key_hex()));
        assert!(registry.is_authorized_signer(&keys[0].address()));
        assert!(!registry.is_authorized_signer(&KeyPair::generate().public_key_hex()));
        assert!(!registry.is_authorized_signer("not-a-signer"));
    }

    #[test]
    fn test_trust_tiers_are_distinct() {
        let (registry, keys) = sample_registry();

        assert!(registry.is_admin(&keys[0].public_key_hex()));
        assert!(!registry.is_admin(&keys[1].public_key_hex()));

        assert!(registry.is_emergency_contact("contact-1"));
        // Admin status does not grant the emergency tier
        assert!(!registry.is_emergency_contact(&keys[0].public_key_hex()));
    }

    #[test]
    fn test_executor_policy() {
        let (registry, keys) = sample_registry();
        let admin = keys[0].public_key_hex();
        let signer = keys[1].public_key_hex();

        // Ordinary signers may execute non-elevated kinds
        assert!(registry.is_authorized_executor(OperationKind::Payout, &signer));
        // ContractUpgrade is admin-only by default
        assert!(!registry.is_authorized_executor(OperationKind::ContractUpgrade, &signer));
        assert!(registry.is_authorized_executor(OperationKind::ContractUpgrade, &admin));
        // Unknown identities may execute nothing
        assert!(!registry.is_authorized_executor(OperationKind::Payout, "stranger"));
    }
}
