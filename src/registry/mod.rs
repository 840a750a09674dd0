//! Signer registry: authorized identities, quorum policy, trust tiers

pub mod signers;

pub use signers::{OperationKind, RegistryConfig, RegistryError, SignerRegistry};
