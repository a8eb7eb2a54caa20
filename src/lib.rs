//! Solana <-> Sui bridge request orchestrator
//!
//! Drives burn and mint requests through their lifecycle: user presigning,
//! Sui request creation, enclave attestation, solver co-signing, threshold
//! signature polling, and the final Solana release broadcast. The HTTP
//! surface in [`api`] is a thin shell over [`orchestrator`].

pub mod api;
pub mod attestation;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod nonce_manager;
pub mod observability;
pub mod orchestrator;
pub mod rpc_manager;
pub mod sui;
pub mod tx_builder;
pub mod wallet;

pub use solana_sdk::{pubkey::Pubkey, signature::Signature};

#[cfg(test)]
mod tests {
    pub(crate) mod test_helpers;

    mod api_tests;
    mod flow_tests;
}
