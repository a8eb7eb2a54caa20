//! Bridge flow orchestration
//!
//! [`BridgeServices`] is the one process-wide object holding every chain and
//! service collaborator; it is built once at startup and borrowed by each
//! flow. Flows keep their own state (request ids, capabilities, signatures)
//! on the stack and return it through [`FlowFailure`] when they fail after a
//! commit.

pub mod burn;
pub mod errors;
pub mod mint;
pub mod phase;

pub use burn::{
    broadcast_burn, run_burn, run_burn_to_settlement, BroadcastParams, BurnOutcome, BurnParams,
    SettledBurn,
};
pub use errors::BridgeError;
pub use mint::{create_nonce, run_mint, vote_mint, MintOutcome, MintParams, VoteMintParams};
pub use phase::{FlowFailure, Phase, PhaseTracker, RecoveryState};

use crate::attestation::{EnclaveAttestor, EnclaveClient, SolverClient, TransferCosigner};
use crate::config::Config;
use crate::nonce_manager::{BlockhashRetryPolicy, NonceAccountManager};
use crate::rpc_manager::{SolanaLedger, SolanaRpc};
use crate::sui::{
    BridgeCalls, ObjectId, ObjectSchema, RequestBuilder, SuiJsonRpc, SuiLedger,
    ThresholdSignPoller,
};
use crate::wallet::{KeystoreDirectory, WalletDirectory};
use anyhow::Context;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Destination-side token release settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSettings {
    /// Custodial key owning the released tokens (slot 1 signer)
    pub custodian: Pubkey,
    pub mint: Pubkey,
    pub decimals: u8,
}

/// Collaborators shared by every flow
pub struct BridgeServices {
    pub wallets: Arc<dyn WalletDirectory>,
    pub solana: Arc<dyn SolanaLedger>,
    pub nonces: NonceAccountManager,
    pub requests: RequestBuilder,
    pub enclave: Arc<dyn EnclaveAttestor>,
    pub solver: Arc<dyn TransferCosigner>,
    pub poller: ThresholdSignPoller,
    pub release: ReleaseSettings,
}

impl BridgeServices {
    /// Wire the production clients from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let solana: Arc<dyn SolanaLedger> = Arc::new(SolanaRpc::new(&config.solana.rpc_url));
        let sui: Arc<dyn SuiLedger> = Arc::new(
            SuiJsonRpc::new(
                &config.sui.rpc_url,
                Duration::from_secs(config.sui.timeout_secs),
            )
            .context("building Sui client")?,
        );

        let enclave = EnclaveClient::new(
            &config.enclave.url,
            config.enclave.timeout(),
            config.enclave.retries,
        )
        .context("building enclave client")?;
        let solver = SolverClient::new(
            &config.solver.url,
            config.solver.timeout(),
            config.solver.retries,
        )
        .context("building solver client")?;

        let nonces = NonceAccountManager::new(
            Arc::clone(&solana),
            config.solana.nonce_seed.clone(),
            config.solana.tx_fee_lamports,
            BlockhashRetryPolicy::new(
                config.solana.blockhash_retry_attempts,
                config.solana.blockhash_retry_delay_ms,
            ),
        );

        let calls = BridgeCalls {
            package: config.sui.bridge_package.clone(),
            module: config.sui.bridge_module.clone(),
            bridge_object: ObjectId::parse(&config.sui.bridge_object)
                .context("parsing sui.bridge_object")?,
        };
        let schema = ObjectSchema {
            bridge_package: config.sui.bridge_package.clone(),
            bridge_module: config.sui.bridge_module.clone(),
            dwallet_package: config.sui.dwallet_package.clone(),
            dwallet_module: config.sui.dwallet_module.clone(),
        };
        let requests = RequestBuilder::new(Arc::clone(&sui), calls, schema, config.sui.gas_budget);
        let poller = ThresholdSignPoller::new(
            sui,
            config.threshold.max_polls,
            Duration::from_millis(config.threshold.poll_interval_ms),
        );

        let release = ReleaseSettings {
            custodian: config.custodian()?,
            mint: config.release_mint()?,
            decimals: config.solana.release_decimals,
        };

        info!(
            solana_rpc = %config.solana.rpc_url,
            sui_rpc = %config.sui.rpc_url,
            custodian = %release.custodian,
            "Bridge services initialized"
        );

        Ok(Self {
            wallets: Arc::new(KeystoreDirectory::new(config.wallet.keystore_dir.clone())),
            solana,
            nonces,
            requests,
            enclave: Arc::new(enclave),
            solver: Arc::new(solver),
            poller,
            release,
        })
    }
}

/// `<address>::<module>::<Name>` with an optional generic suffix
pub(crate) fn validate_coin_type(coin_type: &str) -> Result<(), BridgeError> {
    let base = coin_type.split('<').next().unwrap_or_default();
    let parts: Vec<&str> = base.split("::").collect();
    let valid = parts.len() == 3
        && parts[0].starts_with("0x")
        && parts[1..].iter().all(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(BridgeError::validation(format!(
            "coinType {coin_type:?} is not a Move type"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_type_shape() {
        assert!(validate_coin_type("0x2::sui::SUI").is_ok());
        assert!(validate_coin_type("0xabc::wrapped::Coin<0x2::sui::SUI>").is_ok());
        assert!(validate_coin_type("").is_err());
        assert!(validate_coin_type("sui::SUI").is_err());
        assert!(validate_coin_type("0x2::::SUI").is_err());
    }
}
