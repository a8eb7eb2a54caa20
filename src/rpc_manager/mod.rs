//! Solana ledger access
//!
//! The orchestrator talks to Solana only through [`SolanaLedger`], so flows can
//! be exercised against an in-memory ledger in tests.

pub mod rpc_errors;

pub use rpc_errors::{RpcResult, SolanaRpcError};

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::debug;

/// Minimal Solana surface used by the bridge flows
#[async_trait]
pub trait SolanaLedger: Send + Sync {
    /// Fetch an account, `None` if it does not exist
    async fn get_account(&self, address: &Pubkey) -> RpcResult<Option<Account>>;

    /// Lamport balance of an address
    async fn get_balance(&self, address: &Pubkey) -> RpcResult<u64>;

    /// Rent-exempt minimum for an account of `data_len` bytes
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> RpcResult<u64>;

    /// Fresh recent blockhash
    async fn latest_blockhash(&self) -> RpcResult<Hash>;

    /// Submit a signed transaction and wait for confirmation
    async fn send_and_confirm(&self, transaction: &Transaction) -> RpcResult<Signature>;

    /// Submit pre-assembled wire bytes and wait for confirmation
    async fn send_wire(&self, wire: &[u8]) -> RpcResult<Signature> {
        let transaction: Transaction = bincode::deserialize(wire)
            .map_err(|e| SolanaRpcError::Decode(e.to_string()))?;
        self.send_and_confirm(&transaction).await
    }
}

/// [`SolanaLedger`] backed by the nonblocking JSON-RPC client
#[derive(Clone)]
pub struct SolanaRpc {
    client: Arc<RpcClient>,
}

impl SolanaRpc {
    pub fn new(url: &str) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(
                url.to_string(),
                CommitmentConfig::confirmed(),
            )),
        }
    }
}

#[async_trait]
impl SolanaLedger for SolanaRpc {
    async fn get_account(&self, address: &Pubkey) -> RpcResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_balance(&self, address: &Pubkey) -> RpcResult<u64> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> RpcResult<u64> {
        Ok(self
            .client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await?)
    }

    async fn latest_blockhash(&self) -> RpcResult<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> RpcResult<Signature> {
        let signature = self.client.send_and_confirm_transaction(transaction).await?;
        debug!(signature = %signature, "Transaction confirmed");
        Ok(signature)
    }
}
