use crate::rpc_manager::SolanaRpcError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Nonce Manager specific errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NonceError {
    /// Wallet cannot fund rent exemption plus the creation fee
    #[error("Insufficient funds for nonce account: required {required} lamports, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Nonce account not found or invalid
    #[error("Nonce account error: {0}")]
    InvalidNonceAccount(String),

    /// Account exists but holds no durable nonce yet
    #[error("Nonce account {0} is not initialized")]
    NotInitialized(Pubkey),

    /// Nonce is controlled by someone other than the caller
    #[error("Nonce account {account} is controlled by {actual}, expected {expected}")]
    AuthorityMismatch {
        account: Pubkey,
        expected: Pubkey,
        actual: Pubkey,
    },

    /// Seeded address derivation failed
    #[error("Nonce address derivation failed: {0}")]
    Derivation(String),

    /// RPC operation failed
    #[error(transparent)]
    Rpc(#[from] SolanaRpcError),
}

/// Result type for nonce operations
pub type NonceResult<T> = Result<T, NonceError>;
