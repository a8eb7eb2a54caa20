use solana_client::client_error::ClientError;
use solana_sdk::instruction::InstructionError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// Solana RPC error taxonomy
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolanaRpcError {
    /// The recent blockhash (or nonce value) referenced by the transaction is no longer valid
    #[error("Blockhash expired: {message}")]
    BlockhashExpired { message: String },

    /// Transport-level errors (network, connection, timeout)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The target account already exists (system program `AccountAlreadyInUse`)
    #[error("Account already in use: {message}")]
    AccountAlreadyInUse { message: String },

    /// Fee payer cannot cover the transaction
    #[error("Insufficient funds: {message}")]
    InsufficientFunds { message: String },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (code: {code:?})")]
    RpcResponse { message: String, code: Option<i64> },

    /// Transaction rejected by the runtime
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Local signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Raw bytes did not decode into a transaction
    #[error("Decode error: {0}")]
    Decode(String),
}

impl SolanaRpcError {
    /// Stale ledger-liveness token: the transaction must be rebuilt with a fresh blockhash
    pub fn is_blockhash_expired(&self) -> bool {
        matches!(self, SolanaRpcError::BlockhashExpired { .. })
    }

    /// Check if this error is retryable without rebuilding the transaction
    pub fn is_retryable(&self) -> bool {
        match self {
            SolanaRpcError::Transport { .. } => true,
            SolanaRpcError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
            _ => false,
        }
    }

    /// Create from ClientError, classifying by typed transaction error first and message second
    pub fn from_client_error(err: ClientError) -> Self {
        let message = err.to_string();

        if let Some(tx_err) = err.get_transaction_error() {
            return Self::from_transaction_error(tx_err, message);
        }

        let err_str = message.to_lowercase();
        if err_str.contains("blockhash not found")
            || err_str.contains("block height exceeded")
            || err_str.contains("transaction expired")
            || err_str.contains("advance nonce")
        {
            SolanaRpcError::BlockhashExpired { message }
        } else if err_str.contains("already in use") {
            SolanaRpcError::AccountAlreadyInUse { message }
        } else if err_str.contains("insufficient funds")
            || err_str.contains("insufficient lamports")
        {
            SolanaRpcError::InsufficientFunds { message }
        } else if err_str.contains("timeout")
            || err_str.contains("timed out")
            || err_str.contains("connection")
            || err_str.contains("error sending request")
        {
            SolanaRpcError::Transport { message }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(',').parse::<i64>().ok());

            SolanaRpcError::RpcResponse { message, code }
        }
    }

    fn from_transaction_error(tx_err: TransactionError, message: String) -> Self {
        match tx_err {
            TransactionError::BlockhashNotFound => SolanaRpcError::BlockhashExpired { message },
            TransactionError::InsufficientFundsForFee
            | TransactionError::InsufficientFundsForRent { .. } => {
                SolanaRpcError::InsufficientFunds { message }
            }
            // Write-lock contention; the transaction did not run
            TransactionError::AccountInUse => SolanaRpcError::Transport { message },
            // System program `AccountAlreadyInUse`
            TransactionError::InstructionError(_, InstructionError::Custom(0)) => {
                SolanaRpcError::AccountAlreadyInUse { message }
            }
            other => {
                let text = other.to_string();
                // SystemError::AccountAlreadyInUse surfaces as custom program error 0x0
                if message.to_lowercase().contains("already in use") {
                    SolanaRpcError::AccountAlreadyInUse { message }
                } else {
                    SolanaRpcError::Transaction(text)
                }
            }
        }
    }
}

impl From<ClientError> for SolanaRpcError {
    fn from(err: ClientError) -> Self {
        Self::from_client_error(err)
    }
}

/// Result type for Solana RPC operations
pub type RpcResult<T> = Result<T, SolanaRpcError>;
