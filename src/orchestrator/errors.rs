use crate::attestation::ServiceError;
use crate::auth::AuthError;
use crate::nonce_manager::NonceError;
use crate::rpc_manager::SolanaRpcError;
use crate::sui::{PollError, SuiError};
use crate::tx_builder::WireError;
use crate::wallet::WalletError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Every failure a bridge operation can surface to its caller
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    /// Malformed or missing input; nothing was sent to either chain
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    /// The wallet's nonce account is already initialized
    #[error("Nonce account {address} already exists")]
    NonceExists { address: Pubkey },

    #[error(transparent)]
    Solana(#[from] SolanaRpcError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Sui(#[from] SuiError),

    #[error("Enclave error: {0}")]
    Enclave(ServiceError),

    #[error("Solver error: {0}")]
    Solver(ServiceError),

    #[error(transparent)]
    ThresholdSignature(#[from] PollError),
}

impl BridgeError {
    pub fn validation(reason: impl Into<String>) -> Self {
        BridgeError::Validation(reason.into())
    }

    /// Machine-readable code for callers to branch on
    pub fn code(&self) -> Option<&'static str> {
        match self {
            BridgeError::Validation(_) => Some("VALIDATION"),
            BridgeError::Auth(AuthError::Forbidden { .. }) => Some("FORBIDDEN"),
            BridgeError::Auth(_) => Some("UNAUTHORIZED"),
            BridgeError::Wallet(WalletError::NotProvisioned { .. }) => Some("WALLET_NOT_FOUND"),
            BridgeError::Wallet(WalletError::InvalidUserId(_)) => Some("VALIDATION"),
            BridgeError::Wallet(_) => None,
            BridgeError::Nonce(NonceError::InsufficientFunds { .. }) => Some("INSUFFICIENT_SOL"),
            BridgeError::Nonce(NonceError::Rpc(e)) | BridgeError::Solana(e)
                if e.is_blockhash_expired() =>
            {
                Some("BLOCKHASH_EXPIRED")
            }
            BridgeError::Nonce(_) | BridgeError::Solana(_) => None,
            BridgeError::NonceExists { .. } => Some("NONCE_EXISTS"),
            BridgeError::Wire(WireError::Decode(_))
            | BridgeError::Wire(WireError::SignerOrder { .. })
            | BridgeError::Wire(WireError::SignerCount { .. })
            | BridgeError::Wire(WireError::InvalidSignature { slot: 0 }) => Some("VALIDATION"),
            BridgeError::Wire(_) => None,
            BridgeError::Sui(e) if e.unresolved_digest().is_some() => Some("OBJECT_EXTRACTION"),
            BridgeError::Sui(_) => None,
            BridgeError::Enclave(_) => Some("ENCLAVE_ERROR"),
            BridgeError::Solver(_) => Some("SOLVER_ERROR"),
            BridgeError::ThresholdSignature(PollError::Timeout { .. }) => Some("SIGNATURE_PENDING"),
            BridgeError::ThresholdSignature(PollError::Cancelled) => Some("CANCELLED"),
            BridgeError::ThresholdSignature(_) => None,
        }
    }

    /// Short label for logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation",
            BridgeError::Auth(_) => "auth",
            BridgeError::Wallet(_) => "wallet",
            BridgeError::Nonce(_) | BridgeError::NonceExists { .. } => "nonce",
            BridgeError::Solana(_) => "solana",
            BridgeError::Wire(_) => "wire",
            BridgeError::Sui(_) => "sui",
            BridgeError::Enclave(_) => "enclave",
            BridgeError::Solver(_) => "solver",
            BridgeError::ThresholdSignature(_) => "threshold",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sui::{ObjectId, ObjectKind};
    use crate::wallet::Chain;

    #[test]
    fn test_codes_for_resource_and_funds_failures() {
        assert_eq!(
            BridgeError::from(WalletError::NotProvisioned {
                user_id: "u".to_string(),
                chain: Chain::Solana
            })
            .code(),
            Some("WALLET_NOT_FOUND")
        );
        assert_eq!(
            BridgeError::from(NonceError::InsufficientFunds {
                required: 2,
                available: 1
            })
            .code(),
            Some("INSUFFICIENT_SOL")
        );
        assert_eq!(
            BridgeError::NonceExists {
                address: Pubkey::new_unique()
            }
            .code(),
            Some("NONCE_EXISTS")
        );
    }

    #[test]
    fn test_codes_for_liveness_and_services() {
        let stale = SolanaRpcError::BlockhashExpired {
            message: "Blockhash not found".to_string(),
        };
        assert_eq!(BridgeError::from(stale.clone()).code(), Some("BLOCKHASH_EXPIRED"));
        assert_eq!(
            BridgeError::from(NonceError::Rpc(stale)).code(),
            Some("BLOCKHASH_EXPIRED")
        );
        assert_eq!(
            BridgeError::from(SolanaRpcError::Transport {
                message: "reset".to_string()
            })
            .code(),
            None
        );

        let rejected = ServiceError::Rejected {
            service: "solver",
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(BridgeError::Solver(rejected.clone()).code(), Some("SOLVER_ERROR"));
        assert_eq!(BridgeError::Enclave(rejected).code(), Some("ENCLAVE_ERROR"));
    }

    #[test]
    fn test_codes_for_polling_and_extraction() {
        let timeout = PollError::Timeout {
            sign_id: ObjectId::parse("0x1").unwrap(),
            polls: 40,
        };
        assert_eq!(BridgeError::from(timeout).code(), Some("SIGNATURE_PENDING"));
        assert_eq!(BridgeError::from(PollError::Cancelled).code(), Some("CANCELLED"));
        assert_eq!(
            BridgeError::from(SuiError::MissingObject {
                kind: ObjectKind::BurnCap,
                digest: "D".to_string()
            })
            .code(),
            Some("OBJECT_EXTRACTION")
        );
        assert_eq!(
            BridgeError::from(AuthError::Forbidden {
                principal: "a".to_string(),
                requested: "b".to_string()
            })
            .code(),
            Some("FORBIDDEN")
        );
        assert_eq!(BridgeError::from(AuthError::MissingToken).code(), Some("UNAUTHORIZED"));
    }
}
