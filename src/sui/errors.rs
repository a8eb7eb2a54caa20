use super::types::ObjectKind;
use thiserror::Error;

/// Sui collaborator errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SuiError {
    /// Network-level failure reaching the fullnode
    #[error("Sui transport error: {0}")]
    Transport(String),

    /// JSON-RPC error object returned by the fullnode
    #[error("Sui RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Transaction executed but its effects report failure
    #[error("Sui transaction {digest} failed: {status}")]
    Execution { digest: String, status: String },

    /// No created object of the expected type in a successful transaction
    #[error("Transaction {digest} created no {kind} object")]
    MissingObject { kind: ObjectKind, digest: String },

    /// More than one created object of the expected type
    #[error("Transaction {digest} created {count} {kind} objects, expected exactly one")]
    AmbiguousObject {
        kind: ObjectKind,
        count: usize,
        digest: String,
    },

    /// Response or object content did not have the expected shape
    #[error("Sui decode error: {0}")]
    Decode(String),

    /// Key material or signing failure
    #[error("Sui signing error: {0}")]
    Signing(String),
}

impl SuiError {
    /// Check if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        match self {
            SuiError::Transport(_) => true,
            // -32603 internal error, -32050+ server busy range
            SuiError::Rpc { code, .. } => *code == -32603 || (-32099..=-32000).contains(code),

            SuiError::Execution { .. } => false,
            SuiError::MissingObject { .. } => false,
            SuiError::AmbiguousObject { .. } => false,
            SuiError::Decode(_) => false,
            SuiError::Signing(_) => false,
        }
    }

    /// Digest of a committed transaction whose created objects could not be resolved
    pub fn unresolved_digest(&self) -> Option<&str> {
        match self {
            SuiError::MissingObject { digest, .. } | SuiError::AmbiguousObject { digest, .. } => {
                Some(digest)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SuiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SuiError::Decode(err.to_string())
        } else {
            SuiError::Transport(err.to_string())
        }
    }
}

/// Result type for Sui operations
pub type SuiResult<T> = Result<T, SuiError>;
