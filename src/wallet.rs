//! User wallet directory
//!
//! Resolves a user id to the Solana and Sui keys the service signs with on
//! that user's behalf. Keys live under `<keystore>/<userId>/`:
//! `solana.json` (64-byte keypair, JSON array or raw) and `sui.key`
//! (32-byte ed25519 secret, hex or JSON array).

use crate::sui::SuiKeypair;
use dashmap::DashMap;
use solana_sdk::signature::Keypair;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const SOLANA_KEY_FILE: &str = "solana.json";
const SUI_KEY_FILE: &str = "sui.key";
const MAX_USER_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Solana,
    Sui,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Solana => f.write_str("solana"),
            Chain::Sui => f.write_str("sui"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// No key stored for this user on this chain
    #[error("No {chain} wallet provisioned for user {user_id}")]
    NotProvisioned { user_id: String, chain: Chain },

    #[error("Invalid user id {0:?}")]
    InvalidUserId(String),

    #[error("Invalid {chain} key for user {user_id}: {reason}")]
    InvalidKey {
        user_id: String,
        chain: Chain,
        reason: String,
    },

    #[error("Keystore I/O error: {0}")]
    Io(String),
}

impl WalletError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WalletError::NotProvisioned { .. })
    }
}

/// `[A-Za-z0-9_-]{1,64}`
pub fn validate_user_id(user_id: &str) -> Result<(), WalletError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(WalletError::InvalidUserId(user_id.to_string()))
    }
}

/// Wallet resolution seam
pub trait WalletDirectory: Send + Sync {
    fn solana_keypair(&self, user_id: &str) -> Result<Arc<Keypair>, WalletError>;
    fn sui_keypair(&self, user_id: &str) -> Result<Arc<SuiKeypair>, WalletError>;
}

/// File-backed [`WalletDirectory`] with an in-memory cache of loaded keys
pub struct KeystoreDirectory {
    root: PathBuf,
    solana: DashMap<String, Arc<Keypair>>,
    sui: DashMap<String, Arc<SuiKeypair>>,
}

impl KeystoreDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            solana: DashMap::new(),
            sui: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_key_file(&self, user_id: &str, chain: Chain, file: &str) -> Result<Vec<u8>, WalletError> {
        validate_user_id(user_id)?;
        let path = self.root.join(user_id).join(file);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(WalletError::NotProvisioned {
                user_id: user_id.to_string(),
                chain,
            }),
            Err(e) => Err(WalletError::Io(format!("{}: {}", path.display(), e))),
        }
    }
}

fn invalid(user_id: &str, chain: Chain, reason: impl Into<String>) -> WalletError {
    WalletError::InvalidKey {
        user_id: user_id.to_string(),
        chain,
        reason: reason.into(),
    }
}

/// 64 raw bytes, or a JSON array of 64 numbers; all-zero keys rejected
pub fn parse_solana_keypair(user_id: &str, bytes: &[u8]) -> Result<Keypair, WalletError> {
    let raw: Vec<u8> = if bytes.len() == 64 {
        bytes.to_vec()
    } else {
        serde_json::from_slice(bytes).map_err(|e| invalid(user_id, Chain::Solana, e.to_string()))?
    };
    if raw.len() != 64 {
        return Err(invalid(
            user_id,
            Chain::Solana,
            format!("expected 64 bytes, got {}", raw.len()),
        ));
    }
    if raw.iter().all(|&b| b == 0) {
        return Err(invalid(user_id, Chain::Solana, "all-zero key rejected"));
    }
    Keypair::try_from(raw.as_slice()).map_err(|e| invalid(user_id, Chain::Solana, e.to_string()))
}

/// Hex (optionally 0x-prefixed) or a JSON array of 32 numbers
pub fn parse_sui_secret(user_id: &str, bytes: &[u8]) -> Result<SuiKeypair, WalletError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| invalid(user_id, Chain::Sui, e.to_string()))?
        .trim();
    let secret: Vec<u8> = if text.starts_with('[') {
        serde_json::from_str(text).map_err(|e| invalid(user_id, Chain::Sui, e.to_string()))?
    } else {
        hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| invalid(user_id, Chain::Sui, e.to_string()))?
    };
    SuiKeypair::from_secret(&secret).map_err(|e| invalid(user_id, Chain::Sui, e.to_string()))
}

impl WalletDirectory for KeystoreDirectory {
    fn solana_keypair(&self, user_id: &str) -> Result<Arc<Keypair>, WalletError> {
        if let Some(cached) = self.solana.get(user_id) {
            return Ok(Arc::clone(cached.value()));
        }
        let bytes = self.read_key_file(user_id, Chain::Solana, SOLANA_KEY_FILE)?;
        let keypair = Arc::new(parse_solana_keypair(user_id, &bytes)?);
        debug!(user_id, "Loaded Solana keypair");
        self.solana.insert(user_id.to_string(), Arc::clone(&keypair));
        Ok(keypair)
    }

    fn sui_keypair(&self, user_id: &str) -> Result<Arc<SuiKeypair>, WalletError> {
        if let Some(cached) = self.sui.get(user_id) {
            return Ok(Arc::clone(cached.value()));
        }
        let bytes = self.read_key_file(user_id, Chain::Sui, SUI_KEY_FILE)?;
        let keypair = Arc::new(parse_sui_secret(user_id, &bytes)?);
        debug!(user_id, "Loaded Sui keypair");
        self.sui.insert(user_id.to_string(), Arc::clone(&keypair));
        Ok(keypair)
    }
}
