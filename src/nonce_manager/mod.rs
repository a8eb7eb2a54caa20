//! Nonce Manager Module
//!
//! Durable nonce accounts for user wallets and the blockhash-retry send path.

pub mod nonce_account;
pub mod nonce_errors;
pub mod nonce_retry;

pub use nonce_account::{
    nonce_account_size, parse_nonce_account, NonceAccount, NonceAccountManager,
    NonceAccountState, NonceEnsured, DEFAULT_CREATE_FEE_LAMPORTS, DEFAULT_NONCE_SEED,
    NONCE_ACCOUNT_SIZE,
};
pub use nonce_errors::{NonceError, NonceResult};
pub use nonce_retry::{with_blockhash_retry, BlockhashRetryPolicy, LivenessError};
