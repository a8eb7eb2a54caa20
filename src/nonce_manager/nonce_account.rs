//! Per-wallet durable nonce accounts
//!
//! Each user wallet owns exactly one nonce account at an address derived from
//! the wallet and a fixed seed, so the address is known without touching the
//! network. [`NonceAccountManager::ensure`] is safe to call repeatedly and
//! concurrently for the same wallet.

use super::nonce_errors::{NonceError, NonceResult};
use super::nonce_retry::{with_blockhash_retry, BlockhashRetryPolicy};
use crate::metrics::metrics;
use crate::rpc_manager::{SolanaLedger, SolanaRpcError};

use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_program,
    transaction::Transaction,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Seed mixed with the wallet address to derive its nonce account
pub const DEFAULT_NONCE_SEED: &str = "bridge-nonce";

/// Flat fee budgeted for the create+initialize transaction
pub const DEFAULT_CREATE_FEE_LAMPORTS: u64 = 5_000;

/// On-chain size of a nonce account:
/// `[version u32][state u32][authority 32][durable nonce 32][lamports_per_signature u64]`
pub const NONCE_ACCOUNT_SIZE: usize = 80;

const STATE_OFFSET: usize = 4;
const AUTHORITY_OFFSET: usize = 8;
const BLOCKHASH_OFFSET: usize = 40;

/// On-chain size of a nonce account
pub fn nonce_account_size() -> usize {
    NONCE_ACCOUNT_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceAccountState {
    Uninitialized,
    Initialized,
}

/// Decoded nonce account
#[derive(Debug, Clone, PartialEq)]
pub struct NonceAccount {
    pub address: Pubkey,
    pub state: NonceAccountState,
    pub authority: Option<Pubkey>,
    /// Durable value borrowed as the transaction's recent blockhash
    pub blockhash: Option<Hash>,
}

impl NonceAccount {
    /// Require an initialized nonce controlled by `authority`, returning its durable blockhash
    pub fn durable_blockhash_for(&self, authority: &Pubkey) -> NonceResult<Hash> {
        match (self.state, self.authority, self.blockhash) {
            (NonceAccountState::Initialized, Some(actual), Some(blockhash)) => {
                if actual != *authority {
                    return Err(NonceError::AuthorityMismatch {
                        account: self.address,
                        expected: *authority,
                        actual,
                    });
                }
                Ok(blockhash)
            }
            _ => Err(NonceError::NotInitialized(self.address)),
        }
    }
}

/// Result of [`NonceAccountManager::ensure`]
#[derive(Debug, Clone, PartialEq)]
pub enum NonceEnsured {
    /// This call created and initialized the account
    Created { address: Pubkey, signature: Signature },
    /// The account was already initialized (or a concurrent call won the race)
    Existing { address: Pubkey },
}

impl NonceEnsured {
    pub fn address(&self) -> Pubkey {
        match self {
            NonceEnsured::Created { address, .. } | NonceEnsured::Existing { address } => *address,
        }
    }
}

/// Decode raw account data into a [`NonceAccount`]
pub fn parse_nonce_account(address: Pubkey, account: &Account) -> NonceResult<NonceAccount> {
    if account.owner != system_program::id() {
        return Err(NonceError::InvalidNonceAccount(format!(
            "{} is owned by {}, not the system program",
            address, account.owner
        )));
    }

    let data = &account.data;
    if data.len() < NONCE_ACCOUNT_SIZE {
        return Err(NonceError::InvalidNonceAccount(format!(
            "{} holds {} bytes, expected {}",
            address,
            data.len(),
            NONCE_ACCOUNT_SIZE
        )));
    }

    let read_u32 = |offset: usize| {
        let mut word = [0u8; 4];
        word.copy_from_slice(&data[offset..offset + 4]);
        u32::from_le_bytes(word)
    };

    match read_u32(STATE_OFFSET) {
        0 => Ok(NonceAccount {
            address,
            state: NonceAccountState::Uninitialized,
            authority: None,
            blockhash: None,
        }),
        1 => {
            let mut authority = [0u8; 32];
            authority.copy_from_slice(&data[AUTHORITY_OFFSET..AUTHORITY_OFFSET + 32]);
            let mut blockhash = [0u8; 32];
            blockhash.copy_from_slice(&data[BLOCKHASH_OFFSET..BLOCKHASH_OFFSET + 32]);
            Ok(NonceAccount {
                address,
                state: NonceAccountState::Initialized,
                authority: Some(Pubkey::new_from_array(authority)),
                blockhash: Some(Hash::new_from_array(blockhash)),
            })
        }
        other => Err(NonceError::InvalidNonceAccount(format!(
            "{} has unknown nonce state tag {}",
            address, other
        ))),
    }
}

/// Creates and tracks one durable nonce account per user wallet
pub struct NonceAccountManager {
    ledger: Arc<dyn SolanaLedger>,
    seed: String,
    create_fee_lamports: u64,
    retry: BlockhashRetryPolicy,
}

impl NonceAccountManager {
    pub fn new(
        ledger: Arc<dyn SolanaLedger>,
        seed: impl Into<String>,
        create_fee_lamports: u64,
        retry: BlockhashRetryPolicy,
    ) -> Self {
        Self {
            ledger,
            seed: seed.into(),
            create_fee_lamports,
            retry,
        }
    }

    /// Deterministic nonce address for a wallet (no network call)
    pub fn derive_address(&self, wallet: &Pubkey) -> NonceResult<Pubkey> {
        Pubkey::create_with_seed(wallet, &self.seed, &system_program::id())
            .map_err(|e| NonceError::Derivation(e.to_string()))
    }

    /// Fetch and decode a nonce account, `None` if absent
    pub async fn fetch(&self, address: &Pubkey) -> NonceResult<Option<NonceAccount>> {
        match self.ledger.get_account(address).await? {
            Some(account) => parse_nonce_account(*address, &account).map(Some),
            None => Ok(None),
        }
    }

    /// Make sure `wallet` has an initialized nonce account, creating it if needed
    #[instrument(skip(self, wallet), fields(wallet = %wallet.pubkey()))]
    pub async fn ensure(&self, wallet: &Keypair) -> NonceResult<NonceEnsured> {
        let authority = wallet.pubkey();
        let address = self.derive_address(&authority)?;

        if let Some(existing) = self.fetch(&address).await? {
            return match existing.state {
                NonceAccountState::Initialized => {
                    debug!(nonce = %address, "Nonce account already initialized");
                    Ok(NonceEnsured::Existing { address })
                }
                NonceAccountState::Uninitialized => Err(NonceError::NotInitialized(address)),
            };
        }

        let rent = self
            .ledger
            .minimum_balance_for_rent_exemption(nonce_account_size())
            .await?;
        let required = rent + self.create_fee_lamports;
        let available = self.ledger.get_balance(&authority).await?;
        if available < required {
            return Err(NonceError::InsufficientFunds {
                required,
                available,
            });
        }

        let instructions = system_instruction::create_nonce_account_with_seed(
            &authority,
            &address,
            &authority,
            &self.seed,
            &authority,
            rent,
        );

        let ledger = &self.ledger;
        let sent = with_blockhash_retry("create_nonce_account", &self.retry, || {
            let instructions = &instructions;
            async move {
                let blockhash = ledger.latest_blockhash().await?;
                let mut tx = Transaction::new_with_payer(instructions, Some(&authority));
                tx.try_sign(&[wallet], blockhash)
                    .map_err(|e| SolanaRpcError::Signing(e.to_string()))?;
                ledger.send_and_confirm(&tx).await
            }
        })
        .await;

        match sent {
            Ok(signature) => {
                metrics().nonce_accounts_created.inc();
                info!(nonce = %address, signature = %signature, "Nonce account created");
                Ok(NonceEnsured::Created { address, signature })
            }
            Err(SolanaRpcError::AccountAlreadyInUse { .. }) => {
                debug!(nonce = %address, "Nonce account created concurrently");
                Ok(NonceEnsured::Existing { address })
            }
            Err(e) if e.is_retryable() => {
                warn!(nonce = %address, error = %e, "Nonce account not created, safe to retry");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
