//! Mint flow and the standalone nonce / vote operations

use super::errors::BridgeError;
use super::phase::{FlowFailure, PhaseTracker};
use super::{validate_coin_type, BridgeServices};
use crate::attestation::VoteRequest;
use crate::nonce_manager::NonceEnsured;
use crate::sui::{MintRequestArgs, ObjectId, RequestKind};
use crate::wallet::validate_user_id;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Signature, Signer};
use tracing::{info, instrument};

const FLOW: &str = "mint";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    pub user_id: String,
    pub source_chain: u64,
    pub source_token: Vec<u8>,
    pub source_decimals: u8,
    pub source_address: Vec<u8>,
    pub source_amount: u64,
    pub coin_type: String,
    /// Base58 signature of the source-chain deposit
    pub deposit_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    /// Digest of the vote + execute transaction
    pub digest: String,
    pub request_id: ObjectId,
    pub mint_cap_id: ObjectId,
    pub create_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteMintParams {
    pub user_id: String,
    pub request_id: ObjectId,
    pub deposit_signature: String,
}

fn decode_deposit_signature(deposit_signature: &str) -> Result<Vec<u8>, BridgeError> {
    match bs58::decode(deposit_signature.trim()).into_vec() {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(BridgeError::validation(
            "depositSignature must be a non-empty base58 string",
        )),
    }
}

fn validate(params: &MintParams) -> Result<Vec<u8>, BridgeError> {
    if params.source_amount == 0 {
        return Err(BridgeError::validation("sourceAmount must be positive"));
    }
    if params.source_token.is_empty() {
        return Err(BridgeError::validation("sourceToken must not be empty"));
    }
    if params.source_address.is_empty() {
        return Err(BridgeError::validation("sourceAddress must not be empty"));
    }
    validate_coin_type(&params.coin_type)?;
    decode_deposit_signature(&params.deposit_signature)
}

/// Create a mint request, have the enclave attest the deposit, then vote and
/// execute in one transaction
#[instrument(skip_all, fields(user_id = %params.user_id, amount = params.source_amount))]
pub async fn run_mint(
    services: &BridgeServices,
    params: &MintParams,
) -> Result<MintOutcome, FlowFailure> {
    let mut tracker = PhaseTracker::start(FLOW);

    tracker.step("setup");
    let deposit_signature = validate(params).map_err(|e| tracker.fail(e))?;
    let sui_signer = services
        .wallets
        .sui_keypair(&params.user_id)
        .map_err(|e| tracker.fail(e))?;

    tracker.step("create_request");
    let created = services
        .requests
        .create_mint_request(
            &sui_signer,
            &params.coin_type,
            &MintRequestArgs {
                source_chain: params.source_chain,
                source_token: params.source_token.clone(),
                source_decimals: params.source_decimals,
                source_address: params.source_address.clone(),
                source_amount: params.source_amount,
                deposit_signature,
            },
        )
        .await
        .map_err(|e| tracker.fail(e))?;
    tracker.committed(RequestKind::Mint, &created);

    tracker.step("vote_enclave");
    let data = services
        .requests
        .fetch_request_data(&created.request_id)
        .await
        .map_err(|e| tracker.fail(e))?;
    let vote = services
        .enclave
        .vote(&VoteRequest::from_request_data(
            RequestKind::Mint,
            created.request_id.as_str(),
            &data,
            Some(params.deposit_signature.trim()),
        ))
        .await
        .map_err(|e| tracker.fail(BridgeError::Enclave(e)))?;

    tracker.step("execute_request");
    let calls = services.requests.calls();
    let batch = [
        calls.vote_mint(&created.request_id, &vote.signature, vote.timestamp_ms),
        calls.execute_mint(&params.coin_type, &created.request_id, &created.cap_id),
    ];
    let executed = services
        .requests
        .ledger()
        .execute(&sui_signer, &batch, services.requests.gas_budget())
        .await
        .map_err(|e| tracker.fail(e))?;

    info!(
        request_id = %created.request_id,
        digest = %executed.digest,
        "Mint request executed"
    );
    tracker.complete();

    Ok(MintOutcome {
        digest: executed.digest,
        request_id: created.request_id,
        mint_cap_id: created.cap_id,
        create_digest: created.digest,
    })
}

/// Record an enclave vote on an existing mint request without executing it
#[instrument(skip_all, fields(user_id = %params.user_id, request_id = %params.request_id))]
pub async fn vote_mint(
    services: &BridgeServices,
    params: &VoteMintParams,
) -> Result<String, BridgeError> {
    decode_deposit_signature(&params.deposit_signature)?;
    let sui_signer = services.wallets.sui_keypair(&params.user_id)?;

    let data = services
        .requests
        .fetch_request_data(&params.request_id)
        .await?;
    let vote = services
        .enclave
        .vote(&VoteRequest::from_request_data(
            RequestKind::Mint,
            params.request_id.as_str(),
            &data,
            Some(params.deposit_signature.trim()),
        ))
        .await
        .map_err(BridgeError::Enclave)?;

    let call = services
        .requests
        .calls()
        .vote_mint(&params.request_id, &vote.signature, vote.timestamp_ms);
    let executed = services
        .requests
        .ledger()
        .execute(&sui_signer, &[call], services.requests.gas_budget())
        .await?;

    info!(digest = %executed.digest, "Mint vote recorded");
    Ok(executed.digest)
}

/// Create the user's durable nonce account.
///
/// An already-initialized account is reported as [`BridgeError::NonceExists`]
/// carrying its address.
#[instrument(skip(services))]
pub async fn create_nonce(
    services: &BridgeServices,
    user_id: &str,
) -> Result<(Pubkey, Signature), BridgeError> {
    validate_user_id(user_id)?;
    let wallet = services.wallets.solana_keypair(user_id)?;

    match services.nonces.ensure(&wallet).await? {
        NonceEnsured::Created { address, signature } => {
            info!(wallet = %wallet.pubkey(), nonce = %address, "Nonce account ready");
            Ok((address, signature))
        }
        NonceEnsured::Existing { address } => Err(BridgeError::NonceExists { address }),
    }
}
