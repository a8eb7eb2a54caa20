//! Burn flow: Sui-side burn request, Solana-side release
//!
//! `setup -> build_user_presign -> create_request -> {enclave vote || solver
//! cosign} -> execute_request`, then later `await_threshold_signature ->
//! assemble -> broadcast`. The HTTP surface exposes the two halves separately.

use super::errors::BridgeError;
use super::phase::{FlowFailure, Phase, PhaseTracker, RecoveryState};
use super::{validate_coin_type, BridgeServices};
use crate::attestation::{CosignRequest, EnclaveVote, SolverSignature, VoteRequest};
use crate::nonce_manager::NonceError;
use crate::sui::{BurnRequestArgs, ObjectId, ObjectKind, RequestKind, SuiError};
use crate::tx_builder::{
    assemble_release, build_release_message, decode_message, presign_user, verify_signer_order,
    ReleaseParams, UserPresign, WireError, CUSTODIAN_SLOT, USER_SLOT,
};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Signature, Signer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

const FLOW: &str = "burn";
const BROADCAST_FLOW: &str = "broadcast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnParams {
    pub user_id: String,
    pub source_amount: u64,
    /// Solana recipient wallet, 32 bytes
    pub destination_address: Vec<u8>,
    pub nonce_address: Pubkey,
    pub coin_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnOutcome {
    pub create_digest: String,
    pub execute_digest: String,
    pub request_id: ObjectId,
    pub burn_cap_id: ObjectId,
    pub presign_cap_id: ObjectId,
    /// Custodial sign session authorized by the execute transaction
    pub sign_id: ObjectId,
    pub user_signature: Signature,
    /// Serialized release message the user signed
    pub message: Vec<u8>,
}

impl BurnOutcome {
    pub fn recovery(&self) -> RecoveryState {
        RecoveryState {
            kind: RequestKind::Burn,
            request_id: self.request_id.clone(),
            cap_id: self.burn_cap_id.clone(),
            presign_cap_id: Some(self.presign_cap_id.clone()),
            create_digest: self.create_digest.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastParams {
    pub user_id: String,
    pub request_id: ObjectId,
    pub sign_id: ObjectId,
    pub user_signature: Signature,
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledBurn {
    pub burn: BurnOutcome,
    pub solana_signature: Signature,
}

fn validate(params: &BurnParams) -> Result<Pubkey, BridgeError> {
    if params.source_amount == 0 {
        return Err(BridgeError::validation("sourceAmount must be positive"));
    }
    validate_coin_type(&params.coin_type)?;
    Pubkey::try_from(params.destination_address.as_slice()).map_err(|_| {
        BridgeError::validation(format!(
            "destinationAddress must be 32 bytes, got {}",
            params.destination_address.len()
        ))
    })
}

/// Create, attest, and execute a burn request.
///
/// Returns once the custodial sign session is authorized on chain; the
/// release itself is sent by [`broadcast_burn`].
#[instrument(skip_all, fields(user_id = %params.user_id, amount = params.source_amount))]
pub async fn run_burn(
    services: &BridgeServices,
    params: &BurnParams,
) -> Result<BurnOutcome, FlowFailure> {
    let mut tracker = PhaseTracker::start(FLOW);

    tracker.step("setup");
    let recipient = validate(params).map_err(|e| tracker.fail(e))?;
    let user = services
        .wallets
        .solana_keypair(&params.user_id)
        .map_err(|e| tracker.fail(e))?;
    let sui_signer = services
        .wallets
        .sui_keypair(&params.user_id)
        .map_err(|e| tracker.fail(e))?;
    let expected_nonce = services
        .nonces
        .derive_address(&user.pubkey())
        .map_err(|e| tracker.fail(e))?;
    if expected_nonce != params.nonce_address {
        return Err(tracker.fail(BridgeError::validation(format!(
            "nonceAddress {} is not this wallet's nonce account {}",
            params.nonce_address, expected_nonce
        ))));
    }

    tracker.step("build_user_presign");
    let nonce = services
        .nonces
        .fetch(&params.nonce_address)
        .await
        .map_err(|e| tracker.fail(e))?
        .ok_or_else(|| tracker.fail(NonceError::NotInitialized(params.nonce_address)))?;
    let nonce_blockhash = nonce
        .durable_blockhash_for(&user.pubkey())
        .map_err(|e| tracker.fail(e))?;
    let message = build_release_message(&ReleaseParams {
        user: user.pubkey(),
        custodian: services.release.custodian,
        nonce_account: params.nonce_address,
        nonce_blockhash,
        recipient,
        mint: services.release.mint,
        amount: params.source_amount,
        decimals: services.release.decimals,
    })
    .map_err(|e| tracker.fail(e))?;
    let presign = presign_user(&message, &user);
    debug!(user_signature = %presign.signature, "User presigned release message");

    tracker.step("create_request");
    let created = services
        .requests
        .create_burn_request(
            &sui_signer,
            &params.coin_type,
            &BurnRequestArgs {
                source_amount: params.source_amount,
                destination_address: params.destination_address.clone(),
                message: presign.message.clone(),
                user_signature: presign.signature.as_ref().to_vec(),
            },
        )
        .await
        .map_err(|e| tracker.fail(e))?;
    tracker.committed(RequestKind::Burn, &created);
    let presign_cap_id = created.presign_cap_id.clone().ok_or_else(|| {
        tracker.fail(SuiError::MissingObject {
            kind: ObjectKind::PresignCap,
            digest: created.digest.clone(),
        })
    })?;

    tracker.step("attest");
    let (vote, solver_signature) =
        attest_and_cosign(services, &created.request_id, &presign, &user.pubkey())
            .await
            .map_err(|e| tracker.fail(e))?;

    tracker.step("execute_request");
    let calls = services.requests.calls();
    let batch = [
        calls.vote_burn(&created.request_id, &vote.signature, vote.timestamp_ms),
        calls.execute_burn(
            &params.coin_type,
            &created.request_id,
            &created.cap_id,
            &presign_cap_id,
            &solver_signature.0,
        ),
    ];
    let executed = services
        .requests
        .ledger()
        .execute(&sui_signer, &batch, services.requests.gas_budget())
        .await
        .map_err(|e| tracker.fail(e))?;
    let sign_id = services
        .requests
        .schema()
        .find_created(&executed, ObjectKind::SignSession)
        .map_err(|e| tracker.fail(e))?;

    info!(
        request_id = %created.request_id,
        sign_id = %sign_id,
        digest = %executed.digest,
        "Burn request executed"
    );
    tracker.complete();

    Ok(BurnOutcome {
        create_digest: created.digest,
        execute_digest: executed.digest,
        request_id: created.request_id,
        burn_cap_id: created.cap_id,
        presign_cap_id,
        sign_id,
        user_signature: presign.signature,
        message: presign.message,
    })
}

/// Enclave vote and solver co-signature share no inputs and run together
async fn attest_and_cosign(
    services: &BridgeServices,
    request_id: &ObjectId,
    presign: &UserPresign,
    user: &Pubkey,
) -> Result<(EnclaveVote, SolverSignature), BridgeError> {
    let vote = async {
        let data = services
            .requests
            .fetch_request_data(request_id)
            .await
            .map_err(BridgeError::from)?;
        let request =
            VoteRequest::from_request_data(RequestKind::Burn, request_id.as_str(), &data, None);
        services
            .enclave
            .vote(&request)
            .await
            .map_err(BridgeError::Enclave)
    };

    let cosign = async {
        services
            .solver
            .cosign(&CosignRequest {
                request_id: request_id.to_string(),
                message: presign.message.clone(),
                user_signature: presign.signature.as_ref().to_vec(),
                user_address: user.to_string(),
            })
            .await
            .map_err(BridgeError::Solver)
    };

    tokio::try_join!(vote, cosign)
}

/// Wait for the custodial threshold signature, then assemble and send the
/// release transaction.
///
/// The message and user signature are re-checked before polling starts.
/// `sign_id` is bound to the request only through the signature itself: the
/// custodial signature must verify over this exact message, so a session
/// signed for another request fails assembly. `request_id` is carried for
/// tracing; the on-chain program ties sessions to requests.
#[instrument(skip_all, fields(user_id = %params.user_id, request_id = %params.request_id, sign_id = %params.sign_id))]
pub async fn broadcast_burn(
    services: &BridgeServices,
    params: &BroadcastParams,
    cancel: &CancellationToken,
) -> Result<Signature, FlowFailure> {
    let tracker = PhaseTracker::resumed(BROADCAST_FLOW);

    tracker.step("verify_message");
    let user = services
        .wallets
        .solana_keypair(&params.user_id)
        .map_err(|e| tracker.fail(e))?;
    let message = decode_message(&params.message).map_err(|e| tracker.fail(e))?;
    verify_signer_order(&message, &user.pubkey(), &services.release.custodian)
        .map_err(|e| tracker.fail(e))?;
    if !params
        .user_signature
        .verify(user.pubkey().as_ref(), &message.serialize())
    {
        return Err(tracker.fail(WireError::InvalidSignature { slot: USER_SLOT }));
    }

    tracker.step("await_threshold_signature");
    let raw = services
        .poller
        .await_signature(&params.sign_id, cancel)
        .await
        .map_err(|e| tracker.fail(e))?;
    let custodian_signature = Signature::try_from(raw.as_slice())
        .map_err(|_| tracker.fail(WireError::InvalidSignature { slot: CUSTODIAN_SLOT }))?;

    tracker.step("assemble");
    let wire = assemble_release(&message, &params.user_signature, &custodian_signature)
        .map_err(|e| tracker.fail(e))?;

    tracker.step("broadcast");
    let signature = services
        .solana
        .send_wire(&wire)
        .await
        .map_err(|e| tracker.fail(e))?;

    info!(signature = %signature, "Release transaction confirmed");
    tracker.complete();
    Ok(signature)
}

/// Burn then broadcast in one call; a broadcast failure keeps the burn's
/// recovery state
pub async fn run_burn_to_settlement(
    services: &BridgeServices,
    params: &BurnParams,
    cancel: &CancellationToken,
) -> Result<SettledBurn, FlowFailure> {
    let burn = run_burn(services, params).await?;
    let broadcast = BroadcastParams {
        user_id: params.user_id.clone(),
        request_id: burn.request_id.clone(),
        sign_id: burn.sign_id.clone(),
        user_signature: burn.user_signature,
        message: burn.message.clone(),
    };

    match broadcast_burn(services, &broadcast, cancel).await {
        Ok(solana_signature) => Ok(SettledBurn {
            burn,
            solana_signature,
        }),
        Err(failure) => Err(FlowFailure {
            error: failure.error,
            phase: Phase::PostCreate,
            recovery: Some(burn.recovery()),
        }),
    }
}
