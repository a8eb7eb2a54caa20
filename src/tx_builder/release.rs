//! Destination-side release message for the burn flow
//!
//! Instruction order is fixed:
//! 1. `advance_nonce_account` (durable nonce, user is authority)
//! 2. `create_associated_token_account_idempotent` for the recipient
//! 3. `transfer_checked` from the custodian's token account
//!
//! The user pays fees and sits in slot 0; the custodial key owns the tokens
//! and sits in slot 1.

use super::errors::WireError;
use super::wire::{self, SIGNATURE_LEN};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// Slot holding the user's (fee payer, nonce authority) signature
pub const USER_SLOT: usize = 0;
/// Slot holding the custodial key's signature
pub const CUSTODIAN_SLOT: usize = 1;
/// Signatures a release message requires
pub const RELEASE_SIGNER_COUNT: u8 = 2;

/// Inputs for one release transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseParams {
    pub user: Pubkey,
    pub custodian: Pubkey,
    pub nonce_account: Pubkey,
    /// Durable value stored in the nonce account
    pub nonce_blockhash: Hash,
    pub recipient: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

/// User signature over the final message bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPresign {
    pub signature: Signature,
    pub message: Vec<u8>,
}

/// Instructions of a release transfer, in execution order
pub fn release_instructions(params: &ReleaseParams) -> Result<Vec<Instruction>, WireError> {
    let token_program = spl_token::id();
    let source = get_associated_token_address(&params.custodian, &params.mint);
    let destination = get_associated_token_address(&params.recipient, &params.mint);

    let transfer = spl_token::instruction::transfer_checked(
        &token_program,
        &source,
        &params.mint,
        &destination,
        &params.custodian,
        &[],
        params.amount,
        params.decimals,
    )
    .map_err(|e| WireError::instruction_failed("spl_token", e.to_string()))?;

    Ok(vec![
        system_instruction::advance_nonce_account(&params.nonce_account, &params.user),
        create_associated_token_account_idempotent(
            &params.user,
            &params.recipient,
            &params.mint,
            &token_program,
        ),
        transfer,
    ])
}

/// Compile the release message and check the signer layout
pub fn build_release_message(params: &ReleaseParams) -> Result<Message, WireError> {
    let instructions = release_instructions(params)?;
    let message =
        Message::new_with_blockhash(&instructions, Some(&params.user), &params.nonce_blockhash);
    verify_signer_order(&message, &params.user, &params.custodian)?;
    Ok(message)
}

/// Require `[user, custodian, ...]` with exactly two required signatures
pub fn verify_signer_order(
    message: &Message,
    user: &Pubkey,
    custodian: &Pubkey,
) -> Result<(), WireError> {
    let actual = message.header.num_required_signatures;
    if actual != RELEASE_SIGNER_COUNT {
        return Err(WireError::SignerCount {
            expected: RELEASE_SIGNER_COUNT,
            actual,
        });
    }

    for (slot, expected) in [(USER_SLOT, user), (CUSTODIAN_SLOT, custodian)] {
        match message.account_keys.get(slot) {
            Some(found) if found == expected => {}
            found => {
                return Err(WireError::SignerOrder {
                    slot,
                    expected: expected.to_string(),
                    found: found.map(|k| k.to_string()).unwrap_or_default(),
                })
            }
        }
    }
    Ok(())
}

/// Sign the serialized message as the user, before the custodian has signed
pub fn presign_user(message: &Message, user: &Keypair) -> UserPresign {
    let bytes = message.serialize();
    UserPresign {
        signature: user.sign_message(&bytes),
        message: bytes,
    }
}

/// Decode message bytes produced by [`presign_user`]
pub fn decode_message(bytes: &[u8]) -> Result<Message, WireError> {
    bincode::deserialize(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// Assemble the broadcastable transaction after checking both signatures
/// against their slot's key
pub fn assemble_release(
    message: &Message,
    user_signature: &Signature,
    custodian_signature: &Signature,
) -> Result<Vec<u8>, WireError> {
    let bytes = message.serialize();
    let signatures = [user_signature, custodian_signature];

    for (slot, signature) in signatures.iter().enumerate() {
        let key = message
            .account_keys
            .get(slot)
            .ok_or(WireError::SlotOutOfRange {
                slot,
                count: message.account_keys.len(),
            })?;
        if !signature.verify(key.as_ref(), &bytes) {
            return Err(WireError::InvalidSignature { slot });
        }
    }

    Ok(wire::assemble_final(
        &bytes,
        &to_slot(user_signature),
        &to_slot(custodian_signature),
    ))
}

fn to_slot(signature: &Signature) -> [u8; SIGNATURE_LEN] {
    let mut slot = [0u8; SIGNATURE_LEN];
    slot.copy_from_slice(signature.as_ref());
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::transaction::Transaction;

    fn params(user: Pubkey, custodian: Pubkey) -> ReleaseParams {
        ReleaseParams {
            user,
            custodian,
            nonce_account: Pubkey::new_unique(),
            nonce_blockhash: Hash::new_unique(),
            recipient: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            amount: 1_500_000,
            decimals: 6,
        }
    }

    #[test]
    fn test_release_message_layout() {
        let user = Keypair::new();
        let custodian = Keypair::new();
        let p = params(user.pubkey(), custodian.pubkey());

        let message = build_release_message(&p).unwrap();

        assert_eq!(message.header.num_required_signatures, 2);
        assert_eq!(message.account_keys[USER_SLOT], user.pubkey());
        assert_eq!(message.account_keys[CUSTODIAN_SLOT], custodian.pubkey());
        assert_eq!(message.recent_blockhash, p.nonce_blockhash);
        assert_eq!(message.instructions.len(), 3);

        let first_program = message.account_keys[message.instructions[0].program_id_index as usize];
        assert_eq!(first_program, solana_sdk::system_program::id());
    }

    #[test]
    fn test_signer_order_violation_detected() {
        let user = Pubkey::new_unique();
        let custodian = Pubkey::new_unique();
        let message = build_release_message(&params(user, custodian)).unwrap();

        let err = verify_signer_order(&message, &custodian, &user).unwrap_err();
        assert!(matches!(err, WireError::SignerOrder { slot: 0, .. }));
    }

    #[test]
    fn test_presign_survives_custodian_signature() {
        let user = Keypair::new();
        let custodian = Keypair::new();
        let message = build_release_message(&params(user.pubkey(), custodian.pubkey())).unwrap();

        let presign = presign_user(&message, &user);
        let custodian_signature = custodian.sign_message(&presign.message);
        let decoded = decode_message(&presign.message).unwrap();
        assert_eq!(decoded, message);

        let wire = assemble_release(&decoded, &presign.signature, &custodian_signature).unwrap();

        let tx: Transaction = bincode::deserialize(&wire).unwrap();
        assert_eq!(tx.signatures, vec![presign.signature, custodian_signature]);
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_swapped_signatures_rejected() {
        let user = Keypair::new();
        let custodian = Keypair::new();
        let message = build_release_message(&params(user.pubkey(), custodian.pubkey())).unwrap();
        let presign = presign_user(&message, &user);
        let custodian_signature = custodian.sign_message(&presign.message);

        assert_eq!(
            assemble_release(&message, &custodian_signature, &presign.signature),
            Err(WireError::InvalidSignature { slot: 0 })
        );
    }
}
