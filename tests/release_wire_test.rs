//! Release transactions assembled from raw bytes must decode as ordinary
//! Solana transactions with valid signatures in the expected slots.

use bridge::tx_builder::{
    assemble_placeholder, assemble_release, build_release_message, decode_message,
    extract_signature, insert_signature, message_bytes, presign_user, verify_signer_order,
    ReleaseParams, WireError, CUSTODIAN_SLOT, SIGNATURE_LEN, USER_SLOT,
};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

fn params(user: &Keypair, custodian: &Keypair) -> ReleaseParams {
    ReleaseParams {
        user: user.pubkey(),
        custodian: custodian.pubkey(),
        nonce_account: Pubkey::new_unique(),
        nonce_blockhash: Hash::new_unique(),
        recipient: Pubkey::new_unique(),
        mint: Pubkey::new_unique(),
        amount: 1_000_000,
        decimals: 6,
    }
}

fn raw(signature: &Signature) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(signature.as_ref());
    out
}

#[test]
fn test_presigned_release_decodes_as_signed_transaction() {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let params = params(&user, &custodian);

    let message = build_release_message(&params).unwrap();
    let presign = presign_user(&message, &user);

    // custodian signs the exact bytes that travelled through Sui
    let decoded = decode_message(&presign.message).unwrap();
    assert_eq!(decoded, message);
    let custodian_signature = custodian.sign_message(&presign.message);

    let wire = assemble_release(&decoded, &presign.signature, &custodian_signature).unwrap();
    let tx: Transaction = bincode::deserialize(&wire).unwrap();

    assert_eq!(tx.signatures.len(), 2);
    assert_eq!(tx.signatures[USER_SLOT], presign.signature);
    assert_eq!(tx.signatures[CUSTODIAN_SLOT], custodian_signature);
    assert_eq!(tx.message.recent_blockhash, params.nonce_blockhash);
    assert!(tx.verify().is_ok());
}

#[test]
fn test_swapped_signatures_are_rejected() {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let message = build_release_message(&params(&user, &custodian)).unwrap();
    let presign = presign_user(&message, &user);
    let custodian_signature = custodian.sign_message(&presign.message);

    let err = assemble_release(&message, &custodian_signature, &presign.signature).unwrap_err();
    assert!(matches!(err, WireError::InvalidSignature { slot: 0 }));
}

#[test]
fn test_foreign_custodian_fails_signer_order() {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let message = build_release_message(&params(&user, &custodian)).unwrap();

    let err = verify_signer_order(&message, &user.pubkey(), &Pubkey::new_unique()).unwrap_err();
    assert!(matches!(err, WireError::SignerOrder { slot: 1, .. }));
}

#[test]
fn test_placeholder_slots_filled_in_any_order() {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let message = build_release_message(&params(&user, &custodian)).unwrap();
    let bytes = message.serialize();

    let mut wire = assemble_placeholder(2, &bytes).unwrap();
    assert_eq!(message_bytes(&wire).unwrap(), bytes.as_slice());

    let user_signature = raw(&user.sign_message(&bytes));
    insert_signature(&mut wire, CUSTODIAN_SLOT, &raw(&custodian.sign_message(&bytes))).unwrap();
    insert_signature(&mut wire, USER_SLOT, &user_signature).unwrap();

    assert_eq!(extract_signature(&wire, USER_SLOT).unwrap(), user_signature);
    let tx: Transaction = bincode::deserialize(&wire).unwrap();
    assert!(tx.verify().is_ok());
}
