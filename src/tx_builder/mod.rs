//! Transaction Builder
//!
//! Raw wire assembly for multi-signer Solana transactions and the durable-nonce
//! release message the burn flow settles with.
//!
//! - **wire**: fixed-offset signature slots over serialized message bytes
//! - **release**: release instructions, signer-order checks, user presign
//! - **errors**: [`WireError`]

pub mod errors;
pub mod release;
pub mod wire;

pub use errors::WireError;
pub use release::{
    assemble_release, build_release_message, decode_message, presign_user, release_instructions,
    verify_signer_order, ReleaseParams, UserPresign, CUSTODIAN_SLOT, RELEASE_SIGNER_COUNT,
    USER_SLOT,
};
pub use wire::{
    assemble_final, assemble_placeholder, extract_signature, insert_signature, message_bytes,
    SIGNATURE_LEN,
};
