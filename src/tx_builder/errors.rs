//! Error types for wire assembly and release-message construction

use thiserror::Error;

/// Errors raised while building or reading raw Solana transaction bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Byte buffer ends before an expected field
    #[error("Wire bytes truncated: need {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    /// Compact-u16 length prefix is malformed
    #[error("Malformed compact-u16 length prefix")]
    MalformedLength,

    /// Requested signature slot is not declared by the transaction
    #[error("Signature slot {slot} out of range for {count} signer(s)")]
    SlotOutOfRange { slot: usize, count: usize },

    /// Signer count cannot be encoded or is zero
    #[error("Invalid signer count {0}")]
    InvalidSignerCount(usize),

    /// Compiled message has an unexpected number of required signatures
    #[error("Message requires {actual} signature(s), expected {expected}")]
    SignerCount { expected: u8, actual: u8 },

    /// A signer sits in the wrong position of the account-key list
    #[error("Signer slot {slot} holds {found}, expected {expected}")]
    SignerOrder {
        slot: usize,
        expected: String,
        found: String,
    },

    /// Signature in a slot does not verify against that slot's key
    #[error("Signature in slot {slot} does not verify")]
    InvalidSignature { slot: usize },

    /// Message bytes could not be decoded
    #[error("Message decode error: {0}")]
    Decode(String),

    /// Instruction could not be built
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild { program: String, reason: String },
}

impl WireError {
    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }
}
