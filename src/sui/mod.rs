//! Sui collaborator
//!
//! Move call descriptors, the JSON-RPC ledger seam, the user signer, typed
//! object-change lookup, request creation, and threshold-signature polling.

pub mod calls;
pub mod client;
pub mod errors;
pub mod request_builder;
pub mod sign_poller;
pub mod signer;
pub mod types;

pub use calls::{BridgeCalls, BurnRequestArgs, MintRequestArgs, MoveCall};
pub use client::{SuiJsonRpc, SuiLedger};
pub use errors::{SuiError, SuiResult};
pub use request_builder::{
    parse_request_data, CreatedRequest, RequestBuilder, RequestData, RequestKind,
};
pub use sign_poller::{
    parse_sign_state, PollError, SignState, ThresholdSignPoller, DEFAULT_MAX_POLLS,
    DEFAULT_POLL_INTERVAL_MS,
};
pub use signer::{blake2b256, SuiKeypair};
pub use types::{
    normalize_address, normalize_type, ExecutionStatus, ObjectChange, ObjectId, ObjectKind,
    ObjectSchema, TransactionEffects, TransactionResponse,
};
