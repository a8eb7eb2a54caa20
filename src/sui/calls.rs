//! Move call descriptors for the bridge package
//!
//! The on-chain program is a black box; these only name the entry functions
//! and lay out their arguments in the JSON form `unsafe_batchTransaction`
//! accepts (`vector<u8>` as number arrays, `u64` as decimal strings).

use super::types::ObjectId;
use serde::Serialize;
use serde_json::{json, Value};

/// One `moveCallRequestParams` entry of a batch transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCall {
    pub package_object_id: String,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl MoveCall {
    /// Wrap as a batch-transaction request param
    pub fn to_request_param(&self) -> Value {
        json!({ "moveCallRequestParams": self })
    }
}

/// Fields of a mint request, as recorded on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequestArgs {
    pub source_chain: u64,
    pub source_token: Vec<u8>,
    pub source_decimals: u8,
    pub source_address: Vec<u8>,
    pub source_amount: u64,
    /// Deposit transaction signature on the source chain
    pub deposit_signature: Vec<u8>,
}

/// Fields of a burn request, as recorded on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnRequestArgs {
    pub source_amount: u64,
    pub destination_address: Vec<u8>,
    /// Serialized release message the custodial key will sign
    pub message: Vec<u8>,
    /// User presignature over `message`
    pub user_signature: Vec<u8>,
}

/// Builds calls against one deployment of the bridge package
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCalls {
    pub package: String,
    pub module: String,
    /// Shared bridge state object passed to every entry function
    pub bridge_object: ObjectId,
}

impl BridgeCalls {
    fn call(&self, function: &str, type_arguments: Vec<String>, arguments: Vec<Value>) -> MoveCall {
        MoveCall {
            package_object_id: self.package.clone(),
            module: self.module.clone(),
            function: function.to_string(),
            type_arguments,
            arguments,
        }
    }

    /// Create, share, and hand the MintCap to `recipient`
    pub fn create_mint_request(&self, coin_type: &str, args: &MintRequestArgs, recipient: &str) -> MoveCall {
        self.call(
            "create_mint_request",
            vec![coin_type.to_string()],
            vec![
                json!(self.bridge_object),
                json!(args.source_chain.to_string()),
                json!(args.source_token),
                json!(args.source_decimals),
                json!(args.source_address),
                json!(args.source_amount.to_string()),
                json!(args.deposit_signature),
                json!(recipient),
            ],
        )
    }

    /// Create, share, and hand the BurnCap and PresignCap to `recipient`
    pub fn create_burn_request(&self, coin_type: &str, args: &BurnRequestArgs, recipient: &str) -> MoveCall {
        self.call(
            "create_burn_request",
            vec![coin_type.to_string()],
            vec![
                json!(self.bridge_object),
                json!(args.source_amount.to_string()),
                json!(args.destination_address),
                json!(args.message),
                json!(args.user_signature),
                json!(recipient),
            ],
        )
    }

    /// Record an enclave vote on a mint request
    pub fn vote_mint(&self, request_id: &ObjectId, signature: &[u8], timestamp_ms: u64) -> MoveCall {
        self.call("vote_mint", vec![], self.vote_args(request_id, signature, timestamp_ms))
    }

    /// Record an enclave vote on a burn request
    pub fn vote_burn(&self, request_id: &ObjectId, signature: &[u8], timestamp_ms: u64) -> MoveCall {
        self.call("vote_burn", vec![], self.vote_args(request_id, signature, timestamp_ms))
    }

    fn vote_args(&self, request_id: &ObjectId, signature: &[u8], timestamp_ms: u64) -> Vec<Value> {
        vec![
            json!(self.bridge_object),
            json!(request_id),
            json!(signature),
            json!(timestamp_ms.to_string()),
        ]
    }

    /// Consume the MintCap and mint to the request's recipient
    pub fn execute_mint(&self, coin_type: &str, request_id: &ObjectId, mint_cap: &ObjectId) -> MoveCall {
        self.call(
            "execute_mint",
            vec![coin_type.to_string()],
            vec![json!(self.bridge_object), json!(request_id), json!(mint_cap)],
        )
    }

    /// Consume the BurnCap and PresignCap; authorizes the custodial sign session
    pub fn execute_burn(
        &self,
        coin_type: &str,
        request_id: &ObjectId,
        burn_cap: &ObjectId,
        presign_cap: &ObjectId,
        solver_signature: &[u8],
    ) -> MoveCall {
        self.call(
            "execute_burn",
            vec![coin_type.to_string()],
            vec![
                json!(self.bridge_object),
                json!(request_id),
                json!(burn_cap),
                json!(presign_cap),
                json!(solver_signature),
            ],
        )
    }
}
