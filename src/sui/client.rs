//! Sui fullnode access over JSON-RPC

use super::calls::MoveCall;
use super::errors::{SuiError, SuiResult};
use super::signer::SuiKeypair;
use super::types::{ObjectId, TransactionResponse};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

/// Minimal Sui surface used by the bridge flows
#[async_trait]
pub trait SuiLedger: Send + Sync {
    /// Build, sign, submit, and wait for a batch of Move calls.
    ///
    /// Returns the response only when effects report success.
    async fn execute(
        &self,
        signer: &SuiKeypair,
        calls: &[MoveCall],
        gas_budget: u64,
    ) -> SuiResult<TransactionResponse>;

    /// Move object content (`{dataType, type, fields}`), `None` if it does not exist
    async fn get_object(&self, id: &ObjectId) -> SuiResult<Option<Value>>;
}

/// [`SuiLedger`] backed by a fullnode's JSON-RPC endpoint
pub struct SuiJsonRpc {
    rpc_url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl SuiJsonRpc {
    pub fn new(rpc_url: &str, timeout: Duration) -> SuiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuiError::Transport(e.to_string()))?;
        Ok(Self {
            rpc_url: rpc_url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn rpc_call(&self, method: &str, params: Value) -> SuiResult<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params
        });

        let json: Value = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = json.get("error") {
            return Err(SuiError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| SuiError::Decode(format!("{method}: missing result in response")))
    }
}

#[async_trait]
impl SuiLedger for SuiJsonRpc {
    #[instrument(skip(self, signer, calls), fields(calls = calls.len()))]
    async fn execute(
        &self,
        signer: &SuiKeypair,
        calls: &[MoveCall],
        gas_budget: u64,
    ) -> SuiResult<TransactionResponse> {
        let sender = signer.address();
        let params: Vec<Value> = calls.iter().map(MoveCall::to_request_param).collect();

        let built = self
            .rpc_call(
                "unsafe_batchTransaction",
                json!([sender, params, Value::Null, gas_budget.to_string()]),
            )
            .await?;
        let tx_b64 = built
            .get("txBytes")
            .and_then(Value::as_str)
            .ok_or_else(|| SuiError::Decode("unsafe_batchTransaction: missing txBytes".to_string()))?;
        let tx_bytes = BASE64
            .decode(tx_b64)
            .map_err(|e| SuiError::Decode(format!("txBytes: {e}")))?;

        let signature = signer.sign_transaction(&tx_bytes);
        let result = self
            .rpc_call(
                "sui_executeTransactionBlock",
                json!([
                    tx_b64,
                    [signature],
                    {"showEffects": true, "showObjectChanges": true},
                    "WaitForLocalExecution"
                ]),
            )
            .await?;

        let response: TransactionResponse =
            serde_json::from_value(result).map_err(|e| SuiError::Decode(e.to_string()))?;
        response.ensure_success()?;
        debug!(digest = %response.digest, "Sui transaction executed");
        Ok(response)
    }

    async fn get_object(&self, id: &ObjectId) -> SuiResult<Option<Value>> {
        let result = self
            .rpc_call(
                "sui_getObject",
                json!([id, {"showContent": true, "showType": true}]),
            )
            .await?;

        if result.get("error").is_some() {
            return Ok(None);
        }
        Ok(result
            .get("data")
            .and_then(|data| data.get("content"))
            .cloned())
    }
}
