//! Bridge request creation and request-data reads

use super::calls::{BridgeCalls, BurnRequestArgs, MintRequestArgs};
use super::client::SuiLedger;
use super::errors::{SuiError, SuiResult};
use super::signer::SuiKeypair;
use super::types::{ObjectId, ObjectKind, ObjectSchema, TransactionResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Request family a create transaction produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Mint,
    Burn,
}

impl RequestKind {
    pub fn request_object(&self) -> ObjectKind {
        match self {
            RequestKind::Mint => ObjectKind::MintRequest,
            RequestKind::Burn => ObjectKind::BurnRequest,
        }
    }

    pub fn cap_object(&self) -> ObjectKind {
        match self {
            RequestKind::Mint => ObjectKind::MintCap,
            RequestKind::Burn => ObjectKind::BurnCap,
        }
    }
}

/// Identifiers produced by a successful create transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRequest {
    pub request_id: ObjectId,
    pub cap_id: ObjectId,
    /// Burn requests only
    pub presign_cap_id: Option<ObjectId>,
    pub digest: String,
}

/// Canonical request fields as stored on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestData {
    pub source_chain: u64,
    pub source_token: Vec<u8>,
    pub source_decimals: u8,
    pub source_address: Vec<u8>,
    pub source_amount: u64,
    pub destination_address: Option<Vec<u8>>,
    pub message: Option<Vec<u8>>,
}

/// Issues create transactions and resolves the objects they create
pub struct RequestBuilder {
    ledger: Arc<dyn SuiLedger>,
    calls: BridgeCalls,
    schema: ObjectSchema,
    gas_budget: u64,
}

impl RequestBuilder {
    pub fn new(
        ledger: Arc<dyn SuiLedger>,
        calls: BridgeCalls,
        schema: ObjectSchema,
        gas_budget: u64,
    ) -> Self {
        Self {
            ledger,
            calls,
            schema,
            gas_budget,
        }
    }

    pub fn calls(&self) -> &BridgeCalls {
        &self.calls
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    pub fn ledger(&self) -> &Arc<dyn SuiLedger> {
        &self.ledger
    }

    pub fn gas_budget(&self) -> u64 {
        self.gas_budget
    }

    #[instrument(skip_all, fields(flow = "mint"))]
    pub async fn create_mint_request(
        &self,
        signer: &SuiKeypair,
        coin_type: &str,
        args: &MintRequestArgs,
    ) -> SuiResult<CreatedRequest> {
        let call = self
            .calls
            .create_mint_request(coin_type, args, &signer.address());
        let response = self.ledger.execute(signer, &[call], self.gas_budget).await?;
        self.resolve(RequestKind::Mint, &response)
    }

    #[instrument(skip_all, fields(flow = "burn"))]
    pub async fn create_burn_request(
        &self,
        signer: &SuiKeypair,
        coin_type: &str,
        args: &BurnRequestArgs,
    ) -> SuiResult<CreatedRequest> {
        let call = self
            .calls
            .create_burn_request(coin_type, args, &signer.address());
        let response = self.ledger.execute(signer, &[call], self.gas_budget).await?;
        self.resolve(RequestKind::Burn, &response)
    }

    /// Extract the request, cap, and (burn) presign cap ids; any miss is fatal
    pub fn resolve(&self, kind: RequestKind, response: &TransactionResponse) -> SuiResult<CreatedRequest> {
        let request_id = self.schema.find_created(response, kind.request_object())?;
        let cap_id = self.schema.find_created(response, kind.cap_object())?;
        let presign_cap_id = match kind {
            RequestKind::Burn => Some(self.schema.find_created(response, ObjectKind::PresignCap)?),
            RequestKind::Mint => None,
        };

        info!(
            request_id = %request_id,
            cap_id = %cap_id,
            digest = %response.digest,
            "Bridge request created"
        );
        Ok(CreatedRequest {
            request_id,
            cap_id,
            presign_cap_id,
            digest: response.digest.clone(),
        })
    }

    /// Read the request's canonical fields fresh from chain
    pub async fn fetch_request_data(&self, request_id: &ObjectId) -> SuiResult<RequestData> {
        let content = self
            .ledger
            .get_object(request_id)
            .await?
            .ok_or_else(|| SuiError::Decode(format!("request {request_id} does not exist")))?;
        parse_request_data(&content)
    }
}

/// Decode `content.fields` of a request object
pub fn parse_request_data(content: &Value) -> SuiResult<RequestData> {
    let fields = content
        .get("fields")
        .ok_or_else(|| SuiError::Decode("request content has no fields".to_string()))?;

    let source_decimals = move_u64(fields, "source_decimals")?;
    Ok(RequestData {
        source_chain: move_u64(fields, "source_chain")?,
        source_token: move_bytes(fields, "source_token")?,
        source_decimals: u8::try_from(source_decimals)
            .map_err(|_| SuiError::Decode(format!("source_decimals {source_decimals} exceeds u8")))?,
        source_address: move_bytes(fields, "source_address")?,
        source_amount: move_u64(fields, "source_amount")?,
        destination_address: move_option_bytes(fields, "destination_address")?,
        message: move_option_bytes(fields, "message")?,
    })
}

/// `u64` renders as a decimal string; small integers may render as numbers
fn move_u64(fields: &Value, name: &str) -> SuiResult<u64> {
    match fields.get(name) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| SuiError::Decode(format!("{name}: {s:?} is not a u64"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| SuiError::Decode(format!("{name}: {n} is not a u64"))),
        _ => Err(SuiError::Decode(format!("{name}: missing or not an integer"))),
    }
}

fn move_bytes(fields: &Value, name: &str) -> SuiResult<Vec<u8>> {
    let value = fields
        .get(name)
        .ok_or_else(|| SuiError::Decode(format!("{name}: missing")))?;
    bytes_from(value).ok_or_else(|| SuiError::Decode(format!("{name}: not a vector<u8>")))
}

/// `Option<vector<u8>>` renders as null, a bare vector, or `{fields: {vec: [..]}}`
fn move_option_bytes(fields: &Value, name: &str) -> SuiResult<Option<Vec<u8>>> {
    let value = match fields.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    if let Some(vec) = value.get("fields").and_then(|f| f.get("vec")) {
        return match vec.as_array().map(Vec::as_slice) {
            Some([]) => Ok(None),
            Some([inner]) => bytes_from(inner)
                .map(Some)
                .ok_or_else(|| SuiError::Decode(format!("{name}: not a vector<u8>"))),
            _ => Err(SuiError::Decode(format!("{name}: malformed option"))),
        };
    }
    bytes_from(value)
        .map(Some)
        .ok_or_else(|| SuiError::Decode(format!("{name}: not a vector<u8>")))
}

fn bytes_from(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}
