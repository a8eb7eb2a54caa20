use super::{decode_hex, ServiceEndpoint, ServiceError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

const SERVICE: &str = "solver";

/// Co-signature over the release message by the destination custodial key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSignature(pub Vec<u8>);

/// Inputs the solver signs over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosignRequest {
    pub request_id: String,
    pub message: Vec<u8>,
    pub user_signature: Vec<u8>,
    pub user_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignBody<'a> {
    request_id: &'a str,
    message: String,
    user_signature: String,
    user_address: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

/// Solver collaborator seam
#[async_trait]
pub trait TransferCosigner: Send + Sync {
    async fn cosign(&self, request: &CosignRequest) -> Result<SolverSignature, ServiceError>;
}

/// HTTP client for the solver
#[derive(Debug, Clone)]
pub struct SolverClient {
    endpoint: ServiceEndpoint,
}

impl SolverClient {
    pub fn new(base_url: &str, timeout: Duration, retries: usize) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: ServiceEndpoint::new(SERVICE, base_url, timeout, retries)?,
        })
    }
}

#[async_trait]
impl TransferCosigner for SolverClient {
    #[instrument(skip_all, fields(request_id = %request.request_id))]
    async fn cosign(&self, request: &CosignRequest) -> Result<SolverSignature, ServiceError> {
        let body = SignBody {
            request_id: &request.request_id,
            message: BASE64.encode(&request.message),
            user_signature: bs58::encode(&request.user_signature).into_string(),
            user_address: &request.user_address,
        };
        let response: SignResponse = self.endpoint.post_json("/sign", &body).await?;
        let signature = decode_hex(SERVICE, "signature", &response.signature)?;
        if signature.is_empty() {
            return Err(ServiceError::Decode {
                service: SERVICE,
                message: "empty signature".to_string(),
            });
        }
        info!("Solver co-signature received");
        Ok(SolverSignature(signature))
    }
}
