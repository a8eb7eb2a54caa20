use super::{decode_hex, ServiceEndpoint, ServiceError};
use crate::sui::{RequestData, RequestKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

const SERVICE: &str = "enclave";

/// Attestation that a claimed deposit occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclaveVote {
    pub signature: Vec<u8>,
    pub timestamp_ms: u64,
}

/// `POST /vote` body: the request's canonical fields, bytes hex-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub request_id: String,
    pub request_type: &'static str,
    pub source_chain: u64,
    pub source_token: String,
    pub source_decimals: u8,
    pub source_address: String,
    pub source_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_signature: Option<String>,
}

impl VoteRequest {
    /// Relay chain-read request fields without re-deriving them
    pub fn from_request_data(
        kind: RequestKind,
        request_id: &str,
        data: &RequestData,
        deposit_signature: Option<&str>,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            request_type: match kind {
                RequestKind::Mint => "mint",
                RequestKind::Burn => "burn",
            },
            source_chain: data.source_chain,
            source_token: hex::encode(&data.source_token),
            source_decimals: data.source_decimals,
            source_address: hex::encode(&data.source_address),
            source_amount: data.source_amount.to_string(),
            destination_address: data.destination_address.as_ref().map(hex::encode),
            message: data.message.as_ref().map(hex::encode),
            deposit_signature: deposit_signature.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteResponse {
    signature: String,
    timestamp_ms: u64,
}

/// Enclave collaborator seam
#[async_trait]
pub trait EnclaveAttestor: Send + Sync {
    async fn vote(&self, request: &VoteRequest) -> Result<EnclaveVote, ServiceError>;
}

/// HTTP client for the attestation enclave
#[derive(Debug, Clone)]
pub struct EnclaveClient {
    endpoint: ServiceEndpoint,
}

impl EnclaveClient {
    pub fn new(base_url: &str, timeout: Duration, retries: usize) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: ServiceEndpoint::new(SERVICE, base_url, timeout, retries)?,
        })
    }
}

#[async_trait]
impl EnclaveAttestor for EnclaveClient {
    #[instrument(skip_all, fields(request_id = %request.request_id))]
    async fn vote(&self, request: &VoteRequest) -> Result<EnclaveVote, ServiceError> {
        let response: VoteResponse = self.endpoint.post_json("/vote", request).await?;
        let signature = decode_hex(SERVICE, "signature", &response.signature)?;
        if signature.is_empty() {
            return Err(ServiceError::Decode {
                service: SERVICE,
                message: "empty signature".to_string(),
            });
        }
        info!(timestamp_ms = response.timestamp_ms, "Enclave vote received");
        Ok(EnclaveVote {
            signature,
            timestamp_ms: response.timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> VoteRequest {
        VoteRequest::from_request_data(
            RequestKind::Mint,
            "0xabc",
            &RequestData {
                source_chain: 1,
                source_token: vec![0xde, 0xad],
                source_decimals: 9,
                source_address: vec![0xbe, 0xef],
                source_amount: 500,
                destination_address: None,
                message: None,
            },
            Some("5sig"),
        )
    }

    #[tokio::test]
    async fn test_vote_sends_hex_fields_and_decodes_signature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vote")
            .match_body(Matcher::Json(json!({
                "requestId": "0xabc",
                "requestType": "mint",
                "sourceChain": 1,
                "sourceToken": "dead",
                "sourceDecimals": 9,
                "sourceAddress": "beef",
                "sourceAmount": "500",
                "depositSignature": "5sig"
            })))
            .with_status(200)
            .with_body(r#"{"signature":"0a0b","timestampMs":1700000000000}"#)
            .create_async()
            .await;

        let client = EnclaveClient::new(&server.url(), Duration::from_secs(10), 2).unwrap();
        let vote = client.vote(&request()).await.unwrap();

        assert_eq!(
            vote,
            EnclaveVote {
                signature: vec![0x0a, 0x0b],
                timestamp_ms: 1_700_000_000_000
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vote")
            .with_status(422)
            .with_body("deposit not found")
            .expect(1)
            .create_async()
            .await;

        let client = EnclaveClient::new(&server.url(), Duration::from_secs(10), 3).unwrap();
        let err = client.vote(&request()).await.unwrap_err();

        assert_eq!(
            err,
            ServiceError::Rejected {
                service: "enclave",
                status: 422,
                body: "deposit not found".to_string()
            }
        );
        assert!(!err.is_network());
        mock.assert_async().await;
    }
}
