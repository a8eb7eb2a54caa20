//! Off-chain attestation and co-signing services
//!
//! Both clients are stateless relays: they forward chain-read request fields
//! and return whatever signature the service produces. The on-chain program
//! validates what gets submitted.

pub mod enclave;
pub mod solver;

pub use enclave::{EnclaveAttestor, EnclaveClient, EnclaveVote, VoteRequest};
pub use solver::{CosignRequest, SolverClient, SolverSignature, TransferCosigner};

use crate::metrics::{metrics, Timer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Delay between network-level retries
pub const RETRY_INTERVAL_MS: u64 = 250;

/// Errors from the enclave or solver services
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Connection could not be made or was reset
    #[error("{service} unreachable: {message}")]
    Network { service: &'static str, message: String },

    /// Call exceeded its timeout
    #[error("{service} timed out after {timeout_ms} ms")]
    Timeout { service: &'static str, timeout_ms: u64 },

    /// Service answered with a non-success status
    #[error("{service} rejected request with status {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("{service} response invalid: {message}")]
    Decode { service: &'static str, message: String },
}

impl ServiceError {
    /// Only connection-level failures are retried
    pub fn is_network(&self) -> bool {
        matches!(self, ServiceError::Network { .. })
    }

    pub fn service(&self) -> &'static str {
        match self {
            ServiceError::Network { service, .. }
            | ServiceError::Timeout { service, .. }
            | ServiceError::Rejected { service, .. }
            | ServiceError::Decode { service, .. } => service,
        }
    }

    fn from_reqwest(service: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout {
                service,
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            ServiceError::Decode {
                service,
                message: err.to_string(),
            }
        } else {
            ServiceError::Network {
                service,
                message: err.to_string(),
            }
        }
    }
}

/// HTTP settings shared by both service clients
#[derive(Debug, Clone)]
pub(crate) struct ServiceEndpoint {
    pub service: &'static str,
    pub base_url: String,
    pub timeout: Duration,
    pub retries: usize,
    pub client: reqwest::Client,
}

impl ServiceEndpoint {
    pub fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
        retries: usize,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network {
                service,
                message: e.to_string(),
            })?;
        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            retries,
            client,
        })
    }

    /// POST `body` to `{base_url}{path}`, retrying network failures only
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let timer = Timer::new();
        let strategy = FixedInterval::from_millis(RETRY_INTERVAL_MS).take(self.retries);

        let result = RetryIf::spawn(
            strategy,
            || self.post_once(&url, body),
            |err: &ServiceError| {
                if err.is_network() {
                    debug!(service = self.service, error = %err, "Retrying service call");
                    true
                } else {
                    false
                }
            },
        )
        .await;

        timer.observe_duration(&metrics().service_latency.with_label_values(&[self.service]));
        if let Err(err) = &result {
            warn!(service = self.service, url = %url, error = %err, "Service call failed");
        }
        result
    }

    async fn post_once<B, R>(&self, url: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(self.service, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(self.service, self.timeout, e))
    }
}

/// Decode a hex field of a service response
pub(crate) fn decode_hex(service: &'static str, field: &str, value: &str) -> Result<Vec<u8>, ServiceError> {
    hex::decode(value.trim_start_matches("0x")).map_err(|e| ServiceError::Decode {
        service,
        message: format!("{field}: {e}"),
    })
}
