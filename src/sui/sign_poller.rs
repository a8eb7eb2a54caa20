//! Threshold signature polling
//!
//! The custodial MPC network publishes its signature on a sign-session object
//! some time after the execute transaction authorizes it. The object exists
//! before the signature is attached, so only a `Completed` state carrying a
//! non-empty signature counts.

use super::client::SuiLedger;
use super::errors::SuiError;
use super::types::ObjectId;
use crate::metrics::metrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_POLLS: u32 = 40;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError {
    /// Signature not published yet; polling again later is safe
    #[error("Threshold signature for {sign_id} not available after {polls} polls")]
    Timeout { sign_id: ObjectId, polls: u32 },

    #[error("Threshold signature polling cancelled")]
    Cancelled,

    /// The MPC network refused to sign
    #[error("Sign session {sign_id} rejected")]
    Rejected { sign_id: ObjectId },

    #[error(transparent)]
    Sui(#[from] SuiError),
}

/// Observed state of a sign-session object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignState {
    Pending,
    Completed(Vec<u8>),
    Rejected,
}

/// Decode `content.fields.state` of a sign-session object
pub fn parse_sign_state(content: &Value) -> SignState {
    let state = match content.get("fields").and_then(|f| f.get("state")) {
        Some(state) => state,
        None => return SignState::Pending,
    };

    match state.get("variant").and_then(Value::as_str) {
        Some("Completed") => {
            let signature: Option<Vec<u8>> = state
                .get("fields")
                .and_then(|f| f.get("signature"))
                .and_then(Value::as_array)
                .and_then(|bytes| {
                    bytes
                        .iter()
                        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                        .collect()
                });
            match signature {
                Some(signature) if !signature.is_empty() => SignState::Completed(signature),
                _ => SignState::Pending,
            }
        }
        Some("Rejected") => SignState::Rejected,
        _ => SignState::Pending,
    }
}

/// Polls a sign-session object until its signature is published
#[derive(Clone)]
pub struct ThresholdSignPoller {
    ledger: Arc<dyn SuiLedger>,
    max_polls: u32,
    interval: Duration,
}

impl ThresholdSignPoller {
    pub fn new(ledger: Arc<dyn SuiLedger>, max_polls: u32, interval: Duration) -> Self {
        Self {
            ledger,
            max_polls: max_polls.max(1),
            interval,
        }
    }

    /// Wait for the signature, reading the object at most `max_polls` times.
    ///
    /// The first read happens immediately. Transient read errors count as a
    /// pending poll.
    pub async fn await_signature(
        &self,
        sign_id: &ObjectId,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, PollError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for poll in 1..=self.max_polls {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(sign_id = %sign_id, poll, "Threshold signature polling cancelled");
                    return Err(PollError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            metrics().threshold_polls.inc();
            let state = match self.ledger.get_object(sign_id).await {
                Ok(Some(content)) => parse_sign_state(&content),
                Ok(None) => SignState::Pending,
                Err(e) if e.is_transient() => {
                    warn!(sign_id = %sign_id, poll, error = %e, "Sign session read failed");
                    SignState::Pending
                }
                Err(e) => return Err(e.into()),
            };

            match state {
                SignState::Completed(signature) => {
                    info!(sign_id = %sign_id, polls = poll, "Threshold signature published");
                    return Ok(signature);
                }
                SignState::Rejected => {
                    return Err(PollError::Rejected {
                        sign_id: sign_id.clone(),
                    })
                }
                SignState::Pending => {
                    debug!(sign_id = %sign_id, poll, max_polls = self.max_polls, "Signature pending");
                }
            }
        }

        warn!(sign_id = %sign_id, polls = self.max_polls, "Threshold signature poll exhausted");
        Err(PollError::Timeout {
            sign_id: sign_id.clone(),
            polls: self.max_polls,
        })
    }
}
