//! Error to HTTP mapping
//!
//! Every error body carries `error` and, when one applies, `code`. Failures
//! after a committed create additionally carry the ids needed to resume.

use crate::auth::AuthError;
use crate::nonce_manager::NonceError;
use crate::orchestrator::{BridgeError, FlowFailure, Phase};
use crate::sui::RequestKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::validation(message).into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

fn status_for(error: &BridgeError) -> StatusCode {
    match error.code() {
        Some("VALIDATION") => StatusCode::BAD_REQUEST,
        Some("UNAUTHORIZED") => StatusCode::UNAUTHORIZED,
        Some("INSUFFICIENT_SOL") => StatusCode::PAYMENT_REQUIRED,
        Some("FORBIDDEN") => StatusCode::FORBIDDEN,
        Some("WALLET_NOT_FOUND") => StatusCode::NOT_FOUND,
        Some("NONCE_EXISTS") => StatusCode::CONFLICT,
        Some("ENCLAVE_ERROR") | Some("SOLVER_ERROR") => StatusCode::BAD_GATEWAY,
        Some("SIGNATURE_PENDING") => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(error: &BridgeError) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("error".to_string(), json!(error.to_string()));
    if let Some(code) = error.code() {
        body.insert("code".to_string(), json!(code));
    }
    match error {
        BridgeError::NonceExists { address } => {
            body.insert("nonceAddress".to_string(), json!(address.to_string()));
        }
        BridgeError::Nonce(NonceError::InsufficientFunds {
            required,
            available,
        }) => {
            body.insert("required".to_string(), json!(required));
            body.insert("balance".to_string(), json!(available));
        }
        _ => {}
    }
    body
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        Self {
            status: status_for(&error),
            body: Value::Object(error_body(&error)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        BridgeError::from(error).into()
    }
}

impl From<FlowFailure> for ApiError {
    fn from(failure: FlowFailure) -> Self {
        let mut body = error_body(&failure.error);

        if let Some(recovery) = &failure.recovery {
            let cap_field = match recovery.kind {
                RequestKind::Burn => "burnCapId",
                RequestKind::Mint => "mintCapId",
            };
            body.insert("phase".to_string(), json!(Phase::PostCreate.as_str()));
            body.insert("requestId".to_string(), json!(recovery.request_id));
            body.insert(cap_field.to_string(), json!(recovery.cap_id));
            if let Some(presign_cap_id) = &recovery.presign_cap_id {
                body.insert("presignCapId".to_string(), json!(presign_cap_id));
            }
            body.insert("createDigest".to_string(), json!(recovery.create_digest));
            return Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: Value::Object(body),
            };
        }

        if let Some(digest) = failure.unresolved_digest() {
            body.insert("phase".to_string(), json!(Phase::CreateUnresolved.as_str()));
            body.insert("createDigest".to_string(), json!(digest));
            return Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: Value::Object(body),
            };
        }

        Self {
            status: status_for(&failure.error),
            body: Value::Object(body),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
