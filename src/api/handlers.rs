use super::error::ApiError;
use super::types::*;
use super::AppState;
use crate::metrics::metrics;
use crate::observability::{flow_span, CorrelationId};
use crate::orchestrator::{
    broadcast_burn, create_nonce, run_burn, run_mint, vote_mint, MintParams,
};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{warn, Instrument};

/// Authenticate, check `userId` against the principal, then decode the body.
///
/// Authentication and authorization run before any field validation.
fn admit<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(String, T), ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let principal = state.auth.authenticate(authorization)?;

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))?;
    let user_id = value
        .get("userId")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::validation("userId is required"))?
        .to_string();
    principal.authorize(&user_id)?;

    let parsed = serde_json::from_value(value).map_err(|e| ApiError::validation(e.to_string()))?;
    Ok((user_id, parsed))
}

pub async fn burn(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BurnResponse>, ApiError> {
    let correlation_id = CorrelationId::from_headers(&headers);
    let (user_id, request): (_, BurnBody) = admit(&state, &headers, &body)?;

    async move {
        let params = request.into_params()?;
        let outcome = run_burn(&state.services, &params).await?;
        Ok::<_, ApiError>(Json(BurnResponse::from(outcome)))
    }
    .instrument(flow_span("burn", &correlation_id, &user_id))
    .await
}

pub async fn mint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MintResponse>, ApiError> {
    let correlation_id = CorrelationId::from_headers(&headers);
    let (user_id, request): (_, MintBody) = admit(&state, &headers, &body)?;

    async move {
        let outcome = run_mint(&state.services, &MintParams::from(request)).await?;
        Ok::<_, ApiError>(Json(MintResponse::from(outcome)))
    }
    .instrument(flow_span("mint", &correlation_id, &user_id))
    .await
}

pub async fn broadcast_burn_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BroadcastBurnResponse>, ApiError> {
    let correlation_id = CorrelationId::from_headers(&headers);
    let (user_id, request): (_, BroadcastBurnBody) = admit(&state, &headers, &body)?;

    // dropping the handler (client gone) cancels the threshold poll
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    async move {
        let params = request.into_params()?;
        let signature = broadcast_burn(&state.services, &params, &cancel).await?;
        Ok::<_, ApiError>(Json(BroadcastBurnResponse {
            solana_signature: signature.to_string(),
        }))
    }
    .instrument(flow_span("broadcast", &correlation_id, &user_id))
    .await
}

pub async fn create_nonce_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CreateNonceResponse>, ApiError> {
    let correlation_id = CorrelationId::from_headers(&headers);
    let (user_id, _request): (_, CreateNonceBody) = admit(&state, &headers, &body)?;

    async {
        let (address, signature) = create_nonce(&state.services, &user_id).await?;
        Ok::<_, ApiError>(Json(CreateNonceResponse {
            signature: signature.to_string(),
            nonce_address: address.to_string(),
        }))
    }
    .instrument(flow_span("create_nonce", &correlation_id, &user_id))
    .await
}

pub async fn vote_mint_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VoteMintResponse>, ApiError> {
    let correlation_id = CorrelationId::from_headers(&headers);
    let (user_id, request): (_, VoteMintBody) = admit(&state, &headers, &body)?;

    async move {
        let params = request.into_params()?;
        let digest = vote_mint(&state.services, &params).await?;
        Ok::<_, ApiError>(Json(VoteMintResponse { digest }))
    }
    .instrument(flow_span("vote_mint", &correlation_id, &user_id))
    .await
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    if !state.enable_metrics {
        return StatusCode::NOT_FOUND.into_response();
    }
    match metrics().export() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
