//! Observability module for correlation and tracing

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::Span;
use uuid::Uuid;

/// Header carrying a caller-supplied correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

const MAX_CORRELATION_LEN: usize = 128;

/// Correlation ID for tracking requests across components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use the inbound header when it is printable and short, otherwise mint one
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_CORRELATION_LEN)
            .filter(|v| v.chars().all(|c| c.is_ascii_graphic()))
            .map(|v| Self(v.to_string()))
            .unwrap_or_default()
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span wrapping one bridge flow; phases and ids are logged inside it
pub fn flow_span(flow: &'static str, correlation_id: &CorrelationId, user_id: &str) -> Span {
    tracing::info_span!(
        "bridge_flow",
        flow,
        correlation_id = %correlation_id,
        user_id,
    )
}
