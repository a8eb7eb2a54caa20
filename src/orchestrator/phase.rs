//! Phase tracking and recovery state for multi-transaction flows
//!
//! Once the create transaction commits, the request and its capabilities
//! exist on chain and a fresh retry would orphan them. Every failure after
//! that point carries the ids needed to resume.

use super::errors::BridgeError;
use crate::metrics::{metrics, Timer};
use crate::sui::{CreatedRequest, ObjectId, RequestKind};
use std::fmt;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing committed; safe to retry from the start
    PreCreate,
    /// Create transaction committed but its objects could not be resolved
    CreateUnresolved,
    /// Request and capabilities exist on chain
    PostCreate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreCreate => "pre-create",
            Phase::CreateUnresolved => "create-unresolved",
            Phase::PostCreate => "post-create",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids a caller needs to resume a committed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryState {
    pub kind: RequestKind,
    pub request_id: ObjectId,
    pub cap_id: ObjectId,
    pub presign_cap_id: Option<ObjectId>,
    pub create_digest: String,
}

impl RecoveryState {
    pub fn from_created(kind: RequestKind, created: &CreatedRequest) -> Self {
        Self {
            kind,
            request_id: created.request_id.clone(),
            cap_id: created.cap_id.clone(),
            presign_cap_id: created.presign_cap_id.clone(),
            create_digest: created.digest.clone(),
        }
    }
}

/// Failed flow result: the error plus whatever is needed to resume
#[derive(Debug, Clone, PartialEq)]
pub struct FlowFailure {
    pub error: BridgeError,
    pub phase: Phase,
    pub recovery: Option<RecoveryState>,
}

impl FlowFailure {
    /// Failure before anything was committed
    pub fn pre_create(error: impl Into<BridgeError>) -> Self {
        Self {
            error: error.into(),
            phase: Phase::PreCreate,
            recovery: None,
        }
    }

    /// Digest of a committed create whose objects could not be resolved
    pub fn unresolved_digest(&self) -> Option<&str> {
        match (&self.phase, &self.error) {
            (Phase::CreateUnresolved, BridgeError::Sui(e)) => e.unresolved_digest(),
            _ => None,
        }
    }
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.phase)
    }
}

impl std::error::Error for FlowFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Per-flow tracker; lives on the handler's stack
pub struct PhaseTracker {
    flow: &'static str,
    phase: Phase,
    recovery: Option<RecoveryState>,
    timer: Timer,
}

impl PhaseTracker {
    pub fn start(flow: &'static str) -> Self {
        metrics().flows_started.with_label_values(&[flow]).inc();
        info!(flow, "Flow started");
        Self {
            flow,
            phase: Phase::PreCreate,
            recovery: None,
            timer: Timer::new(),
        }
    }

    /// Tracker for a step that resumes an already-committed request
    pub fn resumed(flow: &'static str) -> Self {
        let mut tracker = Self::start(flow);
        tracker.phase = Phase::PostCreate;
        tracker
    }

    pub fn step(&self, step: &'static str) {
        info!(flow = self.flow, phase = %self.phase, step, "Flow step");
    }

    /// Record a committed create; every later failure carries its ids
    pub fn committed(&mut self, kind: RequestKind, created: &CreatedRequest) {
        self.phase = Phase::PostCreate;
        self.recovery = Some(RecoveryState::from_created(kind, created));
        info!(
            flow = self.flow,
            request_id = %created.request_id,
            cap_id = %created.cap_id,
            digest = %created.digest,
            "Request committed"
        );
    }

    pub fn fail(&self, error: impl Into<BridgeError>) -> FlowFailure {
        let error = error.into();
        let phase = match (self.phase, &error) {
            (Phase::PreCreate, BridgeError::Sui(e)) if e.unresolved_digest().is_some() => {
                Phase::CreateUnresolved
            }
            (phase, _) => phase,
        };

        metrics()
            .flows_failed
            .with_label_values(&[self.flow, phase.as_str()])
            .inc();
        match &self.recovery {
            Some(recovery) => error!(
                flow = self.flow,
                phase = %phase,
                category = error.category(),
                request_id = %recovery.request_id,
                error = %error,
                "Flow failed after commit"
            ),
            None => error!(
                flow = self.flow,
                phase = %phase,
                category = error.category(),
                error = %error,
                "Flow failed"
            ),
        }

        FlowFailure {
            error,
            phase,
            recovery: self.recovery.clone(),
        }
    }

    pub fn complete(self) {
        metrics()
            .flows_completed
            .with_label_values(&[self.flow])
            .inc();
        self.timer
            .observe_duration(&metrics().flow_latency.with_label_values(&[self.flow]));
        info!(
            flow = self.flow,
            elapsed_secs = self.timer.elapsed_secs(),
            "Flow completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sui::{ObjectKind, SuiError};

    fn created() -> CreatedRequest {
        CreatedRequest {
            request_id: ObjectId::parse("0xa1").unwrap(),
            cap_id: ObjectId::parse("0xb2").unwrap(),
            presign_cap_id: Some(ObjectId::parse("0xc3").unwrap()),
            digest: "CreateDigest".to_string(),
        }
    }

    #[test]
    fn test_failure_before_create_has_no_recovery() {
        let tracker = PhaseTracker::start("burn");
        let failure = tracker.fail(BridgeError::validation("amount must be positive"));
        assert_eq!(failure.phase, Phase::PreCreate);
        assert!(failure.recovery.is_none());
    }

    #[test]
    fn test_failure_after_create_carries_ids() {
        let mut tracker = PhaseTracker::start("burn");
        tracker.committed(RequestKind::Burn, &created());

        let failure = tracker.fail(SuiError::Transport("connection reset".to_string()));
        assert_eq!(failure.phase, Phase::PostCreate);
        let recovery = failure.recovery.unwrap();
        assert_eq!(recovery.request_id.as_str(), "0xa1");
        assert_eq!(recovery.cap_id.as_str(), "0xb2");
        assert_eq!(recovery.presign_cap_id.unwrap().as_str(), "0xc3");
        assert_eq!(recovery.create_digest, "CreateDigest");
    }

    #[test]
    fn test_unresolved_create_is_its_own_phase() {
        let tracker = PhaseTracker::start("mint");
        let failure = tracker.fail(SuiError::MissingObject {
            kind: ObjectKind::MintCap,
            digest: "D1".to_string(),
        });
        assert_eq!(failure.phase, Phase::CreateUnresolved);
        assert_eq!(failure.unresolved_digest(), Some("D1"));
        assert!(failure.recovery.is_none());
    }

    #[test]
    fn test_failures_are_counted_by_phase() {
        let before = metrics()
            .flows_failed
            .with_label_values(&["phase-test", "post-create"])
            .get();
        let mut tracker = PhaseTracker::start("phase-test");
        tracker.committed(RequestKind::Mint, &created());
        let _ = tracker.fail(BridgeError::validation("x"));
        assert_eq!(
            metrics()
                .flows_failed
                .with_label_values(&["phase-test", "post-create"])
                .get(),
            before + 1
        );
    }
}
