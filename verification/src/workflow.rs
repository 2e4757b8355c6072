//! Per-request verification state machine.

use landgrab_geofence::{contains, GeofenceOracle};
use landgrab_ledger::{ClaimSettlement, ParcelLedger};
use landgrab_types::{
    Address, ChainEvent, Coordinates, DomainEvent, GeoCode, LandgrabError, RequestId, RequestStatus, RollingSet,
    VerificationRequest, DEFAULT_DEDUP_CAPACITY,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::VerificationError;
use crate::executor::{ClaimExecutor, ClaimOutcome};

/// Used by mock verification when the oracle cannot resolve a code.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 51.5074,
    lng: -0.1278,
};

/// Finished requests kept for status queries.
const HISTORY_LIMIT: usize = 1024;

/// Default cap on requests held in memory before reaching a terminal state.
pub const DEFAULT_MAX_ACTIVE_REQUESTS: usize = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Every request is approved after a short delay.
    #[default]
    Mock,
    /// Requests wait for the user's client to assert presence.
    Real,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMode::Mock => "mock",
            VerificationMode::Real => "real",
        }
    }

    pub fn is_mock(&self) -> bool {
        *self == VerificationMode::Mock
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub mode: VerificationMode,
    pub mock_verification_delay: Duration,
    /// Failed presence assertions before a request expires.
    pub max_presence_attempts: u32,
    pub dedup_capacity: usize,
    /// Unconfirmed requests held at once. When full, the oldest request
    /// still waiting for presence is expired to make room.
    pub max_active_requests: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::Mock,
            mock_verification_delay: Duration::from_secs(5),
            max_presence_attempts: 5,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            max_active_requests: DEFAULT_MAX_ACTIVE_REQUESTS,
        }
    }
}

struct WorkflowState {
    active: HashMap<RequestId, VerificationRequest>,
    history: VecDeque<VerificationRequest>,
    completed: RollingSet<RequestId>,
}

impl WorkflowState {
    fn lookup(&self, request_id: RequestId) -> Option<&VerificationRequest> {
        self.active
            .get(&request_id)
            .or_else(|| self.history.iter().rev().find(|r| r.request_id == request_id))
    }

    /// Apply a transition to an active request and log it. Terminal
    /// requests leave the active set.
    fn advance(
        &mut self,
        request_id: RequestId,
        next: RequestStatus,
        actor: &str,
        failure: Option<String>,
    ) -> Result<RequestStatus, VerificationError> {
        let request = self
            .active
            .get_mut(&request_id)
            .ok_or(VerificationError::UnknownRequest(request_id))?;
        let from = request
            .transition(next)
            .map_err(VerificationError::InvalidTransition)?;
        if failure.is_some() {
            request.failure = failure;
        }
        info!(
            %request_id,
            actor,
            user = %request.user,
            code = %request.code,
            from = ?from,
            to = ?next,
            attempts = request.presence_attempts,
            failure = request.failure.as_deref().unwrap_or(""),
            "request transition"
        );
        if next.is_terminal() {
            self.completed.insert(request_id);
            if let Some(done) = self.active.remove(&request_id) {
                if self.history.len() >= HISTORY_LIMIT {
                    self.history.pop_front();
                }
                self.history.push_back(done);
            }
        }
        Ok(from)
    }

    /// Expire the oldest request still waiting for presence. Requests in the
    /// middle of settlement are never evicted.
    fn evict_oldest_waiting(&mut self) -> Option<RequestId> {
        let oldest = self
            .active
            .values()
            .filter(|r| matches!(r.status, RequestStatus::Requested | RequestStatus::LocationRejected))
            .min_by_key(|r| r.observed_at)
            .map(|r| r.request_id)?;
        match self.advance(oldest, RequestStatus::Expired, "workflow", Some("evicted: too many pending requests".into())) {
            Ok(_) => Some(oldest),
            Err(e) => {
                debug!(request_id = %oldest, error = %e, "could not evict request");
                None
            }
        }
    }
}

/// Drives verification requests from observation to settlement.
///
/// In-memory state covers in-flight requests only; the ledger stays the
/// source of truth. Requests are deduplicated on their id, so redelivered
/// events are harmless.
pub struct VerificationWorkflow {
    oracle: Arc<dyn GeofenceOracle>,
    executor: ClaimExecutor,
    config: WorkflowConfig,
    state: Mutex<WorkflowState>,
    tasks: Mutex<JoinSet<()>>,
}

impl VerificationWorkflow {
    pub fn new(oracle: Arc<dyn GeofenceOracle>, ledger: Arc<dyn ParcelLedger>, config: WorkflowConfig) -> Self {
        let completed = RollingSet::new(config.dedup_capacity);
        Self {
            oracle,
            executor: ClaimExecutor::new(ledger),
            config,
            state: Mutex::new(WorkflowState {
                active: HashMap::new(),
                history: VecDeque::new(),
                completed,
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn mode(&self) -> VerificationMode {
        self.config.mode
    }

    /// Feed one ledger event into the workflow.
    pub async fn handle(self: &Arc<Self>, event: &ChainEvent) {
        match &event.event {
            DomainEvent::VerificationRequested { request_id, user, code } => {
                self.on_verification_requested(*request_id, *user, code).await;
            }
            DomainEvent::LandClaimed { owner, code, .. } => self.on_land_claimed(*owner, code).await,
            _ => {}
        }
    }

    /// Record a new request. In mock mode verification and settlement run
    /// on a background task; in real mode the request waits for
    /// [`confirm_presence`](Self::confirm_presence).
    pub async fn on_verification_requested(self: &Arc<Self>, request_id: RequestId, user: Address, code: &str) {
        let mut state = self.state.lock().await;
        if state.completed.contains(&request_id) || state.active.contains_key(&request_id) {
            debug!(%request_id, "request already known, ignoring redelivery");
            return;
        }
        if state.active.len() >= self.config.max_active_requests {
            match state.evict_oldest_waiting() {
                Some(evicted) => warn!(%request_id, %evicted, "pending request limit reached, oldest request expired"),
                None => warn!(%request_id, active = state.active.len(), "pending request limit reached, all requests settling"),
            }
        }
        state
            .active
            .insert(request_id, VerificationRequest::new(request_id, user, code));
        info!(%request_id, actor = "ledger", %user, code, mode = %self.config.mode, "verification request recorded");

        let geocode = match GeoCode::parse(code) {
            Ok(geocode) => geocode,
            Err(e) => {
                warn!(%request_id, code, "request carries an invalid geocode");
                if let Err(e) = state.advance(request_id, RequestStatus::Expired, "workflow", Some(e.to_string())) {
                    debug!(%request_id, error = %e, "could not expire request");
                }
                return;
            }
        };
        drop(state);

        match self.config.mode {
            VerificationMode::Real => {
                debug!(%request_id, "awaiting presence confirmation");
            }
            VerificationMode::Mock => {
                let this = Arc::clone(self);
                let mut tasks = self.tasks.lock().await;
                while tasks.try_join_next().is_some() {}
                tasks.spawn(async move { this.auto_verify(request_id, geocode).await });
            }
        }
    }

    async fn auto_verify(&self, request_id: RequestId, code: GeoCode) {
        if !self.config.mock_verification_delay.is_zero() {
            tokio::time::sleep(self.config.mock_verification_delay).await;
        }
        let coordinates = match self.oracle.words_to_cell(code.as_str()).await {
            Ok(cell) => cell.centroid(),
            Err(e) => {
                warn!(%request_id, %code, error = %e, "could not resolve cell, using default coordinates");
                DEFAULT_COORDINATES
            }
        };
        {
            let mut state = self.state.lock().await;
            if let Err(e) = state.advance(request_id, RequestStatus::LocationVerified, "mock-verifier", None) {
                debug!(%request_id, error = %e, "request moved on before mock verification");
                return;
            }
        }
        self.settle(request_id, code, coordinates).await;
    }

    /// The user's client asserts it is at `(lat, lng)`.
    ///
    /// Inside the cell the request is verified and settled before this
    /// returns. Outside it is rejected, and expires after
    /// `max_presence_attempts` rejections. Oracle failures are logged and
    /// leave the request untouched; the unchanged status is returned.
    pub async fn confirm_presence(
        &self,
        request_id: RequestId,
        lat: f64,
        lng: f64,
    ) -> Result<RequestStatus, VerificationError> {
        let code = {
            let state = self.state.lock().await;
            let request = match state.active.get(&request_id) {
                Some(request) => request,
                None => {
                    return match state.lookup(request_id) {
                        Some(done) => Err(VerificationError::InvalidTransition(LandgrabError::InvalidTransition {
                            request_id: request_id.to_string(),
                            from: done.status,
                            to: RequestStatus::LocationVerified,
                        })),
                        None => Err(VerificationError::UnknownRequest(request_id)),
                    }
                }
            };
            if !request.status.can_transition_to(RequestStatus::LocationVerified) {
                return Err(VerificationError::InvalidTransition(LandgrabError::InvalidTransition {
                    request_id: request_id.to_string(),
                    from: request.status,
                    to: RequestStatus::LocationVerified,
                }));
            }
            GeoCode::parse(&request.code).map_err(|_| VerificationError::InvalidCode(request.code.clone()))?
        };

        let cell = match self.oracle.words_to_cell(code.as_str()).await {
            Ok(cell) => cell,
            Err(e) => {
                warn!(%request_id, %code, error = %e, kind = ?e.kind(), "could not resolve cell, presence not checked");
                let state = self.state.lock().await;
                return state
                    .lookup(request_id)
                    .map(|r| r.status)
                    .ok_or(VerificationError::UnknownRequest(request_id));
            }
        };
        let inside = contains(&cell, lat, lng);

        {
            let mut state = self.state.lock().await;
            if !inside {
                let attempts = match state.active.get_mut(&request_id) {
                    Some(request) => {
                        request.presence_attempts += 1;
                        request.presence_attempts
                    }
                    None => return Err(VerificationError::UnknownRequest(request_id)),
                };
                debug!(%request_id, lat, lng, attempts, "asserted position outside cell");
                if attempts >= self.config.max_presence_attempts {
                    state.advance(
                        request_id,
                        RequestStatus::Expired,
                        "user",
                        Some(format!("presence not proven after {attempts} attempts")),
                    )?;
                    return Ok(RequestStatus::Expired);
                }
                state.advance(request_id, RequestStatus::LocationRejected, "user", None)?;
                return Ok(RequestStatus::LocationRejected);
            }
            state.advance(request_id, RequestStatus::LocationVerified, "user", None)?;
        }

        self.settle(request_id, code, Coordinates::new(lat, lng)).await;
        let state = self.state.lock().await;
        Ok(state
            .lookup(request_id)
            .map(|r| r.status)
            .unwrap_or(RequestStatus::Expired))
    }

    /// Settle a verified request. Every outcome ends the request; nothing
    /// propagates past the workflow.
    async fn settle(&self, request_id: RequestId, code: GeoCode, coordinates: Coordinates) {
        let user = match self.state.lock().await.active.get(&request_id) {
            Some(request) => request.user,
            None => return,
        };
        let claim = ClaimSettlement {
            request_id,
            code,
            coordinates,
            user,
        };
        let result = self.executor.execute(&claim).await;

        let mut state = self.state.lock().await;
        let applied = match result {
            Ok(ClaimOutcome::Settled { tx_hash, token_id }) => {
                info!(%request_id, %tx_hash, token_id = ?token_id.map(|t| t.value()), "claim settled");
                state.advance(request_id, RequestStatus::Claimed, "verifier", None)
            }
            Ok(ClaimOutcome::Stale { reason }) => {
                info!(%request_id, %reason, "stale request, nothing sent");
                state.advance(request_id, RequestStatus::Expired, "verifier", Some(format!("stale: {reason}")))
            }
            Err(e) => {
                warn!(%request_id, error = %e, kind = ?e.kind(), "settlement failed");
                state.advance(request_id, RequestStatus::Expired, "verifier", Some(e.to_string()))
            }
        };
        if let Err(e) = applied {
            debug!(%request_id, error = %e, "request already finished elsewhere");
        }
    }

    /// A `LandClaimed` for `code` completes any in-flight request for the
    /// same user and parcel, including ones settled by another process.
    pub async fn on_land_claimed(&self, owner: Address, code: &str) {
        let mut state = self.state.lock().await;
        let matching: Vec<RequestId> = state
            .active
            .values()
            .filter(|r| r.user == owner && r.code == code)
            .map(|r| r.request_id)
            .collect();
        for request_id in matching {
            if let Err(e) = state.advance(request_id, RequestStatus::Claimed, "ledger", None) {
                debug!(%request_id, error = %e, "could not mark request claimed");
            }
        }
    }

    pub async fn request(&self, request_id: RequestId) -> Option<VerificationRequest> {
        self.state.lock().await.lookup(request_id).cloned()
    }

    /// Requests not yet in a terminal state.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.active.len()
    }

    /// Wait for background verification tasks to finish.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "verification task failed");
            }
        }
    }
}
