//! Throttling gate: admission decisions for validation requests.

use super::registry::{Admission, SessionRegistry};
use crate::error::{CanvassError, Result, ThrottleScope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Throttling limits and lifecycle intervals.
///
/// The per-session limit bounds how fast one respondent can trigger LLM
/// calls; the origin limit is a much coarser ceiling applied first, shared
/// by every session from the same origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum admitted requests per session within the session window.
    #[serde(default = "default_session_max")]
    pub session_max_per_window: usize,
    /// Session window length in seconds.
    #[serde(default = "default_session_window_secs")]
    pub session_window_secs: u64,
    /// Maximum admitted requests per origin within the origin window.
    #[serde(default = "default_origin_max")]
    pub origin_max_per_window: usize,
    /// Origin window length in seconds.
    #[serde(default = "default_origin_window_secs")]
    pub origin_window_secs: u64,
    /// Idle time after which a session is evicted by the sweep.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Interval between background sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_session_max() -> usize {
    10
}

fn default_session_window_secs() -> u64 {
    60
}

fn default_origin_max() -> usize {
    100
}

fn default_origin_window_secs() -> u64 {
    900
}

fn default_stale_after_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            session_max_per_window: default_session_max(),
            session_window_secs: default_session_window_secs(),
            origin_max_per_window: default_origin_max(),
            origin_window_secs: default_origin_window_secs(),
            stale_after_secs: default_stale_after_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Read-only throttling state for one session, for rendering remaining
/// budget without consuming a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleStatus {
    pub requests_in_window: usize,
    pub max_per_window: usize,
    pub window_secs: u64,
}

/// Decides, per incoming validation request, whether to admit it.
///
/// Two registries back the gate: one keyed by session token, one keyed by
/// origin. The origin gate is consulted first. Rejections are surfaced as
/// [`CanvassError::Throttled`] with retry-after metadata and are never
/// retried internally; waiting or informing the respondent is the
/// caller's decision.
#[derive(Debug)]
pub struct ThrottleGate {
    config: ThrottleConfig,
    sessions: SessionRegistry,
    origins: SessionRegistry,
}

impl ThrottleGate {
    /// Creates a gate with the given limits.
    pub fn new(config: ThrottleConfig) -> Self {
        let sessions = SessionRegistry::new(Duration::from_secs(config.session_window_secs));
        let origins = SessionRegistry::new(Duration::from_secs(config.origin_window_secs));
        Self {
            config,
            sessions,
            origins,
        }
    }

    /// The configured limits.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Issues a new opaque session token.
    pub async fn issue_session(&self) -> String {
        self.sessions.issue(Instant::now()).await
    }

    /// Admits or rejects one validation request.
    ///
    /// On admission the request is recorded against both scopes and the
    /// resulting per-session in-window count is returned. Check-then-record
    /// is atomic per scope (see the registry's admission primitive).
    pub async fn admit(
        &self,
        session_id: &str,
        origin: Option<&str>,
        now: Instant,
    ) -> Result<usize> {
        if let Some(origin) = origin {
            if let Admission::Limited { retry_after } = self
                .origins
                .try_record(origin, now, self.config.origin_max_per_window)
                .await
            {
                debug!(origin, "origin throttle limit hit");
                return Err(CanvassError::throttled(
                    ThrottleScope::Origin,
                    retry_after_secs(retry_after),
                ));
            }
        }

        match self
            .sessions
            .try_record(session_id, now, self.config.session_max_per_window)
            .await
        {
            Admission::Admitted { count } => Ok(count),
            Admission::Limited { retry_after } => {
                debug!(session_id, "session throttle limit hit");
                Err(CanvassError::throttled(
                    ThrottleScope::Session,
                    retry_after_secs(retry_after),
                ))
            }
        }
    }

    /// Read-only throttling status for a session. Never mutates state.
    pub async fn status(&self, session_id: &str, now: Instant) -> ThrottleStatus {
        ThrottleStatus {
            requests_in_window: self.sessions.count_in_window(session_id, now).await,
            max_per_window: self.config.session_max_per_window,
            window_secs: self.config.session_window_secs,
        }
    }

    /// Evicts stale sessions and origins. Returns evicted counts per scope.
    pub async fn sweep(&self, now: Instant) -> (usize, usize) {
        let stale_after = Duration::from_secs(self.config.stale_after_secs);
        let sessions = self.sessions.sweep(now, stale_after).await;
        let origins = self.origins.sweep(now, stale_after).await;
        (sessions, origins)
    }

    /// Spawns the periodic sweep task. Runs until the handle is aborted or
    /// the runtime shuts down, independent of request traffic.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(gate.config.sweep_interval_secs));
            // The first tick fires immediately; skip it so a fresh gate is
            // not swept at startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                let (sessions, origins) = gate.sweep(Instant::now()).await;
                if sessions + origins > 0 {
                    debug!(sessions, origins, "throttle sweep evicted stale entries");
                }
            }
        })
    }
}

/// Rounds a retry-after duration up to whole seconds, at least one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}
