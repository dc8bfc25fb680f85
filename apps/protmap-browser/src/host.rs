//! Host loop: runs the requests a view hands out and feeds completions back in.
//!
//! Requests run concurrently on the tokio runtime and are applied in arrival order,
//! so out-of-order responses reach the view exactly as they would in a browser. The
//! view's request tokens decide what is kept.

use std::collections::HashMap;
use std::sync::Arc;

use protmap_core::{
    ApplyDecision, BrowserConfig, FetchCompletion, FetchRequest, FetchTransport, FrameBus,
    FrameError, MountedView, QueryError, RequestToken, ViewRoute, execute,
};
use serde_json::Value;
use tokio::task::{self, JoinSet};

/// Message recorded for a request whose task died before producing a completion.
pub const LOST_REQUEST_MESSAGE: &str = "request task ended without a response";

/// What happened to the completions drained by one [`Session::settle`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettleReport {
    pub applied: usize,
    pub stale: usize,
    pub misrouted: usize,
    pub lost: usize,
}

impl SettleReport {
    fn record(&mut self, decision: ApplyDecision) {
        match decision {
            ApplyDecision::Applied { .. } => self.applied += 1,
            ApplyDecision::Stale { .. } => self.stale += 1,
            ApplyDecision::Misrouted { .. } => self.misrouted += 1,
        }
    }

    fn merge(&mut self, other: Self) {
        self.applied += other.applied;
        self.stale += other.stale;
        self.misrouted += other.misrouted;
        self.lost += other.lost;
    }
}

/// One browser tab: the mounted view, the frame channel it listens on, and the
/// requests still in flight.
pub struct Session {
    transport: Arc<dyn FetchTransport>,
    config: BrowserConfig,
    frames: FrameBus,
    view: MountedView,
    in_flight: JoinSet<FetchCompletion>,
    tokens: HashMap<task::Id, RequestToken>,
}

impl Session {
    /// Mounts `route` and starts its initial requests. Requires a tokio runtime.
    pub fn open(
        transport: Arc<dyn FetchTransport>,
        config: BrowserConfig,
        route: &ViewRoute,
    ) -> Result<Self, FrameError> {
        let frames = FrameBus::new();
        let (view, requests) = MountedView::mount(route, &config, &frames)?;
        let mut session = Self {
            transport,
            config,
            frames,
            view,
            in_flight: JoinSet::new(),
            tokens: HashMap::new(),
        };
        session.dispatch(requests);
        Ok(session)
    }

    pub fn view(&self) -> &MountedView {
        &self.view
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Replaces the mounted view. Requests of the old view keep running and are
    /// discarded when they arrive.
    pub fn open_route(&mut self, route: &ViewRoute) -> Result<(), FrameError> {
        let (view, requests) = MountedView::mount(route, &self.config, &self.frames)?;
        self.view = view;
        self.dispatch(requests);
        Ok(())
    }

    /// Runs a user action against the view and dispatches whatever it issues.
    pub fn act<F>(&mut self, action: F)
    where
        F: FnOnce(&mut MountedView) -> Vec<FetchRequest>,
    {
        let requests = action(&mut self.view);
        self.dispatch(requests);
    }

    /// Delivers a raw message from an embedded frame. Returns how many listeners
    /// took it.
    pub fn post_frame_message(&self, message: &Value) -> usize {
        self.frames.dispatch(message)
    }

    pub fn dispatch(&mut self, requests: Vec<FetchRequest>) {
        for request in requests {
            let token = request.token;
            let transport = Arc::clone(&self.transport);
            let handle = self
                .in_flight
                .spawn(async move { execute(transport.as_ref(), request).await });
            self.tokens.insert(handle.id(), token);
        }
    }

    /// Applies completions as they arrive until nothing is in flight. A task that
    /// panics or is aborted completes its token as a transport failure.
    pub async fn settle(&mut self) -> SettleReport {
        let mut report = SettleReport::default();
        while let Some(joined) = self.in_flight.join_next_with_id().await {
            let completion = match joined {
                Ok((id, completion)) => {
                    self.tokens.remove(&id);
                    completion
                }
                Err(error) => {
                    tracing::warn!(error = %error, "fetch task ended without a completion");
                    report.lost += 1;
                    let Some(token) = self.tokens.remove(&error.id()) else {
                        continue;
                    };
                    FetchCompletion {
                        token,
                        outcome: Err(QueryError::transport(LOST_REQUEST_MESSAGE)),
                    }
                }
            };
            report.record(self.view.apply(completion));
        }
        tracing::debug!(
            applied = report.applied,
            stale = report.stale,
            misrouted = report.misrouted,
            lost = report.lost,
            "session settled"
        );
        report
    }

    /// Reissues failed queries up to `rounds` times, settling after each round.
    pub async fn retry_failed(&mut self, rounds: u8) -> SettleReport {
        let mut report = SettleReport::default();
        for _ in 0..rounds {
            let requests = self.view.retry_failed();
            if requests.is_empty() {
                break;
            }
            tracing::info!(requests = requests.len(), "retrying failed queries");
            self.dispatch(requests);
            report.merge(self.settle().await);
        }
        report
    }
}
