//! Token-guarded query slots.
//!
//! A [`QuerySlot`] tracks one named query of one mounted view. The view recomputes the
//! slot's key from its own state after every user action and calls
//! [`QuerySlot::sync`]; the slot issues a new [`RequestToken`] only when the key value
//! changed since the last issuance. Completions are accepted by
//! [`QuerySlot::complete`] only when they carry the slot's latest token, so a response
//! for a superseded key can never overwrite state derived from a newer one. The
//! transport is never asked to cancel anything.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Identity of one mounted view. Minted per mount so a remount never accepts a
/// completion addressed to an earlier instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(Uuid);

impl ViewId {
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view_{}", self.0.simple())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryName {
    GroupLabel,
    Network,
    Description,
    SharedGroups,
    GeneInfo,
    FlatmapOverlays,
    FlatmapImage,
    CalibrationImage,
    AuprcImage,
    Proteins,
    Interactions,
    Candidates,
    Downloads,
}

impl QueryName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GroupLabel => "group_label",
            Self::Network => "network",
            Self::Description => "description",
            Self::SharedGroups => "shared_groups",
            Self::GeneInfo => "gene_info",
            Self::FlatmapOverlays => "flatmap_overlays",
            Self::FlatmapImage => "flatmap_image",
            Self::CalibrationImage => "calibration_image",
            Self::AuprcImage => "auprc_image",
            Self::Proteins => "proteins",
            Self::Interactions => "interactions",
            Self::Candidates => "candidates",
            Self::Downloads => "downloads",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque marker for one issuance. `seq` increases monotonically per slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken {
    view: ViewId,
    query: QueryName,
    seq: u64,
}

impl RequestToken {
    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn query(&self) -> QueryName {
        self.query
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.view, self.query, self.seq)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl QueryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyQuery,
    TransportFailure,
    DomainError,
    StaleDiscard,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::TransportFailure => "transport_failure",
            Self::DomainError => "domain_error",
            Self::StaleDiscard => "stale_discard",
        }
    }
}

/// Classified failure of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Network, HTTP or decode failure reaching the backend.
    #[error("transport_failure:{0}")]
    Transport(String),
    /// The backend answered but reported the entity or relationship as absent/invalid.
    #[error("{0}")]
    Domain(String),
}

impl QueryError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::TransportFailure,
            Self::Domain(_) => ErrorKind::DomainError,
        }
    }
}

/// Whether a reissue keeps the previous data visible while the next fetch runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingTransition {
    Hard,
    Soft,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<QueryError>,
    pub token: Option<RequestToken>,
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            token: None,
        }
    }
}

impl<T> QueryResult<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn ready_data(&self) -> Option<&T> {
        match self.status {
            QueryStatus::Ready => self.data.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyDecision {
    Applied {
        seq: u64,
    },
    /// Superseded or invalidated token; nothing was mutated.
    Stale {
        latest: Option<u64>,
        incoming: u64,
    },
    /// The completion names a view or query this receiver does not own.
    Misrouted {
        incoming: u64,
    },
}

impl ApplyDecision {
    pub fn applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct QuerySlot<K, T> {
    name: QueryName,
    transition: LoadingTransition,
    active_key: Option<K>,
    next_seq: u64,
    result: QueryResult<T>,
}

impl<K, T> QuerySlot<K, T>
where
    K: Clone + PartialEq + fmt::Debug,
{
    pub fn new(name: QueryName, transition: LoadingTransition) -> Self {
        Self {
            name,
            transition,
            active_key: None,
            next_seq: 1,
            result: QueryResult::default(),
        }
    }

    pub fn name(&self) -> QueryName {
        self.name
    }

    pub fn result(&self) -> &QueryResult<T> {
        &self.result
    }

    pub fn active_key(&self) -> Option<&K> {
        self.active_key.as_ref()
    }

    pub fn latest_token(&self) -> Option<RequestToken> {
        self.result.token
    }

    /// Brings the slot in line with `key`.
    ///
    /// Returns the token to fetch with when a new issuance is needed. A `None` key
    /// parks the slot in `Idle` with no data and invalidates any in-flight token.
    pub fn sync(&mut self, view: ViewId, key: Option<K>) -> Option<RequestToken> {
        if key == self.active_key {
            return None;
        }
        match key {
            None => {
                tracing::debug!(query = %self.name, view = %view, "query parked");
                self.reset();
                None
            }
            Some(key) => Some(self.issue(view, key)),
        }
    }

    /// Reissues the active key, e.g. for an explicit retry. No-op when parked.
    pub fn reissue(&mut self, view: ViewId) -> Option<RequestToken> {
        let key = self.active_key.clone()?;
        Some(self.issue(view, key))
    }

    /// Reissues only when the last completion failed.
    pub fn retry(&mut self, view: ViewId) -> Option<RequestToken> {
        if self.result.status != QueryStatus::Failed {
            return None;
        }
        self.reissue(view)
    }

    /// Drops data, error and key. In-flight tokens become stale.
    pub fn reset(&mut self) {
        self.active_key = None;
        self.result = QueryResult::default();
    }

    pub fn complete(
        &mut self,
        token: RequestToken,
        outcome: Result<T, QueryError>,
    ) -> ApplyDecision {
        if token.query != self.name {
            return ApplyDecision::Misrouted {
                incoming: token.seq,
            };
        }
        if self.result.token != Some(token) {
            tracing::debug!(
                query = %self.name,
                incoming = token.seq,
                latest = ?self.result.token.map(|latest| latest.seq),
                "discarding stale response"
            );
            return ApplyDecision::Stale {
                latest: self.result.token.map(|latest| latest.seq),
                incoming: token.seq,
            };
        }

        match outcome {
            Ok(data) => {
                self.result.status = QueryStatus::Ready;
                self.result.data = Some(data);
                self.result.error = None;
            }
            Err(error) => {
                tracing::warn!(
                    query = %self.name,
                    token = %token,
                    kind = error.kind().label(),
                    "query failed"
                );
                self.result.status = QueryStatus::Failed;
                self.result.data = None;
                self.result.error = Some(error);
            }
        }
        ApplyDecision::Applied { seq: token.seq }
    }

    fn issue(&mut self, view: ViewId, key: K) -> RequestToken {
        let token = RequestToken {
            view,
            query: self.name,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.saturating_add(1);
        tracing::debug!(query = %self.name, token = %token, key = ?key, "query issued");

        self.active_key = Some(key);
        self.result.status = QueryStatus::Loading;
        self.result.error = None;
        self.result.token = Some(token);
        if self.transition == LoadingTransition::Hard {
            self.result.data = None;
        }
        token
    }
}

impl<K, T> fmt::Debug for QuerySlot<K, T>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySlot")
            .field("name", &self.name)
            .field("active_key", &self.active_key)
            .field("status", &self.result.status)
            .field("token", &self.result.token)
            .finish()
    }
}
