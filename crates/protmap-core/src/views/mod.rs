//! One state machine per page. Each view owns its selections and query slots; every
//! user action returns the requests it newly issued, and every completion goes back
//! through [`MountedView::apply`].

mod downloads;
mod drug;
mod home;
mod pathway;
mod search;

pub use downloads::DownloadsView;
pub use drug::DrugView;
pub use home::HomeView;
pub use pathway::PathwayView;
pub use search::{FlatmapSelection, STRUCTURE_FRAME_PATH, SearchView};

use std::fmt;

use crate::config::BrowserConfig;
use crate::fetch::{FetchCompletion, FetchParams, FetchRequest};
use crate::frame::{FrameBus, FrameError};
use crate::query::{ApplyDecision, QuerySlot, ViewId};
use crate::resolver::{EntityKind, SearchKey, ViewRoute, resolve};

/// Syncs `slot` to `key` and records the request if a new token was issued.
pub(crate) fn sync_slot<K, T>(
    slot: &mut QuerySlot<K, T>,
    view: ViewId,
    key: Option<K>,
    params: fn(&K) -> FetchParams,
    requests: &mut Vec<FetchRequest>,
) where
    K: Clone + PartialEq + fmt::Debug,
{
    let Some(token) = slot.sync(view, key) else {
        return;
    };
    if let Some(active) = slot.active_key() {
        requests.push(FetchRequest {
            token,
            params: params(active),
        });
    }
}

pub(crate) fn retry_slot<K, T>(
    slot: &mut QuerySlot<K, T>,
    view: ViewId,
    params: fn(&K) -> FetchParams,
    requests: &mut Vec<FetchRequest>,
) where
    K: Clone + PartialEq + fmt::Debug,
{
    let Some(token) = slot.retry(view) else {
        return;
    };
    if let Some(active) = slot.active_key() {
        requests.push(FetchRequest {
            token,
            params: params(active),
        });
    }
}

pub(crate) fn misrouted(completion: &FetchCompletion) -> ApplyDecision {
    tracing::debug!(token = %completion.token, "completion does not belong to this view");
    ApplyDecision::Misrouted {
        incoming: completion.token.seq(),
    }
}

/// Normalizes a clicked protein id like a searched one; blank means no selection.
pub(crate) fn info_entity_key(raw: Option<&str>) -> Option<SearchKey> {
    raw.and_then(|raw| resolve(raw, EntityKind::Protein).ok())
}

#[derive(Debug)]
pub enum MountedView {
    Home(HomeView),
    Search(SearchView),
    Pathway(PathwayView),
    Drug(DrugView),
    Downloads(DownloadsView),
}

impl MountedView {
    /// Mounts a fresh view instance for `route` and returns its initial requests.
    pub fn mount(
        route: &ViewRoute,
        config: &BrowserConfig,
        frames: &FrameBus,
    ) -> Result<(Self, Vec<FetchRequest>), FrameError> {
        let id = ViewId::mint();
        let (view, requests) = match route {
            ViewRoute::Home => {
                let (view, requests) = HomeView::mount(id, config);
                (Self::Home(view), requests)
            }
            ViewRoute::Downloads => {
                let (view, requests) = DownloadsView::mount(id);
                (Self::Downloads(view), requests)
            }
            ViewRoute::Entity(key) => match key.kind() {
                EntityKind::Protein => {
                    let (view, requests) = SearchView::mount(id, key.clone(), config, frames)?;
                    (Self::Search(view), requests)
                }
                EntityKind::Pathway => {
                    let (view, requests) = PathwayView::mount(id, key.clone(), config);
                    (Self::Pathway(view), requests)
                }
                EntityKind::Drug => {
                    let (view, requests) = DrugView::mount(id, key.clone());
                    (Self::Drug(view), requests)
                }
            },
        };
        tracing::info!(
            view = %id,
            route = %route.path(),
            requests = requests.len(),
            "view mounted"
        );
        Ok((view, requests))
    }

    pub fn id(&self) -> ViewId {
        match self {
            Self::Home(view) => view.id(),
            Self::Search(view) => view.id(),
            Self::Pathway(view) => view.id(),
            Self::Drug(view) => view.id(),
            Self::Downloads(view) => view.id(),
        }
    }

    pub fn route(&self) -> ViewRoute {
        match self {
            Self::Home(_) => ViewRoute::Home,
            Self::Search(view) => view.key().route(),
            Self::Pathway(view) => view.key().route(),
            Self::Drug(view) => view.key().route(),
            Self::Downloads(_) => ViewRoute::Downloads,
        }
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        match self {
            Self::Home(view) => view.apply(completion),
            Self::Search(view) => view.apply(completion),
            Self::Pathway(view) => view.apply(completion),
            Self::Drug(view) => view.apply(completion),
            Self::Downloads(view) => view.apply(completion),
        }
    }

    /// Reissues every failed query of the view. Nothing is retried automatically.
    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        match self {
            Self::Home(view) => view.retry_failed(),
            Self::Search(view) => view.retry_failed(),
            Self::Pathway(view) => view.retry_failed(),
            Self::Drug(view) => view.retry_failed(),
            Self::Downloads(view) => view.retry_failed(),
        }
    }
}
