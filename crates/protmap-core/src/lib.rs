//! Client-side query orchestration for the protmap entity browser.
//!
//! The crate is sans-IO: views hand out [`FetchRequest`]s and accept
//! [`FetchCompletion`]s, and a host loop moves them across a [`FetchTransport`].
//! Everything a panel shows is a pure projection of view state (see [`panels`]).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod autocomplete;
pub mod config;
pub mod fetch;
pub mod frame;
pub mod panels;
pub mod payload;
pub mod query;
pub mod resolver;
pub mod views;

pub use autocomplete::{AutocompleteConfig, AutocompleteIndex, filter_candidates};
pub use config::{BrowserConfig, ConfigError};
pub use fetch::{
    FetchCompletion, FetchParams, FetchPayload, FetchRequest, FetchTransport, Threshold, execute,
};
pub use frame::{FrameBus, FrameError, FrameRegistration, ResizeSignal};
pub use panels::{PanelView, SharedPathwaysPanel};
pub use query::{
    ApplyDecision, ErrorKind, LoadingTransition, QueryError, QueryName, QueryResult, QuerySlot,
    QueryStatus, RequestToken, ViewId,
};
pub use resolver::{EntityKind, ResolveError, SearchKey, ViewRoute, resolve};
pub use views::{
    DownloadsView, DrugView, FlatmapSelection, HomeView, MountedView, PathwayView, SearchView,
};
