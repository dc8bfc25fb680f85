//! Pure projections from query results and selections to what a panel shows.
//!
//! Nothing here mutates view state or triggers fetches; hosts call these after every
//! applied completion or user action and render the returned value as-is.

use crate::payload::{GeneInfo, NeighborEntry, NetworkData, PathwayGroup, PathwayMember};
use crate::query::{QueryError, QueryResult, QueryStatus};

pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Could not reach the data service. Please try again.";
pub const NO_NETWORK_MESSAGE: &str = "No data available for this gene.";
pub const NO_DESCRIPTION_MESSAGE: &str = "No description available.";
pub const PICK_NEIGHBOR_MESSAGE: &str = "Select a neighbor gene";
pub const NO_SHARED_PATHWAYS_MESSAGE: &str = "No shared pathways found.";
pub const NO_GENE_SELECTED_MESSAGE: &str = "No gene selected.";
pub const NO_GENE_INFO_MESSAGE: &str = "No information available for this gene.";
pub const NO_PROTEINS_MESSAGE: &str = "No proteins found above threshold.";
pub const NO_INTERACTIONS_MESSAGE: &str = "No interactions found above threshold.";
pub const NO_OVERLAYS_MESSAGE: &str = "No pathway overlays available.";
pub const NO_IMAGE_MESSAGE: &str = "Image not available.";
pub const NO_DOWNLOADS_MESSAGE: &str = "No files available.";

/// User-facing text for a failed query. Domain messages pass through verbatim;
/// transport details never reach the user.
pub fn error_text(error: &QueryError) -> &str {
    match error {
        QueryError::Transport(_) => TRANSPORT_FAILURE_MESSAGE,
        QueryError::Domain(message) => message.as_str(),
    }
}

#[derive(Debug, PartialEq)]
pub enum PanelView<'a, D: ?Sized> {
    Idle,
    /// `previous` is only populated for soft-transition panels.
    Loading { previous: Option<&'a D> },
    Empty(&'static str),
    Error(&'a str),
    Ready(&'a D),
}

impl<D: ?Sized> Clone for PanelView<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for PanelView<'_, D> {}

impl<'a, D: ?Sized> PanelView<'a, D> {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Empty(_) => "empty",
            Self::Error(_) => "error",
            Self::Ready(_) => "ready",
        }
    }

    pub fn ready(&self) -> Option<&'a D> {
        match self {
            Self::Ready(data) => Some(*data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&'a str> {
        match self {
            Self::Empty(message) => Some(*message),
            Self::Error(message) => Some(*message),
            _ => None,
        }
    }
}

/// Projects `result` through `select`; a ready result that selects nothing is `Empty`.
pub fn project<'a, T, D>(
    result: &'a QueryResult<T>,
    empty_message: &'static str,
    select: impl Fn(&'a T) -> Option<&'a D>,
) -> PanelView<'a, D>
where
    D: ?Sized,
{
    match result.status {
        QueryStatus::Idle => PanelView::Idle,
        QueryStatus::Loading => PanelView::Loading {
            previous: result.data.as_ref().and_then(&select),
        },
        QueryStatus::Failed => PanelView::Error(
            result
                .error
                .as_ref()
                .map_or(TRANSPORT_FAILURE_MESSAGE, error_text),
        ),
        QueryStatus::Ready => match result.data.as_ref().and_then(&select) {
            Some(data) => PanelView::Ready(data),
            None => PanelView::Empty(empty_message),
        },
    }
}

pub fn non_empty<T>(items: &[T]) -> Option<&[T]> {
    (!items.is_empty()).then_some(items)
}

pub fn text_panel<'a>(
    result: &'a QueryResult<Option<String>>,
    empty_message: &'static str,
) -> PanelView<'a, str> {
    project(result, empty_message, |text| text.as_deref())
}

pub fn list_panel<'a, T>(
    result: &'a QueryResult<Vec<T>>,
    empty_message: &'static str,
) -> PanelView<'a, [T]> {
    project(result, empty_message, |items| non_empty(items.as_slice()))
}

pub fn network_panel(result: &QueryResult<NetworkData>) -> PanelView<'_, NetworkData> {
    project(result, NO_NETWORK_MESSAGE, |network| {
        (!network.neighbors.is_empty() || !network.plot.is_null()).then_some(network)
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborRow<'a> {
    pub rank: usize,
    pub entity_id: &'a str,
    pub similarity: f64,
    pub selected: bool,
}

/// Neighbor list in stored (descending similarity) order with the selection marked.
pub fn neighbor_rows<'a>(
    neighbors: &'a [NeighborEntry],
    selected: Option<&str>,
) -> Vec<NeighborRow<'a>> {
    neighbors
        .iter()
        .enumerate()
        .map(|(index, neighbor)| NeighborRow {
            rank: index + 1,
            entity_id: &neighbor.entity_id,
            similarity: neighbor.similarity,
            selected: selected == Some(neighbor.entity_id.as_str()),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow<'a> {
    pub group_label: &'a str,
    pub member_count: usize,
    pub expanded: bool,
    /// Empty while collapsed.
    pub members: &'a [PathwayMember],
}

#[derive(Clone, Debug, PartialEq)]
pub enum SharedPathwaysPanel<'a> {
    PickNeighbor,
    Loading,
    NoSharedPathways,
    Error(&'a str),
    Groups(Vec<GroupRow<'a>>),
}

impl SharedPathwaysPanel<'_> {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::PickNeighbor => Some(PICK_NEIGHBOR_MESSAGE),
            Self::NoSharedPathways => Some(NO_SHARED_PATHWAYS_MESSAGE),
            Self::Error(message) => Some(*message),
            Self::Loading | Self::Groups(_) => None,
        }
    }
}

pub fn shared_pathways_panel<'a>(
    selected_neighbor: Option<&str>,
    result: &'a QueryResult<Vec<PathwayGroup>>,
    expanded: Option<&str>,
) -> SharedPathwaysPanel<'a> {
    if selected_neighbor.is_none() {
        return SharedPathwaysPanel::PickNeighbor;
    }
    match project(result, NO_SHARED_PATHWAYS_MESSAGE, |groups| non_empty(groups.as_slice())) {
        PanelView::Idle => SharedPathwaysPanel::PickNeighbor,
        PanelView::Loading { .. } => SharedPathwaysPanel::Loading,
        PanelView::Empty(_) => SharedPathwaysPanel::NoSharedPathways,
        PanelView::Error(message) => SharedPathwaysPanel::Error(message),
        PanelView::Ready(groups) => SharedPathwaysPanel::Groups(
            groups
                .iter()
                .map(|group| {
                    let is_expanded = expanded == Some(group.group_label.as_str());
                    GroupRow {
                        group_label: &group.group_label,
                        member_count: group.members.len(),
                        expanded: is_expanded,
                        members: if is_expanded { group.members.as_slice() } else { &[] },
                    }
                })
                .collect(),
        ),
    }
}

pub fn gene_info_panel<'a>(
    selected_entity: Option<&str>,
    result: &'a QueryResult<GeneInfo>,
) -> PanelView<'a, GeneInfo> {
    if selected_entity.is_none() {
        return PanelView::Empty(NO_GENE_SELECTED_MESSAGE);
    }
    project(result, NO_GENE_INFO_MESSAGE, |info| {
        (!info.categories.is_empty()).then_some(info)
    })
}
