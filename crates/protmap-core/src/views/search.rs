use url::form_urlencoded;

use crate::config::BrowserConfig;
use crate::fetch::{FetchCompletion, FetchParams, FetchPayload, FetchRequest};
use crate::frame::{FrameBus, FrameError, FrameRegistration, STRUCTURE_PANEL};
use crate::panels::{
    self, NO_DESCRIPTION_MESSAGE, NO_IMAGE_MESSAGE, NO_OVERLAYS_MESSAGE, NeighborRow, PanelView,
    SharedPathwaysPanel,
};
use crate::payload::{GeneInfo, ImagePayload, NetworkData, PathwayGroup};
use crate::query::{ApplyDecision, LoadingTransition, QueryName, QuerySlot, ViewId};
use crate::resolver::SearchKey;
use crate::views::{info_entity_key, misrouted, retry_slot, sync_slot};

pub const STRUCTURE_FRAME_PATH: &str = "/panel1.html";

/// Flatmap image key: the searched gene plus the chosen overlay, `None` for default
/// coloring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatmapSelection {
    pub gene: String,
    pub overlay: Option<String>,
}

/// Protein page.
#[derive(Debug)]
pub struct SearchView {
    id: ViewId,
    key: SearchKey,
    top_k: u16,
    selected_neighbor: Option<String>,
    selected_info_entity: Option<SearchKey>,
    flatmap_overlay: Option<String>,
    expanded_group: Option<String>,
    frame: FrameRegistration,
    group_label: QuerySlot<SearchKey, Option<String>>,
    network: QuerySlot<(SearchKey, u16), NetworkData>,
    description: QuerySlot<SearchKey, Option<String>>,
    shared_groups: QuerySlot<(SearchKey, String), Vec<PathwayGroup>>,
    gene_info: QuerySlot<SearchKey, GeneInfo>,
    flatmap_overlays: QuerySlot<SearchKey, Vec<String>>,
    flatmap_image: QuerySlot<FlatmapSelection, ImagePayload>,
    calibration_image: QuerySlot<SearchKey, ImagePayload>,
    auprc_image: QuerySlot<SearchKey, ImagePayload>,
}

impl SearchView {
    pub fn mount(
        id: ViewId,
        key: SearchKey,
        config: &BrowserConfig,
        frames: &FrameBus,
    ) -> Result<(Self, Vec<FetchRequest>), FrameError> {
        let frame = frames.register(id)?;
        let mut view = Self {
            id,
            key,
            top_k: config.network_top_k,
            selected_neighbor: None,
            selected_info_entity: None,
            flatmap_overlay: None,
            expanded_group: None,
            frame,
            group_label: QuerySlot::new(QueryName::GroupLabel, LoadingTransition::Hard),
            network: QuerySlot::new(QueryName::Network, LoadingTransition::Hard),
            description: QuerySlot::new(QueryName::Description, LoadingTransition::Hard),
            shared_groups: QuerySlot::new(QueryName::SharedGroups, LoadingTransition::Hard),
            gene_info: QuerySlot::new(QueryName::GeneInfo, LoadingTransition::Hard),
            flatmap_overlays: QuerySlot::new(QueryName::FlatmapOverlays, LoadingTransition::Hard),
            flatmap_image: QuerySlot::new(QueryName::FlatmapImage, LoadingTransition::Soft),
            calibration_image: QuerySlot::new(QueryName::CalibrationImage, LoadingTransition::Soft),
            auprc_image: QuerySlot::new(QueryName::AuprcImage, LoadingTransition::Soft),
        };
        let requests = view.sync();
        Ok((view, requests))
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn key(&self) -> &SearchKey {
        &self.key
    }

    pub fn selected_neighbor(&self) -> Option<&str> {
        self.selected_neighbor.as_deref()
    }

    pub fn selected_info_entity(&self) -> Option<&str> {
        self.selected_info_entity.as_ref().map(SearchKey::value)
    }

    pub fn flatmap_overlay(&self) -> Option<&str> {
        self.flatmap_overlay.as_deref()
    }

    pub fn expanded_group(&self) -> Option<&str> {
        self.expanded_group.as_deref()
    }

    /// Switches the page to another protein. Every selection and every result of the
    /// previous key is dropped before the new key's queries are issued.
    pub fn navigate(&mut self, key: SearchKey) -> Vec<FetchRequest> {
        if key == self.key {
            return Vec::new();
        }
        tracing::info!(view = %self.id, from = %self.key, to = %key, "search key changed");
        self.key = key;
        self.selected_neighbor = None;
        self.selected_info_entity = None;
        self.flatmap_overlay = None;
        self.expanded_group = None;
        self.group_label.reset();
        self.network.reset();
        self.description.reset();
        self.shared_groups.reset();
        self.gene_info.reset();
        self.flatmap_overlays.reset();
        self.flatmap_image.reset();
        self.calibration_image.reset();
        self.auprc_image.reset();
        self.sync()
    }

    /// Picks a neighbor from the loaded list, or clears the pick with `None`. A name
    /// that is not in the list is ignored.
    pub fn select_neighbor(&mut self, neighbor: Option<&str>) -> Vec<FetchRequest> {
        let next = match neighbor.map(str::trim).filter(|value| !value.is_empty()) {
            None => None,
            Some(raw) => {
                let known = self
                    .network
                    .result()
                    .ready_data()
                    .and_then(|network| network.neighbor(raw))
                    .map(|entry| entry.entity_id.clone());
                if known.is_none() {
                    tracing::debug!(view = %self.id, neighbor = raw, "ignoring unknown neighbor");
                    return Vec::new();
                }
                known
            }
        };
        if next != self.selected_neighbor {
            self.expanded_group = None;
        }
        self.selected_neighbor = next;
        self.sync()
    }

    /// Chooses whose metadata the gene info panel shows.
    pub fn select_info_entity(&mut self, entity: Option<&str>) -> Vec<FetchRequest> {
        self.selected_info_entity = info_entity_key(entity);
        self.sync()
    }

    /// Colors the flatmap by `overlay`, or default coloring with `None`. Overlays not
    /// in the loaded candidate list are ignored.
    pub fn select_flatmap_overlay(&mut self, overlay: Option<&str>) -> Vec<FetchRequest> {
        let overlay = overlay.map(str::trim).filter(|value| !value.is_empty());
        if let Some(name) = overlay {
            let available = self
                .flatmap_overlays
                .result()
                .ready_data()
                .is_some_and(|names| names.iter().any(|candidate| candidate == name));
            if !available {
                tracing::debug!(
                    view = %self.id,
                    overlay = name,
                    "ignoring unknown flatmap overlay"
                );
                return Vec::new();
            }
        }
        self.flatmap_overlay = overlay.map(str::to_string);
        self.sync()
    }

    /// Expands `label`, collapsing any other group; toggling the expanded group
    /// collapses it. Purely local, never refetches.
    pub fn toggle_group(&mut self, label: &str) {
        let exists = self
            .shared_groups
            .result()
            .ready_data()
            .is_some_and(|groups| groups.iter().any(|group| group.group_label == label));
        if !exists {
            return;
        }
        if self.expanded_group.as_deref() == Some(label) {
            self.expanded_group = None;
        } else {
            self.expanded_group = Some(label.to_string());
        }
    }

    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        let id = self.id;
        let mut requests = Vec::new();
        retry_slot(&mut self.group_label, id, group_label_params, &mut requests);
        retry_slot(&mut self.network, id, network_params, &mut requests);
        retry_slot(&mut self.description, id, description_params, &mut requests);
        retry_slot(&mut self.flatmap_overlays, id, flatmap_overlays_params, &mut requests);
        retry_slot(&mut self.flatmap_image, id, flatmap_image_params, &mut requests);
        retry_slot(&mut self.calibration_image, id, calibration_params, &mut requests);
        retry_slot(&mut self.auprc_image, id, auprc_params, &mut requests);
        retry_slot(&mut self.shared_groups, id, shared_groups_params, &mut requests);
        retry_slot(&mut self.gene_info, id, gene_info_params, &mut requests);
        requests
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        if completion.token.view() != self.id {
            return misrouted(&completion);
        }
        let FetchCompletion { token, outcome } = completion;
        match token.query() {
            QueryName::GroupLabel => self
                .group_label
                .complete(token, outcome.and_then(FetchPayload::into_group_label)),
            QueryName::Network => self
                .network
                .complete(token, outcome.and_then(FetchPayload::into_network)),
            QueryName::Description => self
                .description
                .complete(token, outcome.and_then(FetchPayload::into_description)),
            QueryName::SharedGroups => self
                .shared_groups
                .complete(token, outcome.and_then(FetchPayload::into_groups)),
            QueryName::GeneInfo => {
                let entity = self
                    .gene_info
                    .active_key()
                    .map(|key| key.value().to_string())
                    .unwrap_or_default();
                self.gene_info.complete(
                    token,
                    outcome.and_then(|payload| payload.into_gene_info(&entity)),
                )
            }
            QueryName::FlatmapOverlays => self
                .flatmap_overlays
                .complete(token, outcome.and_then(FetchPayload::into_names)),
            QueryName::FlatmapImage => self
                .flatmap_image
                .complete(token, outcome.and_then(FetchPayload::into_image)),
            QueryName::CalibrationImage => self
                .calibration_image
                .complete(token, outcome.and_then(FetchPayload::into_image)),
            QueryName::AuprcImage => self
                .auprc_image
                .complete(token, outcome.and_then(FetchPayload::into_image)),
            QueryName::Proteins
            | QueryName::Interactions
            | QueryName::Candidates
            | QueryName::Downloads => misrouted(&FetchCompletion { token, outcome }),
        }
    }

    pub fn group_label_panel(&self) -> PanelView<'_, str> {
        panels::text_panel(self.group_label.result(), "")
    }

    pub fn network_panel(&self) -> PanelView<'_, NetworkData> {
        panels::network_panel(self.network.result())
    }

    pub fn neighbor_rows(&self) -> Vec<NeighborRow<'_>> {
        self.network
            .result()
            .ready_data()
            .map(|network| panels::neighbor_rows(&network.neighbors, self.selected_neighbor()))
            .unwrap_or_default()
    }

    pub fn description_panel(&self) -> PanelView<'_, str> {
        panels::text_panel(self.description.result(), NO_DESCRIPTION_MESSAGE)
    }

    pub fn shared_pathways_panel(&self) -> SharedPathwaysPanel<'_> {
        panels::shared_pathways_panel(
            self.selected_neighbor(),
            self.shared_groups.result(),
            self.expanded_group(),
        )
    }

    pub fn gene_info_panel(&self) -> PanelView<'_, GeneInfo> {
        panels::gene_info_panel(self.selected_info_entity(), self.gene_info.result())
    }

    pub fn flatmap_overlays_panel(&self) -> PanelView<'_, [String]> {
        panels::list_panel(self.flatmap_overlays.result(), NO_OVERLAYS_MESSAGE)
    }

    pub fn flatmap_image_panel(&self) -> PanelView<'_, ImagePayload> {
        panels::project(self.flatmap_image.result(), NO_IMAGE_MESSAGE, Some)
    }

    pub fn calibration_panel(&self) -> PanelView<'_, ImagePayload> {
        panels::project(self.calibration_image.result(), NO_IMAGE_MESSAGE, Some)
    }

    pub fn auprc_panel(&self) -> PanelView<'_, ImagePayload> {
        panels::project(self.auprc_image.result(), NO_IMAGE_MESSAGE, Some)
    }

    /// Source of the embedded 3D structure frame.
    pub fn structure_frame_src(&self) -> String {
        let gene: String = form_urlencoded::byte_serialize(self.key.value().as_bytes()).collect();
        format!("{STRUCTURE_FRAME_PATH}?gene={gene}")
    }

    pub fn structure_frame_height(&self) -> u32 {
        self.frame.height(STRUCTURE_PANEL)
    }

    fn sync(&mut self) -> Vec<FetchRequest> {
        let id = self.id;
        let key = self.key.clone();
        let mut requests = Vec::new();
        sync_slot(&mut self.group_label, id, Some(key.clone()), group_label_params, &mut requests);
        sync_slot(
            &mut self.network,
            id,
            Some((key.clone(), self.top_k)),
            network_params,
            &mut requests,
        );
        sync_slot(&mut self.description, id, Some(key.clone()), description_params, &mut requests);
        sync_slot(
            &mut self.flatmap_overlays,
            id,
            Some(key.clone()),
            flatmap_overlays_params,
            &mut requests,
        );
        sync_slot(
            &mut self.flatmap_image,
            id,
            Some(FlatmapSelection {
                gene: key.value().to_string(),
                overlay: self.flatmap_overlay.clone(),
            }),
            flatmap_image_params,
            &mut requests,
        );
        sync_slot(
            &mut self.calibration_image,
            id,
            Some(key.clone()),
            calibration_params,
            &mut requests,
        );
        sync_slot(&mut self.auprc_image, id, Some(key.clone()), auprc_params, &mut requests);
        sync_slot(
            &mut self.shared_groups,
            id,
            self.selected_neighbor
                .clone()
                .map(|neighbor| (key, neighbor)),
            shared_groups_params,
            &mut requests,
        );
        sync_slot(
            &mut self.gene_info,
            id,
            self.selected_info_entity.clone(),
            gene_info_params,
            &mut requests,
        );
        requests
    }
}

fn group_label_params(key: &SearchKey) -> FetchParams {
    FetchParams::GroupLabel {
        gene: key.value().to_string(),
    }
}

fn network_params((key, top_k): &(SearchKey, u16)) -> FetchParams {
    FetchParams::Network {
        gene: key.value().to_string(),
        top_k: *top_k,
    }
}

fn description_params(key: &SearchKey) -> FetchParams {
    FetchParams::Description { key: key.clone() }
}

fn shared_groups_params((key, neighbor): &(SearchKey, String)) -> FetchParams {
    FetchParams::SharedGroups {
        query: key.value().to_string(),
        neighbor: neighbor.clone(),
    }
}

pub(crate) fn gene_info_params(entity: &SearchKey) -> FetchParams {
    FetchParams::GeneInfo {
        gene: entity.value().to_string(),
    }
}

fn flatmap_overlays_params(key: &SearchKey) -> FetchParams {
    FetchParams::FlatmapOverlays {
        gene: key.value().to_string(),
    }
}

fn flatmap_image_params(selection: &FlatmapSelection) -> FetchParams {
    FetchParams::FlatmapImage {
        gene: selection.gene.clone(),
        overlay: selection.overlay.clone(),
    }
}

fn calibration_params(key: &SearchKey) -> FetchParams {
    FetchParams::CalibrationImage {
        gene: key.value().to_string(),
    }
}

fn auprc_params(key: &SearchKey) -> FetchParams {
    FetchParams::AuprcImage {
        gene: key.value().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{NeighborRecord, NetworkPayload, PathwayListPayload};
    use crate::query::{QueryError, QueryStatus};
    use crate::resolver::{EntityKind, resolve};
    use serde_json::json;

    fn mounted(gene: &str) -> (SearchView, Vec<FetchRequest>, FrameBus) {
        let frames = FrameBus::new();
        let key = resolve(gene, EntityKind::Protein).expect("key");
        let (view, requests) =
            SearchView::mount(ViewId::mint(), key, &BrowserConfig::default(), &frames)
                .expect("mount");
        (view, requests, frames)
    }

    fn request_for(requests: &[FetchRequest], query: QueryName) -> FetchRequest {
        requests
            .iter()
            .find(|request| request.token.query() == query)
            .cloned()
            .expect("request issued")
    }

    fn network(neighbors: &[(&str, f64)]) -> FetchPayload {
        FetchPayload::Network(NetworkPayload {
            plot: json!({"data": []}),
            neighbors: neighbors
                .iter()
                .map(|(id, similarity)| NeighborRecord {
                    entity_id: (*id).to_string(),
                    similarity: Some(*similarity),
                })
                .collect(),
            error: None,
        })
    }

    fn complete(view: &mut SearchView, request: &FetchRequest, payload: FetchPayload) {
        let decision = view.apply(FetchCompletion {
            token: request.token,
            outcome: Ok(payload),
        });
        assert!(decision.applied(), "{decision:?}");
    }

    #[test]
    fn mount_issues_every_key_only_query_once() {
        let (view, requests, _frames) = mounted("ada2");
        let names: Vec<QueryName> = requests.iter().map(|request| request.token.query()).collect();
        assert_eq!(
            names,
            vec![
                QueryName::GroupLabel,
                QueryName::Network,
                QueryName::Description,
                QueryName::FlatmapOverlays,
                QueryName::FlatmapImage,
                QueryName::CalibrationImage,
                QueryName::AuprcImage,
            ]
        );
        assert_eq!(
            request_for(&requests, QueryName::Network).params,
            FetchParams::Network {
                gene: "ADA2".to_string(),
                top_k: 10,
            }
        );
        assert_eq!(view.structure_frame_src(), "/panel1.html?gene=ADA2");
        assert!(matches!(view.shared_pathways_panel(), SharedPathwaysPanel::PickNeighbor));
    }

    #[test]
    fn neighbor_selection_drives_shared_groups() {
        let (mut view, requests, _frames) = mounted("TP53");
        complete(
            &mut view,
            &request_for(&requests, QueryName::Network),
            network(&[("MDM2", 0.4), ("CDKN1A", 0.8)]),
        );
        assert_eq!(view.neighbor_rows()[0].entity_id, "CDKN1A");

        assert!(view.select_neighbor(Some("BRCA2")).is_empty());
        assert_eq!(view.selected_neighbor(), None);

        let issued = view.select_neighbor(Some("mdm2"));
        assert_eq!(issued.len(), 1);
        assert_eq!(
            issued[0].params,
            FetchParams::SharedGroups {
                query: "TP53".to_string(),
                neighbor: "MDM2".to_string(),
            }
        );
        assert!(matches!(view.shared_pathways_panel(), SharedPathwaysPanel::Loading));
        assert!(view.select_neighbor(Some("MDM2")).is_empty());

        assert!(view.select_neighbor(None).is_empty());
        assert!(matches!(view.shared_pathways_panel(), SharedPathwaysPanel::PickNeighbor));
    }

    #[test]
    fn group_toggle_is_local_and_single() {
        let (mut view, requests, _frames) = mounted("TP53");
        complete(&mut view, &request_for(&requests, QueryName::Network), network(&[("MDM2", 0.4)]));
        let issued = view.select_neighbor(Some("MDM2"));
        complete(
            &mut view,
            &issued[0],
            FetchPayload::SharedGroups(
                serde_json::from_value(json!({"groups": [
                    {"Group10": "Immune", "pathway_id": ["P1"]},
                    {"Group10": "Signaling", "pathway_id": ["S1", "S2"]}
                ]}))
                .expect("groups"),
            ),
        );

        view.toggle_group("Immune");
        view.toggle_group("Signaling");
        assert_eq!(view.expanded_group(), Some("Signaling"));
        view.toggle_group("Signaling");
        assert_eq!(view.expanded_group(), None);
        view.toggle_group("Unknown");
        assert_eq!(view.expanded_group(), None);
    }

    #[test]
    fn flatmap_overlay_must_be_a_loaded_candidate() {
        let (mut view, requests, _frames) = mounted("TP53");
        let image = request_for(&requests, QueryName::FlatmapImage);
        complete(
            &mut view,
            &image,
            FetchPayload::Image(ImagePayload {
                content_type: "image/png".to_string(),
                bytes: vec![1],
            }),
        );
        assert!(view.select_flatmap_overlay(Some("KEGG_P53")).is_empty());

        complete(
            &mut view,
            &request_for(&requests, QueryName::FlatmapOverlays),
            FetchPayload::PathwayList(PathwayListPayload {
                pathways: vec!["KEGG_P53".to_string()],
                error: None,
            }),
        );
        let issued = view.select_flatmap_overlay(Some("KEGG_P53"));
        assert_eq!(
            issued[0].params,
            FetchParams::FlatmapImage {
                gene: "TP53".to_string(),
                overlay: Some("KEGG_P53".to_string()),
            }
        );
        assert!(matches!(
            view.flatmap_image_panel(),
            PanelView::Loading { previous: Some(_) }
        ));
    }

    #[test]
    fn navigation_drops_everything_from_the_previous_key() {
        let (mut view, requests, _frames) = mounted("ADA2");
        complete(&mut view, &request_for(&requests, QueryName::Network), network(&[("MDM2", 0.4)]));
        view.select_neighbor(Some("MDM2"));
        view.select_info_entity(Some("MDM2"));

        let issued = view.navigate(resolve("BRCA1", EntityKind::Protein).expect("key"));
        assert_eq!(issued.len(), 7);
        assert_eq!(view.selected_neighbor(), None);
        assert_eq!(view.selected_info_entity(), None);
        assert!(matches!(view.network_panel(), PanelView::Loading { previous: None }));
        assert!(matches!(view.calibration_panel(), PanelView::Loading { previous: None }));
        assert!(view.navigate(resolve("brca1", EntityKind::Protein).expect("key")).is_empty());
    }

    #[test]
    fn failed_panels_retry_without_touching_ready_ones() {
        let (mut view, requests, _frames) = mounted("ADA2");
        let calibration = request_for(&requests, QueryName::CalibrationImage);
        view.apply(FetchCompletion {
            token: calibration.token,
            outcome: Err(QueryError::domain("Calibration plot not found")),
        });
        complete(&mut view, &request_for(&requests, QueryName::Network), network(&[]));

        assert_eq!(view.calibration_panel(), PanelView::Error("Calibration plot not found"));
        let retried = view.retry_failed();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].token.query(), QueryName::CalibrationImage);
        assert_eq!(view.network.result().status, QueryStatus::Ready);
    }

    #[test]
    fn structure_frame_height_follows_resize_signals() {
        let (view, _requests, frames) = mounted("ADA2");
        assert_eq!(view.structure_frame_height(), 600);
        frames.dispatch(&json!({"type": "resize-panel", "panel": "panel1", "height": 420}));
        assert_eq!(view.structure_frame_height(), 420);
    }
}
