use crate::config::BrowserConfig;
use crate::fetch::{FetchCompletion, FetchParams, FetchPayload, FetchRequest, Threshold};
use crate::panels::{
    self, NO_DESCRIPTION_MESSAGE, NO_INTERACTIONS_MESSAGE, NO_PROTEINS_MESSAGE, PanelView,
};
use crate::payload::{GeneInfo, Interaction, ScoredProtein};
use crate::query::{ApplyDecision, LoadingTransition, QueryName, QuerySlot, ViewId};
use crate::resolver::SearchKey;
use crate::views::search::gene_info_params;
use crate::views::{info_entity_key, misrouted, retry_slot, sync_slot};

/// Pathway page. Proteins and interactions share the `(pathway, threshold)` key but
/// complete and fail independently.
#[derive(Debug)]
pub struct PathwayView {
    id: ViewId,
    key: SearchKey,
    default_threshold: Threshold,
    threshold: Threshold,
    selected_info_entity: Option<SearchKey>,
    show_explanation: bool,
    description: QuerySlot<SearchKey, Option<String>>,
    proteins: QuerySlot<(SearchKey, Threshold), Vec<ScoredProtein>>,
    interactions: QuerySlot<(SearchKey, Threshold), Vec<Interaction>>,
    gene_info: QuerySlot<SearchKey, GeneInfo>,
}

impl PathwayView {
    pub fn mount(id: ViewId, key: SearchKey, config: &BrowserConfig) -> (Self, Vec<FetchRequest>) {
        let mut view = Self {
            id,
            key,
            default_threshold: config.default_threshold,
            threshold: config.default_threshold,
            selected_info_entity: None,
            show_explanation: false,
            description: QuerySlot::new(QueryName::Description, LoadingTransition::Hard),
            proteins: QuerySlot::new(QueryName::Proteins, LoadingTransition::Hard),
            interactions: QuerySlot::new(QueryName::Interactions, LoadingTransition::Hard),
            gene_info: QuerySlot::new(QueryName::GeneInfo, LoadingTransition::Hard),
        };
        let requests = view.sync();
        (view, requests)
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn key(&self) -> &SearchKey {
        &self.key
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn selected_info_entity(&self) -> Option<&str> {
        self.selected_info_entity.as_ref().map(SearchKey::value)
    }

    pub fn show_explanation(&self) -> bool {
        self.show_explanation
    }

    /// Switches to another pathway; threshold and selections go back to their defaults.
    pub fn navigate(&mut self, key: SearchKey) -> Vec<FetchRequest> {
        if key == self.key {
            return Vec::new();
        }
        tracing::info!(view = %self.id, from = %self.key, to = %key, "pathway key changed");
        self.key = key;
        self.threshold = self.default_threshold;
        self.selected_info_entity = None;
        self.show_explanation = false;
        self.description.reset();
        self.proteins.reset();
        self.interactions.reset();
        self.gene_info.reset();
        self.sync()
    }

    pub fn set_threshold(&mut self, threshold: Threshold) -> Vec<FetchRequest> {
        self.threshold = threshold;
        self.sync()
    }

    pub fn select_info_entity(&mut self, entity: Option<&str>) -> Vec<FetchRequest> {
        self.selected_info_entity = info_entity_key(entity);
        self.sync()
    }

    pub fn toggle_explanation(&mut self) {
        self.show_explanation = !self.show_explanation;
    }

    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        let id = self.id;
        let mut requests = Vec::new();
        retry_slot(&mut self.description, id, description_params, &mut requests);
        retry_slot(&mut self.proteins, id, proteins_params, &mut requests);
        retry_slot(&mut self.interactions, id, interactions_params, &mut requests);
        retry_slot(&mut self.gene_info, id, gene_info_params, &mut requests);
        requests
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        if completion.token.view() != self.id {
            return misrouted(&completion);
        }
        let FetchCompletion { token, outcome } = completion;
        match token.query() {
            QueryName::Description => self
                .description
                .complete(token, outcome.and_then(FetchPayload::into_description)),
            QueryName::Proteins => self
                .proteins
                .complete(token, outcome.and_then(FetchPayload::into_proteins)),
            QueryName::Interactions => self
                .interactions
                .complete(token, outcome.and_then(FetchPayload::into_interactions)),
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
            _ => misrouted(&FetchCompletion { token, outcome }),
        }
    }

    pub fn description_panel(&self) -> PanelView<'_, str> {
        panels::text_panel(self.description.result(), NO_DESCRIPTION_MESSAGE)
    }

    pub fn proteins_panel(&self) -> PanelView<'_, [ScoredProtein]> {
        panels::list_panel(self.proteins.result(), NO_PROTEINS_MESSAGE)
    }

    pub fn interactions_panel(&self) -> PanelView<'_, [Interaction]> {
        panels::list_panel(self.interactions.result(), NO_INTERACTIONS_MESSAGE)
    }

    pub fn gene_info_panel(&self) -> PanelView<'_, GeneInfo> {
        panels::gene_info_panel(self.selected_info_entity(), self.gene_info.result())
    }

    fn sync(&mut self) -> Vec<FetchRequest> {
        let id = self.id;
        let scoped = (self.key.clone(), self.threshold);
        let mut requests = Vec::new();
        sync_slot(
            &mut self.description,
            id,
            Some(self.key.clone()),
            description_params,
            &mut requests,
        );
        sync_slot(
            &mut self.proteins,
            id,
            Some(scoped.clone()),
            proteins_params,
            &mut requests,
        );
        sync_slot(
            &mut self.interactions,
            id,
            Some(scoped),
            interactions_params,
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

fn description_params(key: &SearchKey) -> FetchParams {
    FetchParams::Description { key: key.clone() }
}

fn proteins_params((key, threshold): &(SearchKey, Threshold)) -> FetchParams {
    FetchParams::Proteins {
        pathway: key.value().to_string(),
        threshold: *threshold,
    }
}

fn interactions_params((key, threshold): &(SearchKey, Threshold)) -> FetchParams {
    FetchParams::Interactions {
        pathway: key.value().to_string(),
        threshold: *threshold,
    }
}
