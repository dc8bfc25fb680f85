use crate::fetch::{FetchCompletion, FetchParams, FetchPayload, FetchRequest};
use crate::panels::{self, NO_DESCRIPTION_MESSAGE, PanelView};
use crate::query::{ApplyDecision, LoadingTransition, QueryName, QuerySlot, ViewId};
use crate::resolver::SearchKey;
use crate::views::{misrouted, retry_slot, sync_slot};

/// Drug page. Only the description is backed by data so far.
#[derive(Debug)]
pub struct DrugView {
    id: ViewId,
    key: SearchKey,
    description: QuerySlot<SearchKey, Option<String>>,
}

impl DrugView {
    pub fn mount(id: ViewId, key: SearchKey) -> (Self, Vec<FetchRequest>) {
        let mut view = Self {
            id,
            key,
            description: QuerySlot::new(QueryName::Description, LoadingTransition::Hard),
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

    pub fn navigate(&mut self, key: SearchKey) -> Vec<FetchRequest> {
        if key == self.key {
            return Vec::new();
        }
        self.key = key;
        self.description.reset();
        self.sync()
    }

    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        retry_slot(&mut self.description, self.id, description_params, &mut requests);
        requests
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        if completion.token.view() != self.id
            || completion.token.query() != QueryName::Description
        {
            return misrouted(&completion);
        }
        let FetchCompletion { token, outcome } = completion;
        self.description
            .complete(token, outcome.and_then(FetchPayload::into_description))
    }

    pub fn description_panel(&self) -> PanelView<'_, str> {
        panels::text_panel(self.description.result(), NO_DESCRIPTION_MESSAGE)
    }

    fn sync(&mut self) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        sync_slot(
            &mut self.description,
            self.id,
            Some(self.key.clone()),
            description_params,
            &mut requests,
        );
        requests
    }
}

fn description_params(key: &SearchKey) -> FetchParams {
    FetchParams::Description { key: key.clone() }
}
