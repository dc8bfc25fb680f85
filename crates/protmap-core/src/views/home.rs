use crate::autocomplete::AutocompleteIndex;
use crate::config::BrowserConfig;
use crate::fetch::{FetchCompletion, FetchRequest};
use crate::query::{ApplyDecision, QueryName, ViewId};
use crate::resolver::{EntityKind, ResolveError, ViewRoute, resolve};
use crate::views::misrouted;

/// Landing page: entity kind selector, search input with suggestions, submit.
#[derive(Debug)]
pub struct HomeView {
    id: ViewId,
    kind: EntityKind,
    autocomplete: AutocompleteIndex,
    last_error: Option<ResolveError>,
}

impl HomeView {
    pub fn mount(id: ViewId, config: &BrowserConfig) -> (Self, Vec<FetchRequest>) {
        let mut view = Self {
            id,
            kind: EntityKind::Protein,
            autocomplete: AutocompleteIndex::new(id, config.autocomplete),
            last_error: None,
        };
        let requests = view.autocomplete.load(view.kind).into_iter().collect();
        (view, requests)
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn input(&self) -> &str {
        self.autocomplete.input()
    }

    pub fn suggestions(&self) -> &[String] {
        self.autocomplete.suggestions()
    }

    pub fn autocomplete(&self) -> &AutocompleteIndex {
        &self.autocomplete
    }

    pub fn last_error(&self) -> Option<&ResolveError> {
        self.last_error.as_ref()
    }

    /// Changes the entity kind. The input is cleared and the candidate list follows the
    /// new kind.
    pub fn set_kind(&mut self, kind: EntityKind) -> Vec<FetchRequest> {
        if kind == self.kind {
            return Vec::new();
        }
        self.kind = kind;
        self.last_error = None;
        self.autocomplete.clear();
        self.autocomplete.load(kind).into_iter().collect()
    }

    pub fn type_input(&mut self, text: &str) -> &[String] {
        self.last_error = None;
        self.autocomplete.filter(text)
    }

    pub fn select_suggestion(&mut self, candidate: &str) {
        self.autocomplete.select(candidate);
    }

    /// Resolves the current input into a destination route. An empty input is kept
    /// as the view's error and nothing navigates.
    pub fn submit(&mut self) -> Result<ViewRoute, ResolveError> {
        match resolve(self.autocomplete.input(), self.kind) {
            Ok(key) => {
                self.last_error = None;
                tracing::info!(view = %self.id, key = %key, "search submitted");
                Ok(key.route())
            }
            Err(error) => {
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        self.autocomplete.retry().into_iter().collect()
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        if completion.token.view() != self.id || completion.token.query() != QueryName::Candidates {
            return misrouted(&completion);
        }
        self.autocomplete
            .complete(completion.token, completion.outcome)
    }
}
