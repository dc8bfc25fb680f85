//! Candidate list and prefix suggestions for the search input.

use crate::fetch::{FetchParams, FetchPayload, FetchRequest};
use crate::query::{
    ApplyDecision, LoadingTransition, QueryError, QueryName, QuerySlot, QueryStatus,
    RequestToken, ViewId,
};
use crate::resolver::EntityKind;

pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutocompleteConfig {
    pub max_suggestions: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// Case-insensitive `starts_with` over `candidates`, in their original order.
/// A blank prefix matches nothing.
pub fn filter_candidates<'a>(candidates: &'a [String], prefix: &str, limit: usize) -> Vec<&'a str> {
    let prefix = prefix.trim_start();
    if prefix.trim().is_empty() {
        return Vec::new();
    }
    let needle = prefix.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
        .take(limit)
        .map(String::as_str)
        .collect()
}

#[derive(Debug)]
pub struct AutocompleteIndex {
    view: ViewId,
    config: AutocompleteConfig,
    candidates: QuerySlot<EntityKind, Vec<String>>,
    input: String,
    suggestions: Vec<String>,
}

impl AutocompleteIndex {
    pub fn new(view: ViewId, config: AutocompleteConfig) -> Self {
        Self {
            view,
            config,
            candidates: QuerySlot::new(QueryName::Candidates, LoadingTransition::Hard),
            input: String::new(),
            suggestions: Vec::new(),
        }
    }

    /// Switches the candidate source to `kind`. Kinds without a candidate list clear
    /// the index without fetching.
    pub fn load(&mut self, kind: EntityKind) -> Option<FetchRequest> {
        let key = kind.has_candidates().then_some(kind);
        let token = self.candidates.sync(self.view, key);
        self.refresh_suggestions();
        token.map(|token| FetchRequest {
            token,
            params: FetchParams::Candidates { kind },
        })
    }

    /// Retries a failed candidate fetch.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if self.candidates.result().status != QueryStatus::Failed {
            return None;
        }
        let kind = *self.candidates.active_key()?;
        let token = self.candidates.reissue(self.view)?;
        Some(FetchRequest {
            token,
            params: FetchParams::Candidates { kind },
        })
    }

    pub fn complete(
        &mut self,
        token: RequestToken,
        outcome: Result<FetchPayload, QueryError>,
    ) -> ApplyDecision {
        let decision = self
            .candidates
            .complete(token, outcome.and_then(FetchPayload::into_names));
        if decision.applied() {
            tracing::debug!(
                view = %self.view,
                candidates = self.candidates().len(),
                "autocomplete candidates loaded"
            );
            self.refresh_suggestions();
        }
        decision
    }

    /// Sets the input text and recomputes suggestions against it.
    pub fn filter(&mut self, prefix: &str) -> &[String] {
        self.input = prefix.to_string();
        self.refresh_suggestions();
        &self.suggestions
    }

    /// Takes `candidate` verbatim as the input and closes the suggestion list.
    pub fn select(&mut self, candidate: &str) {
        self.input = candidate.to_string();
        self.suggestions.clear();
    }

    /// Clears input and suggestions; the candidate list stays loaded.
    pub fn clear(&mut self) {
        self.input.clear();
        self.suggestions.clear();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn candidates(&self) -> &[String] {
        self.candidates
            .result()
            .ready_data()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn status(&self) -> QueryStatus {
        self.candidates.result().status
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.candidates.result().error.as_ref()
    }

    fn refresh_suggestions(&mut self) {
        self.suggestions = filter_candidates(
            self.candidates(),
            &self.input,
            self.config.max_suggestions,
        )
        .into_iter()
        .map(str::to_string)
        .collect();
    }
}
