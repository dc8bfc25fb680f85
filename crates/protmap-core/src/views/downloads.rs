use crate::fetch::{FetchCompletion, FetchParams, FetchPayload, FetchRequest};
use crate::panels::{self, NO_DOWNLOADS_MESSAGE, PanelView};
use crate::payload::DownloadEntry;
use crate::query::{ApplyDecision, LoadingTransition, QueryName, QuerySlot, ViewId};
use crate::views::{misrouted, retry_slot, sync_slot};

/// File list, fetched once per mount.
#[derive(Debug)]
pub struct DownloadsView {
    id: ViewId,
    files: QuerySlot<(), Vec<DownloadEntry>>,
}

impl DownloadsView {
    pub fn mount(id: ViewId) -> (Self, Vec<FetchRequest>) {
        let mut view = Self {
            id,
            files: QuerySlot::new(QueryName::Downloads, LoadingTransition::Hard),
        };
        let mut requests = Vec::new();
        sync_slot(&mut view.files, id, Some(()), downloads_params, &mut requests);
        (view, requests)
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn retry_failed(&mut self) -> Vec<FetchRequest> {
        let mut requests = Vec::new();
        retry_slot(&mut self.files, self.id, downloads_params, &mut requests);
        requests
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> ApplyDecision {
        if completion.token.view() != self.id || completion.token.query() != QueryName::Downloads {
            return misrouted(&completion);
        }
        let FetchCompletion { token, outcome } = completion;
        self.files
            .complete(token, outcome.and_then(FetchPayload::into_downloads))
    }

    pub fn files_panel(&self) -> PanelView<'_, [DownloadEntry]> {
        panels::list_panel(self.files.result(), NO_DOWNLOADS_MESSAGE)
    }
}

fn downloads_params((): &()) -> FetchParams {
    FetchParams::Downloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DownloadsPayload;
    use crate::query::QueryError;

    #[test]
    fn file_list_loads_once_and_retries_after_failure() {
        let (mut view, requests) = DownloadsView::mount(ViewId::mint());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].params, FetchParams::Downloads);

        view.apply(FetchCompletion {
            token: requests[0].token,
            outcome: Err(QueryError::domain("Failed to fetch downloads list.")),
        });
        assert_eq!(
            view.files_panel(),
            PanelView::Error("Failed to fetch downloads list.")
        );

        let retried = view.retry_failed();
        assert_eq!(retried.len(), 1);
        view.apply(FetchCompletion {
            token: retried[0].token,
            outcome: Ok(FetchPayload::Downloads(DownloadsPayload(vec![DownloadEntry {
                filename: "embeddings v2.parquet".to_string(),
                description: "Protein embeddings".to_string(),
            }]))),
        });
        let files = view.files_panel().ready().expect("files");
        assert_eq!(files[0].filename, "embeddings v2.parquet");
        assert!(view.retry_failed().is_empty());
    }
}
