#![allow(clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use protmap_browser::cli::{Commands, OpenArgs, PathwayArgs, SearchArgs, SuggestArgs};
use protmap_browser::host::{Session, SettleReport};
use protmap_browser::{drive, render};
use protmap_core::panels::{NO_INTERACTIONS_MESSAGE, TRANSPORT_FAILURE_MESSAGE};
use protmap_core::{
    BrowserConfig, EntityKind, FetchParams, FetchPayload, FetchTransport, MountedView, PanelView,
    QueryError, SearchView, Threshold, resolve,
};
use serde_json::{Value, json};

#[derive(Default)]
struct ScriptedTransport {
    network_delays_ms: HashMap<String, u64>,
    protein_failures: Mutex<usize>,
    description_panics: Mutex<usize>,
    calls: Mutex<Vec<FetchParams>>,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("payload decodes")
}

#[async_trait]
impl FetchTransport for ScriptedTransport {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchPayload, QueryError> {
        self.calls.lock().expect("calls").push(params.clone());
        let payload = match params {
            FetchParams::Network { gene, .. } => {
                if let Some(delay) = self.network_delays_ms.get(gene) {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                }
                FetchPayload::Network(decode(json!({
                    "plot": {"gene": gene},
                    "neighbors": [
                        {"protein_id": "X", "cosine_sim": 0.3},
                        {"protein_id": "Y", "cosine_sim": 0.9}
                    ]
                })))
            }
            FetchParams::GroupLabel { .. } => {
                FetchPayload::GroupLabel(decode(json!({"group_label": "Hydrolase"})))
            }
            FetchParams::Description { key } => {
                let panic_now = {
                    let mut panics = self.description_panics.lock().expect("panics");
                    let panic_now = *panics > 0;
                    *panics = panics.saturating_sub(1);
                    panic_now
                };
                if panic_now {
                    panic!("description backend crashed");
                }
                FetchPayload::Description(decode(
                    json!({"description": format!("About {}", key.value())}),
                ))
            }
            FetchParams::SharedGroups { .. } => FetchPayload::SharedGroups(decode(json!({
                "groups": [{"Group10": "Apoptosis", "pathway_id": ["R-HSA-109581"]}]
            }))),
            FetchParams::GeneInfo { gene } => FetchPayload::GeneInfo(decode(json!({
                "info": {"Function": [format!("{gene} function")]}
            }))),
            FetchParams::FlatmapOverlays { .. } => {
                FetchPayload::PathwayList(decode(json!({"pathways": ["HALLMARK_APOPTOSIS"]})))
            }
            FetchParams::Candidates { .. } => FetchPayload::PathwayList(decode(json!({
                "pathways": ["GTRD_TP53", "KEGG_P53_SIGNALING", "GTRD_MYC"]
            }))),
            FetchParams::FlatmapImage { .. }
            | FetchParams::CalibrationImage { .. }
            | FetchParams::AuprcImage { .. } => {
                FetchPayload::Image(protmap_core::payload::ImagePayload {
                    content_type: "image/png".to_string(),
                    bytes: vec![1, 2, 3],
                })
            }
            FetchParams::Proteins { .. } => {
                let mut failures = self.protein_failures.lock().expect("failures");
                if *failures > 0 {
                    *failures -= 1;
                    return Err(QueryError::transport("connection reset"));
                }
                FetchPayload::Proteins(decode(json!({
                    "proteins": ["TP53", "MDM2"],
                    "scores": [0.9, 0.6]
                })))
            }
            FetchParams::Interactions { .. } => {
                FetchPayload::Interactions(decode(json!({"interactions": []})))
            }
            FetchParams::Downloads => FetchPayload::Downloads(decode(json!([]))),
        };
        Ok(payload)
    }
}

fn search_of(session: &Session) -> &SearchView {
    match session.view() {
        MountedView::Search(view) => view,
        _ => panic!("expected search view"),
    }
}

fn plot_gene(view: &SearchView) -> Option<String> {
    view.network_panel()
        .ready()
        .and_then(|network| network.plot.get("gene"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[tokio::test]
async fn remounting_discards_the_previous_view_responses() {
    let transport = Arc::new(ScriptedTransport {
        network_delays_ms: HashMap::from([("ADA2".to_string(), 30)]),
        ..ScriptedTransport::default()
    });
    let config = BrowserConfig::default();
    let ada2 = resolve("ada2", EntityKind::Protein).expect("key").route();
    let brca1 = resolve("brca1", EntityKind::Protein).expect("key").route();

    let mut session = Session::open(transport, config, &ada2).expect("open");
    session.open_route(&brca1).expect("remount");
    let report = session.settle().await;

    assert!(report.misrouted > 0);
    assert_eq!(report.stale, 0);
    assert_eq!(session.in_flight(), 0);
    assert_eq!(plot_gene(search_of(&session)).as_deref(), Some("BRCA1"));
}

#[tokio::test]
async fn search_command_replays_selections_and_renders_panels() {
    let transport = Arc::new(ScriptedTransport::default());
    let command = Commands::Search(SearchArgs {
        gene: "ada2".to_string(),
        neighbor: Some("y".to_string()),
        expand: Some("Apoptosis".to_string()),
        info: Some("y".to_string()),
        overlay: Some("HALLMARK_APOPTOSIS".to_string()),
        frame_messages: vec![
            json!({"type": "resize-panel", "panel": "panel1", "height": 420}).to_string(),
        ],
    });
    let session = drive(transport.clone(), BrowserConfig::default(), &command, 0)
        .await
        .expect("drive");
    let view = search_of(&session);
    assert_eq!(view.selected_neighbor(), Some("Y"));
    assert_eq!(view.expanded_group(), Some("Apoptosis"));
    assert_eq!(view.flatmap_overlay(), Some("HALLMARK_APOPTOSIS"));

    let mut out = Vec::new();
    render::search(&mut out, view).expect("render");
    let shown = String::from_utf8(out).expect("utf8");
    let first = shown.find("  1. Y").expect("Y ranked first");
    let second = shown.find("  2. X").expect("X ranked second");
    assert!(first < second);
    assert!(shown.contains("[-] Apoptosis (1)"));
    assert!(shown.contains("R-HSA-109581"));
    assert!(shown.contains("Y function"));
    assert!(shown.contains("/panel1.html?gene=ADA2 (420px)"));

    let calls = transport.calls.lock().expect("calls");
    assert!(calls.contains(&FetchParams::SharedGroups {
        query: "ADA2".to_string(),
        neighbor: "Y".to_string(),
    }));
    assert!(calls.contains(&FetchParams::FlatmapImage {
        gene: "ADA2".to_string(),
        overlay: Some("HALLMARK_APOPTOSIS".to_string()),
    }));
}

fn pathway_command() -> Commands {
    Commands::Pathway(PathwayArgs {
        name: "gtrd_tp53".to_string(),
        threshold: Some("0.5".to_string()),
        info: None,
        explain: true,
    })
}

#[tokio::test]
async fn pathway_failure_stays_until_retried() {
    let transport = Arc::new(ScriptedTransport {
        protein_failures: Mutex::new(2),
        ..ScriptedTransport::default()
    });
    let session = drive(transport.clone(), BrowserConfig::default(), &pathway_command(), 0)
        .await
        .expect("drive");
    let MountedView::Pathway(view) = session.view() else {
        panic!("expected pathway view");
    };
    assert_eq!(view.threshold(), Threshold::from_tenths(5).expect("threshold"));
    assert!(view.show_explanation());
    assert_eq!(view.proteins_panel(), PanelView::Error(TRANSPORT_FAILURE_MESSAGE));
    assert_eq!(
        view.interactions_panel(),
        PanelView::Empty(NO_INTERACTIONS_MESSAGE)
    );
}

#[tokio::test]
async fn retries_reissue_only_failed_queries() {
    let transport = Arc::new(ScriptedTransport {
        protein_failures: Mutex::new(2),
        ..ScriptedTransport::default()
    });
    let session = drive(transport.clone(), BrowserConfig::default(), &pathway_command(), 2)
        .await
        .expect("drive");
    let MountedView::Pathway(view) = session.view() else {
        panic!("expected pathway view");
    };
    let proteins = view.proteins_panel().ready().expect("proteins");
    assert_eq!(proteins.len(), 2);

    let calls = transport.calls.lock().expect("calls");
    let interactions = calls
        .iter()
        .filter(|params| matches!(params, FetchParams::Interactions { .. }))
        .count();
    assert_eq!(interactions, 2, "mount and threshold change only");
}

#[tokio::test]
async fn suggest_filters_loaded_pathway_names() {
    let transport = Arc::new(ScriptedTransport::default());
    let command = Commands::Suggest(SuggestArgs {
        prefix: "gtrd".to_string(),
        kind: EntityKind::Pathway,
    });
    let session = drive(transport, BrowserConfig::default(), &command, 0)
        .await
        .expect("drive");
    let MountedView::Home(view) = session.view() else {
        panic!("expected home view");
    };
    assert_eq!(
        view.suggestions(),
        ["GTRD_TP53".to_string(), "GTRD_MYC".to_string()].as_slice()
    );
}

#[tokio::test]
async fn open_rejects_unknown_routes() {
    let transport = Arc::new(ScriptedTransport::default());
    let command = Commands::Open(OpenArgs {
        path: "/cells?cell=HeLa".to_string(),
    });
    let result = drive(transport, BrowserConfig::default(), &command, 0).await;
    assert!(result.is_err());

    let command = Commands::Open(OpenArgs {
        path: "/drug?drug=Imatinib".to_string(),
    });
    let transport = Arc::new(ScriptedTransport::default());
    let session = drive(transport, BrowserConfig::default(), &command, 0)
        .await
        .expect("drive");
    let MountedView::Drug(view) = session.view() else {
        panic!("expected drug view");
    };
    assert_eq!(view.description_panel(), PanelView::Ready("About Imatinib"));
}

#[tokio::test]
async fn crashed_fetch_task_fails_its_panel_and_can_be_retried() {
    let transport = Arc::new(ScriptedTransport {
        description_panics: Mutex::new(1),
        ..ScriptedTransport::default()
    });
    let route = resolve("gtrd_tp53", EntityKind::Pathway)
        .expect("key")
        .route();
    let mut session = Session::open(transport, BrowserConfig::default(), &route)
        .expect("open");

    let report = session.settle().await;
    assert_eq!(
        report,
        SettleReport {
            applied: 3,
            lost: 1,
            ..SettleReport::default()
        }
    );
    let MountedView::Pathway(view) = session.view() else {
        panic!("expected pathway view");
    };
    assert_eq!(
        view.description_panel(),
        PanelView::Error(TRANSPORT_FAILURE_MESSAGE)
    );

    let retried = session.retry_failed(1).await;
    assert_eq!(retried.applied, 1);
    let MountedView::Pathway(view) = session.view() else {
        panic!("expected pathway view");
    };
    assert!(
        view.description_panel()
            .ready()
            .is_some_and(|text| text.starts_with("About "))
    );
}
