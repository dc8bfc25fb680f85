//! Terminal host for the protmap browser: parses a command, mounts the matching view,
//! drives its queries against the backend until they settle, and renders the panels.

#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

pub mod cli;
pub mod host;
pub mod render;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use protmap_client::ProtmapClient;
use protmap_core::{
    BrowserConfig, EntityKind, FetchRequest, FetchTransport, MountedView, SearchView, Threshold,
    ViewRoute, resolve,
};

use crate::cli::{Cli, Commands, PathwayArgs, SearchArgs, SuggestArgs};
use crate::host::Session;

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config().context("resolve configuration")?;
    tracing::info!(
        backend_url = %config.backend_url,
        source = config.backend_url_source,
        "protmap backend"
    );
    let client = ProtmapClient::from_browser_config(&config).context("build backend client")?;

    if matches!(cli.command, Commands::Ping) {
        let health = client.ping().await.context("backend health check")?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", health.message)?;
        return Ok(());
    }

    let links = client.clone();
    let transport: Arc<dyn FetchTransport> = Arc::new(client);
    let session = drive(transport, config, &cli.command, cli.retries).await?;

    let mut out = std::io::stdout().lock();
    render::view(&mut out, session.view(), |filename| {
        links.download_url(filename).ok().map(String::from)
    })?;
    Ok(())
}

/// Mounts the view for `command`, replays the command's user actions in order, and
/// returns the settled session.
pub async fn drive(
    transport: Arc<dyn FetchTransport>,
    config: BrowserConfig,
    command: &Commands,
    retries: u8,
) -> Result<Session> {
    let route = match command {
        Commands::Search(args) => resolve(&args.gene, EntityKind::Protein)?.route(),
        Commands::Pathway(args) => resolve(&args.name, EntityKind::Pathway)?.route(),
        Commands::Drug(args) => resolve(&args.name, EntityKind::Drug)?.route(),
        Commands::Suggest(_) => ViewRoute::Home,
        Commands::Downloads => ViewRoute::Downloads,
        Commands::Open(args) => ViewRoute::parse(&args.path)?,
        Commands::Ping => bail!("ping does not mount a view"),
    };

    let mut session = Session::open(transport, config, &route)?;
    session.settle().await;

    match command {
        Commands::Search(args) => search_actions(&mut session, args).await?,
        Commands::Pathway(args) => pathway_actions(&mut session, args).await?,
        Commands::Suggest(args) => suggest_actions(&mut session, args).await,
        Commands::Drug(_) | Commands::Downloads | Commands::Open(_) | Commands::Ping => {}
    }

    session.retry_failed(retries).await;
    Ok(session)
}

fn on_search<F>(session: &mut Session, action: F)
where
    F: FnOnce(&mut SearchView) -> Vec<FetchRequest>,
{
    session.act(|view| match view {
        MountedView::Search(view) => action(view),
        _ => Vec::new(),
    });
}

async fn search_actions(session: &mut Session, args: &SearchArgs) -> Result<()> {
    for raw in &args.frame_messages {
        let message: serde_json::Value =
            serde_json::from_str(raw).with_context(|| format!("parse frame message {raw:?}"))?;
        session.post_frame_message(&message);
    }
    if let Some(neighbor) = args.neighbor.as_deref() {
        on_search(session, |view| view.select_neighbor(Some(neighbor)));
        session.settle().await;
    }
    if let Some(label) = args.expand.as_deref() {
        on_search(session, |view| {
            view.toggle_group(label);
            Vec::new()
        });
    }
    if let Some(entity) = args.info.as_deref() {
        on_search(session, |view| view.select_info_entity(Some(entity)));
        session.settle().await;
    }
    if let Some(overlay) = args.overlay.as_deref() {
        on_search(session, |view| view.select_flatmap_overlay(Some(overlay)));
        session.settle().await;
    }
    Ok(())
}

async fn pathway_actions(session: &mut Session, args: &PathwayArgs) -> Result<()> {
    let threshold = args
        .threshold
        .as_deref()
        .map(|raw| {
            Threshold::parse(raw)
                .with_context(|| format!("threshold must be a 0.1 step in [0, 1], got {raw:?}"))
        })
        .transpose()?;
    session.act(|view| {
        let MountedView::Pathway(view) = view else {
            return Vec::new();
        };
        let mut requests = Vec::new();
        if let Some(threshold) = threshold {
            requests.extend(view.set_threshold(threshold));
        }
        if let Some(entity) = args.info.as_deref() {
            requests.extend(view.select_info_entity(Some(entity)));
        }
        if args.explain {
            view.toggle_explanation();
        }
        requests
    });
    session.settle().await;
    Ok(())
}

async fn suggest_actions(session: &mut Session, args: &SuggestArgs) {
    session.act(|view| match view {
        MountedView::Home(view) => view.set_kind(args.kind),
        _ => Vec::new(),
    });
    session.settle().await;
    session.act(|view| {
        if let MountedView::Home(view) = view {
            view.type_input(&args.prefix);
        }
        Vec::new()
    });
}
