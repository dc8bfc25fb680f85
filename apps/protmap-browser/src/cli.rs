use clap::{Args, Parser, Subcommand};
use protmap_core::config::{
    normalize_backend_url, parse_network_top_k, parse_threshold, parse_timeout_ms,
};
use protmap_core::{BrowserConfig, ConfigError, EntityKind};

#[derive(Parser, Debug)]
#[command(name = "protmap")]
#[command(about = "Browse proteins, pathways and drugs served by the protmap backend")]
pub struct Cli {
    /// Backend base URL. Overrides PROTMAP_BACKEND_URL.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
    /// Per-request timeout in milliseconds. Overrides PROTMAP_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<String>,
    /// Number of network neighbors to request. Overrides PROTMAP_NETWORK_TOPK.
    #[arg(long, global = true)]
    pub top_k: Option<String>,
    /// Default pathway score threshold. Overrides PROTMAP_DEFAULT_THRESHOLD.
    #[arg(long, global = true)]
    pub default_threshold: Option<String>,
    /// Re-issue failed queries this many times once the page has settled.
    #[arg(long, global = true, default_value_t = 0)]
    pub retries: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Protein page: network, neighbors, shared pathways, gene info and images
    Search(SearchArgs),
    /// Pathway page: proteins and STRING interactions above a threshold
    Pathway(PathwayArgs),
    /// Drug page
    Drug(DrugArgs),
    /// Autocomplete suggestions for a prefix
    Suggest(SuggestArgs),
    /// Downloadable files and their links
    Downloads,
    /// Backend health check
    Ping,
    /// Open any browser route, e.g. "/search?gene=ADA2"
    Open(OpenArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub gene: String,
    /// Neighbor whose shared pathways are shown.
    #[arg(long)]
    pub neighbor: Option<String>,
    /// Shared pathway group to expand.
    #[arg(long)]
    pub expand: Option<String>,
    /// Entity whose gene info is shown.
    #[arg(long)]
    pub info: Option<String>,
    /// Flatmap overlay pathway.
    #[arg(long)]
    pub overlay: Option<String>,
    /// Raw message from the structure frame, as JSON. May be repeated.
    #[arg(long = "frame-message")]
    pub frame_messages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PathwayArgs {
    pub name: String,
    /// Score threshold for this page, in 0.1 steps.
    #[arg(long)]
    pub threshold: Option<String>,
    /// Protein whose gene info is shown.
    #[arg(long)]
    pub info: Option<String>,
    /// Show the page explanation.
    #[arg(long)]
    pub explain: bool,
}

#[derive(Args, Debug)]
pub struct DrugArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SuggestArgs {
    pub prefix: String,
    #[arg(long, default_value = "pathway", value_parser = parse_kind)]
    pub kind: EntityKind,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    pub path: String,
}

fn parse_kind(raw: &str) -> Result<EntityKind, String> {
    EntityKind::parse(raw).ok_or_else(|| format!("unknown entity kind {raw:?}"))
}

impl Cli {
    /// Environment configuration with command-line flags applied on top.
    pub fn resolve_config(&self) -> Result<BrowserConfig, ConfigError> {
        self.apply_overrides(BrowserConfig::from_env()?)
    }

    pub fn apply_overrides(&self, mut config: BrowserConfig) -> Result<BrowserConfig, ConfigError> {
        if let Some(raw) = self.backend_url.as_deref() {
            config.backend_url = normalize_backend_url("--backend-url", raw)?;
            config.backend_url_source = "--backend-url";
        }
        if let Some(raw) = self.timeout_ms.as_deref() {
            config.timeout_ms = parse_timeout_ms("--timeout-ms", raw)?;
        }
        if let Some(raw) = self.top_k.as_deref() {
            config.network_top_k = parse_network_top_k("--top-k", raw)?;
        }
        if let Some(raw) = self.default_threshold.as_deref() {
            config.default_threshold = parse_threshold("--default-threshold", raw)?;
        }
        Ok(config)
    }
}
