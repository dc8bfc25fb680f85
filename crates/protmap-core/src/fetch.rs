//! Fetch requests handed out by views, their completions, and the transport seam.

use std::fmt;

use async_trait::async_trait;

use crate::payload::{
    DescriptionPayload, DownloadEntry, DownloadsPayload, GeneInfo, GeneInfoPayload,
    GroupLabelPayload, ImagePayload, Interaction, InteractionsPayload, NetworkData,
    NetworkPayload, PathwayGroup, PathwayListPayload, ProteinsPayload, ScoredProtein,
    SharedGroupsPayload,
};
use crate::query::{QueryError, QueryName, RequestToken};
use crate::resolver::{EntityKind, SearchKey};

/// Score cut-off in 0.1 steps, stored as tenths so keys compare exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Threshold(u8);

impl Threshold {
    pub const MAX_TENTHS: u8 = 10;
    pub const DEFAULT: Self = Self(2);

    pub const fn from_tenths(tenths: u8) -> Option<Self> {
        if tenths <= Self::MAX_TENTHS {
            Some(Self(tenths))
        } else {
            None
        }
    }

    /// Accepts only values on the 0.1 grid within `[0, 1]`.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return None;
        }
        let scaled = value * 10.0;
        (0..=Self::MAX_TENTHS)
            .find(|tenths| (f64::from(*tenths) - scaled).abs() < 1e-6)
            .map(Self)
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().and_then(Self::from_f64)
    }

    pub const fn tenths(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Every selectable value, ascending.
    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        (0..=Self::MAX_TENTHS).map(Self)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

/// Backend call parameters for one query. Values are already normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchParams {
    GroupLabel { gene: String },
    Network { gene: String, top_k: u16 },
    Description { key: SearchKey },
    SharedGroups { query: String, neighbor: String },
    GeneInfo { gene: String },
    FlatmapOverlays { gene: String },
    FlatmapImage {
        gene: String,
        overlay: Option<String>,
    },
    CalibrationImage { gene: String },
    AuprcImage { gene: String },
    Proteins {
        pathway: String,
        threshold: Threshold,
    },
    Interactions {
        pathway: String,
        threshold: Threshold,
    },
    Candidates { kind: EntityKind },
    Downloads,
}

impl FetchParams {
    pub const fn query_name(&self) -> QueryName {
        match self {
            Self::GroupLabel { .. } => QueryName::GroupLabel,
            Self::Network { .. } => QueryName::Network,
            Self::Description { .. } => QueryName::Description,
            Self::SharedGroups { .. } => QueryName::SharedGroups,
            Self::GeneInfo { .. } => QueryName::GeneInfo,
            Self::FlatmapOverlays { .. } => QueryName::FlatmapOverlays,
            Self::FlatmapImage { .. } => QueryName::FlatmapImage,
            Self::CalibrationImage { .. } => QueryName::CalibrationImage,
            Self::AuprcImage { .. } => QueryName::AuprcImage,
            Self::Proteins { .. } => QueryName::Proteins,
            Self::Interactions { .. } => QueryName::Interactions,
            Self::Candidates { .. } => QueryName::Candidates,
            Self::Downloads => QueryName::Downloads,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: RequestToken,
    pub params: FetchParams,
}

/// Decoded backend response, before view-specific conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchPayload {
    GroupLabel(GroupLabelPayload),
    Network(NetworkPayload),
    Description(DescriptionPayload),
    SharedGroups(SharedGroupsPayload),
    GeneInfo(GeneInfoPayload),
    PathwayList(PathwayListPayload),
    Image(ImagePayload),
    Proteins(ProteinsPayload),
    Interactions(InteractionsPayload),
    Downloads(DownloadsPayload),
}

impl FetchPayload {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::GroupLabel(_) => "group_label",
            Self::Network(_) => "network",
            Self::Description(_) => "description",
            Self::SharedGroups(_) => "shared_groups",
            Self::GeneInfo(_) => "gene_info",
            Self::PathwayList(_) => "pathway_list",
            Self::Image(_) => "image",
            Self::Proteins(_) => "proteins",
            Self::Interactions(_) => "interactions",
            Self::Downloads(_) => "downloads",
        }
    }

    fn mismatch(&self, expected: &str) -> QueryError {
        QueryError::transport(format!(
            "unexpected {} payload where {expected} was expected",
            self.label()
        ))
    }

    pub fn into_group_label(self) -> Result<Option<String>, QueryError> {
        match self {
            Self::GroupLabel(payload) => payload.into_label(),
            other => Err(other.mismatch("group_label")),
        }
    }

    pub fn into_network(self) -> Result<NetworkData, QueryError> {
        match self {
            Self::Network(payload) => payload.into_network(),
            other => Err(other.mismatch("network")),
        }
    }

    pub fn into_description(self) -> Result<Option<String>, QueryError> {
        match self {
            Self::Description(payload) => payload.into_description(),
            other => Err(other.mismatch("description")),
        }
    }

    pub fn into_groups(self) -> Result<Vec<PathwayGroup>, QueryError> {
        match self {
            Self::SharedGroups(payload) => payload.into_groups(),
            other => Err(other.mismatch("shared_groups")),
        }
    }

    pub fn into_gene_info(self, entity: &str) -> Result<GeneInfo, QueryError> {
        match self {
            Self::GeneInfo(payload) => payload.into_gene_info(entity),
            other => Err(other.mismatch("gene_info")),
        }
    }

    pub fn into_names(self) -> Result<Vec<String>, QueryError> {
        match self {
            Self::PathwayList(payload) => payload.into_names(),
            other => Err(other.mismatch("pathway_list")),
        }
    }

    pub fn into_image(self) -> Result<ImagePayload, QueryError> {
        match self {
            Self::Image(payload) => payload.into_image(),
            other => Err(other.mismatch("image")),
        }
    }

    pub fn into_proteins(self) -> Result<Vec<ScoredProtein>, QueryError> {
        match self {
            Self::Proteins(payload) => payload.into_proteins(),
            other => Err(other.mismatch("proteins")),
        }
    }

    pub fn into_interactions(self) -> Result<Vec<Interaction>, QueryError> {
        match self {
            Self::Interactions(payload) => payload.into_interactions(),
            other => Err(other.mismatch("interactions")),
        }
    }

    pub fn into_downloads(self) -> Result<Vec<DownloadEntry>, QueryError> {
        match self {
            Self::Downloads(payload) => Ok(payload.0),
            other => Err(other.mismatch("downloads")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchCompletion {
    pub token: RequestToken,
    pub outcome: Result<FetchPayload, QueryError>,
}

/// Backend data service as seen by the core. Implementations own timeouts and
/// classify every failure as transport or domain.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchPayload, QueryError>;
}

/// Runs one request to completion on `transport`.
pub async fn execute<T>(transport: &T, request: FetchRequest) -> FetchCompletion
where
    T: FetchTransport + ?Sized,
{
    let outcome = transport.fetch(&request.params).await;
    FetchCompletion {
        token: request.token,
        outcome,
    }
}
