//! HTTP transport for the protmap backend.
//!
//! [`ProtmapClient`] maps every [`FetchParams`] onto one backend endpoint and decodes
//! the response into a [`FetchPayload`]. Failures are classified for the core: a
//! non-2xx response carrying a JSON `error`/`detail` message is a domain error, and
//! everything else (connection, timeout, bare status, undecodable body) is a
//! transport failure.

#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

use std::time::Duration;

use async_trait::async_trait;
use protmap_core::payload::{
    DescriptionPayload, DownloadsPayload, GeneInfoPayload, GroupLabelPayload, HealthPayload,
    ImagePayload, InteractionsPayload, NetworkPayload, PathwayListPayload, ProteinsPayload,
    SharedGroupsPayload,
};
use protmap_core::{BrowserConfig, FetchParams, FetchPayload, FetchTransport, QueryError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 1;
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/png";
pub const IMAGE_NOT_FOUND_MESSAGE: &str = "Image not available.";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct ProtmapClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl ProtmapClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

impl From<&BrowserConfig> for ProtmapClientConfig {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            base_url: config.backend_url.clone(),
            timeout_ms: config.timeout_ms,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtmapClient {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protmap_client_base_url_missing")]
    BaseUrlMissing,
    #[error("protmap_client_invalid_url:{message}")]
    InvalidUrl { message: String },
    #[error("protmap_request_failed:{message}")]
    Request { message: String },
    #[error("protmap_read_failed:{message}")]
    Read { message: String },
    #[error("protmap_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("protmap_domain_{status}:{message}")]
    Domain { status: StatusCode, message: String },
    #[error("protmap_json_decode_failed:{message}")]
    Decode { message: String },
}

impl From<ClientError> for QueryError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Domain { message, .. } => QueryError::domain(message),
            other => QueryError::transport(other.to_string()),
        }
    }
}

impl ProtmapClient {
    pub fn new(config: ProtmapClientConfig) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    pub fn from_browser_config(config: &BrowserConfig) -> Result<Self, ClientError> {
        Self::new(ProtmapClientConfig::from(config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Backend URL for `path`, relative to the base URL. An empty path is the root.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let path = path.trim().trim_start_matches('/');
        Url::parse(&format!("{}/{path}", self.base_url)).map_err(|error| {
            ClientError::InvalidUrl {
                message: format!("{path}: {error}"),
            }
        })
    }

    /// Full request URL for `params`, query string included.
    pub fn request_url(&self, params: &FetchParams) -> Result<Url, ClientError> {
        let mut url = self.endpoint(endpoint_path(params))?;
        let pairs = query_pairs(params);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Link a browser can follow to fetch one file from the downloads list. The
    /// filename is percent-encoded as a single path segment.
    pub fn download_url(&self, filename: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint("downloads/get")?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                message: self.base_url.clone(),
            })?
            .push(filename);
        Ok(url)
    }

    /// Backend liveness check against the root endpoint.
    pub async fn ping(&self) -> Result<HealthPayload, ClientError> {
        let url = self.endpoint("")?;
        self.get_json(url).await
    }

    pub async fn fetch_payload(&self, params: &FetchParams) -> Result<FetchPayload, ClientError> {
        let url = self.request_url(params)?;
        tracing::debug!(query = params.query_name().as_str(), url = %url, "backend request");
        match params {
            FetchParams::GroupLabel { .. } => self
                .get_json::<GroupLabelPayload>(url)
                .await
                .map(FetchPayload::GroupLabel),
            FetchParams::Network { .. } => self
                .get_json::<NetworkPayload>(url)
                .await
                .map(FetchPayload::Network),
            FetchParams::Description { .. } => self
                .get_json::<DescriptionPayload>(url)
                .await
                .map(FetchPayload::Description),
            FetchParams::SharedGroups { .. } => self
                .get_json::<SharedGroupsPayload>(url)
                .await
                .map(FetchPayload::SharedGroups),
            FetchParams::GeneInfo { .. } => self
                .get_json::<GeneInfoPayload>(url)
                .await
                .map(FetchPayload::GeneInfo),
            FetchParams::FlatmapOverlays { .. } | FetchParams::Candidates { .. } => self
                .get_json::<PathwayListPayload>(url)
                .await
                .map(FetchPayload::PathwayList),
            FetchParams::FlatmapImage { .. }
            | FetchParams::CalibrationImage { .. }
            | FetchParams::AuprcImage { .. } => self.get_image(url).await.map(FetchPayload::Image),
            FetchParams::Proteins { .. } => self
                .get_json::<ProteinsPayload>(url)
                .await
                .map(FetchPayload::Proteins),
            FetchParams::Interactions { .. } => self
                .get_json::<InteractionsPayload>(url)
                .await
                .map(FetchPayload::Interactions),
            FetchParams::Downloads => self
                .get_json::<DownloadsPayload>(url)
                .await
                .map(FetchPayload::Downloads),
        }
    }

    pub async fn get_json<T>(&self, url: Url) -> Result<T, ClientError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.send_get(url).await?;
        decode_json_response(response).await
    }

    async fn get_image(&self, url: Url) -> Result<ImagePayload, ClientError> {
        let response = self.send_get(url).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| DEFAULT_IMAGE_CONTENT_TYPE.to_string(), str::to_string);
        let bytes = read_body(response).await?;

        if !status.is_success() {
            return Err(match format_http_error(status, &bytes) {
                ClientError::Http { status, .. } if status == StatusCode::NOT_FOUND => {
                    ClientError::Domain {
                        status,
                        message: IMAGE_NOT_FOUND_MESSAGE.to_string(),
                    }
                }
                other => other,
            });
        }

        Ok(ImagePayload {
            content_type,
            bytes,
        })
    }

    /// Sends a GET, resending only when no response arrived at all. Every attempt
    /// carries a fresh `x-request-id`.
    async fn send_get(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        let mut attempt = 1;
        loop {
            let request_id = format!("req_{}", Uuid::new_v4().simple());
            let sent = self
                .http
                .get(url.clone())
                .header(REQUEST_ID_HEADER, request_id.as_str())
                .timeout(self.timeout)
                .send()
                .await;
            match sent {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.request_attempts => {
                    tracing::debug!(
                        url = %url,
                        request_id = %request_id,
                        attempt,
                        error = %error,
                        "backend unreachable, resending"
                    );
                    attempt += 1;
                }
                Err(error) => {
                    return Err(ClientError::Request {
                        message: error.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl FetchTransport for ProtmapClient {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchPayload, QueryError> {
        self.fetch_payload(params).await.map_err(QueryError::from)
    }
}

#[must_use]
pub fn endpoint_path(params: &FetchParams) -> &'static str {
    match params {
        FetchParams::GroupLabel { .. } => "/group_label",
        FetchParams::Network { .. } => "/plot",
        FetchParams::Description { .. } => "/description",
        FetchParams::SharedGroups { .. } => "/shared_pathway_groups",
        FetchParams::GeneInfo { .. } => "/gene_info",
        FetchParams::FlatmapOverlays { .. } => "/flatmap/pathways",
        FetchParams::FlatmapImage { .. } => "/flatmap/image",
        FetchParams::CalibrationImage { .. } => "/calibration/image",
        FetchParams::AuprcImage { .. } => "/auprc/image",
        FetchParams::Proteins { .. } => "/pathway/proteins",
        FetchParams::Interactions { .. } => "/pathway/string_interactions",
        FetchParams::Candidates { .. } => "/pathways/list",
        FetchParams::Downloads => "/downloads/list",
    }
}

#[must_use]
pub fn query_pairs(params: &FetchParams) -> Vec<(&'static str, String)> {
    match params {
        FetchParams::GroupLabel { gene }
        | FetchParams::GeneInfo { gene }
        | FetchParams::FlatmapOverlays { gene }
        | FetchParams::CalibrationImage { gene }
        | FetchParams::AuprcImage { gene } => vec![("gene", gene.clone())],
        FetchParams::Network { gene, top_k } => {
            vec![("gene", gene.clone()), ("topk", top_k.to_string())]
        }
        FetchParams::Description { key } => vec![
            ("kind", key.kind().as_str().to_string()),
            ("value", key.value().to_string()),
        ],
        FetchParams::SharedGroups { query, neighbor } => {
            vec![("query", query.clone()), ("neighbor", neighbor.clone())]
        }
        FetchParams::FlatmapImage { gene, overlay } => {
            let mut pairs = vec![("gene", gene.clone())];
            if let Some(name) = overlay {
                pairs.push(("name", name.clone()));
            }
            pairs
        }
        FetchParams::Proteins {
            pathway,
            threshold,
        }
        | FetchParams::Interactions {
            pathway,
            threshold,
        } => vec![
            ("pathway", pathway.clone()),
            ("threshold", threshold.to_string()),
        ],
        FetchParams::Candidates { kind } => vec![("kind", kind.as_str().to_string())],
        FetchParams::Downloads => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        let detail = self.detail.and_then(|detail| match detail {
            serde_json::Value::String(text) => Some(text),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        [self.error, detail]
            .into_iter()
            .flatten()
            .find_map(|message| trimmed(&message).map(str::to_string))
    }
}

/// Classifies a non-2xx response. A JSON body with an `error` or `detail` message is
/// the backend speaking and becomes [`ClientError::Domain`].
pub fn format_http_error(status: StatusCode, body: &[u8]) -> ClientError {
    if let Some(message) = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::message)
    {
        return ClientError::Domain { status, message };
    }
    let text = String::from_utf8_lossy(body);
    ClientError::Http {
        status,
        body: trimmed(&text).unwrap_or("<empty>").to_string(),
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ClientError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ClientError::BaseUrlMissing);
    }
    let normalized = trimmed.trim_end_matches('/').to_string();
    Url::parse(&normalized).map_err(|error| ClientError::InvalidUrl {
        message: error.to_string(),
    })?;
    Ok(normalized)
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, ClientError> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|error| ClientError::Read {
            message: error.to_string(),
        })
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ClientError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let bytes = read_body(response).await?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| ClientError::Decode {
        message: error.to_string(),
    })
}

fn trimmed(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|text| !text.is_empty())
}
