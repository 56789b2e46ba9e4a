use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::types::PageAnalysis;

const PAGES_PATH: &str = "api/pages";
const CRAWL_PATH: &str = "api/crawl";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base address `{input}`: {source}")]
    InvalidBase {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Failed to crawl URL{}", crawl_detail(.status, .detail.as_deref()))]
    CrawlRejected { status: u16, detail: Option<String> },

    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request task ended unexpectedly: {0}")]
    Task(String),
}

fn crawl_detail(status: &u16, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!(" (HTTP {status}: {detail})"),
        None => format!(" (HTTP {status})"),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ApiError> {
        let mut parsed = Url::parse(base.trim()).map_err(|source| ApiError::InvalidBase {
            input: base.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBase {
                input: base.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        // Keep any path prefix when joining endpoint paths.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("skyfell/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self { http, base: parsed })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Url {
        // Both paths are relative literals, so joining onto a base URL cannot fail.
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    pub async fn fetch_pages(&self) -> Result<Vec<PageAnalysis>, ApiError> {
        let endpoint = self.endpoint(PAGES_PATH);
        debug!(%endpoint, "fetching analyzed pages");

        let resp = self
            .http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            warn!(%endpoint, status, "page listing rejected");
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        // An analyzer with no records answers `null`.
        let pages = resp
            .json::<Option<Vec<PageAnalysis>>>()
            .await
            .map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(pages.unwrap_or_default())
    }

    pub async fn submit_crawl(&self, url: &str) -> Result<(), ApiError> {
        let endpoint = self.endpoint(CRAWL_PATH);
        debug!(%endpoint, url, "submitting crawl");

        let resp = self
            .http
            .post(endpoint.clone())
            .json(&CrawlRequest { url })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if resp.status().is_success() {
            return Ok(());
        }
        Err(crawl_rejection(resp).await)
    }
}

async fn crawl_rejection(resp: Response) -> ApiError {
    let status = resp.status().as_u16();
    let detail = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .map(|body| body.error.trim().to_string())
        .filter(|error| !error.is_empty());
    warn!(status, detail = detail.as_deref().unwrap_or(""), "crawl rejected");
    ApiError::CrawlRejected { status, detail }
}

/// A rejected POST returns before any reload is attempted.
pub async fn submit_and_refresh(
    client: &ApiClient,
    url: &str,
) -> Result<Vec<PageAnalysis>, ApiError> {
    client.submit_crawl(url).await?;
    client.fetch_pages().await
}
