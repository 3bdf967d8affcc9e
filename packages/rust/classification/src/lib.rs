//! Classification service client and response decoding.
//!
//! One enrichment makes exactly one request to the classification service:
//! `GET <endpoint with silo>?format=json&uri=<page-url>`. There is no retry and
//! no caching; the only bound is the configured deadline, which covers the
//! whole exchange including the body.

mod decode;
mod framing;

use std::future::Future;
use std::time::Duration;

use contextual_shared::{ContextualError, GlobalConfig, Result, SILO_PLACEHOLDER};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use decode::{decode, parse_record};
pub use framing::unframe;

/// User-Agent string for classification requests.
const USER_AGENT: &str = concat!("contextual/", env!("CARGO_PKG_VERSION"));

/// Maximum classification response body size (1 MB).
pub const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// RawResponse
// ---------------------------------------------------------------------------

/// A received HTTP response whose body has not necessarily been read yet.
#[derive(Debug)]
pub struct RawResponse {
    status: u16,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Buffered(Vec<u8>),
    Streaming(reqwest::Response),
    Failed(String),
}

impl RawResponse {
    /// A response with a fully buffered body.
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: Body::Buffered(body.into()),
        }
    }

    /// A response whose body fails to read with `reason`.
    pub fn unreadable(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Failed(reason.into()),
        }
    }

    fn streaming(response: reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            body: Body::Streaming(response),
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Read the body to the end, refusing bodies over [`MAX_RESPONSE_SIZE`].
    pub async fn into_bytes(self) -> std::result::Result<Vec<u8>, String> {
        match self.body {
            Body::Buffered(bytes) => {
                check_size(bytes.len() as u64)?;
                Ok(bytes)
            }
            Body::Streaming(response) => read_capped(response).await,
            Body::Failed(reason) => Err(reason),
        }
    }
}

fn check_size(len: u64) -> std::result::Result<(), String> {
    if len > MAX_RESPONSE_SIZE {
        return Err(format!(
            "response too large: {len} bytes (max {MAX_RESPONSE_SIZE})"
        ));
    }
    Ok(())
}

/// Stream the body, stopping as soon as it outgrows the cap.
async fn read_capped(mut response: reqwest::Response) -> std::result::Result<Vec<u8>, String> {
    if let Some(len) = response.content_length() {
        check_size(len)?;
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        check_size((body.len() + chunk.len()) as u64)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fetches the classification of one page from one silo.
///
/// Implementations issue at most one request per call and never retry.
pub trait ClassificationClient: Send + Sync {
    /// Fetch the raw classification response for `page_url` from `silo`.
    ///
    /// Any received HTTP response is `Ok`, whatever its status; transport
    /// failures are [`ContextualError::Network`].
    fn fetch(&self, silo: &str, page_url: &str) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// reqwest-backed [`ClassificationClient`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client for the endpoint template and deadline in `config`.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ContextualError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
        })
    }

    /// The endpoint template this client resolves silos against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ClassificationClient for HttpClient {
    #[instrument(skip_all, fields(silo = %silo))]
    async fn fetch(&self, silo: &str, page_url: &str) -> Result<RawResponse> {
        let url = build_url(&self.endpoint, silo, page_url)?;
        info!(%url, "fetching contextual information");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ContextualError::Network(format!(
                    "{url}: no response within {}ms",
                    self.timeout.as_millis()
                ))
            } else {
                ContextualError::Network(format!("{url}: {e}"))
            }
        })?;

        debug!(status = response.status().as_u16(), "classification service responded");
        Ok(RawResponse::streaming(response))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the request URL for `silo` and `page_url`.
///
/// The first [`SILO_PLACEHOLDER`] in the template is replaced by the silo and
/// `format=json&uri=<page-url>` is appended to any query the template has.
pub fn build_url(template: &str, silo: &str, page_url: &str) -> Result<Url> {
    let resolved = template.replacen(SILO_PLACEHOLDER, silo, 1);
    let mut url = Url::parse(&resolved).map_err(|e| {
        ContextualError::config(format!("invalid classification endpoint '{resolved}': {e}"))
    })?;

    url.query_pairs_mut()
        .append_pair("format", "json")
        .append_pair("uri", page_url);

    Ok(url)
}
