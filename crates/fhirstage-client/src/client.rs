use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fhirstage_core::{Bundle, Page, ResourceKind};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::AuthHeader;
use crate::error::FetchError;

/// Default `_count` for the first search request.
pub const DEFAULT_PAGE_SIZE: u32 = 250;

const FHIR_JSON: &str = "application/fhir+json";

/// A source of searchset pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Issues the initial search for `kind` with `_count=count`.
    async fn first_page(&self, kind: ResourceKind, count: u32) -> Result<Page, FetchError>;

    /// Fetches a continuation link exactly as the server returned it.
    async fn next_page(&self, url: &str) -> Result<Page, FetchError>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn first_page(&self, kind: ResourceKind, count: u32) -> Result<Page, FetchError> {
        (**self).first_page(kind, count).await
    }

    async fn next_page(&self, url: &str) -> Result<Page, FetchError> {
        (**self).next_page(url).await
    }
}

/// Read-only client for a FHIR server's search API.
#[derive(Debug, Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<AuthHeader>,
}

impl FhirClient {
    /// Creates a client for `base_url`, e.g. `https://fhir.example.org/R4`.
    ///
    /// `request_timeout` bounds every request from connect to the end of the body.
    pub fn new(
        base_url: &str,
        auth: Option<AuthHeader>,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).map_err(|e| FetchError::invalid_url(&base_url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(
                &base_url,
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::from_reqwest(&base_url, e))?;

        debug!(
            base_url = %base_url,
            auth = auth.as_ref().map_or("none", AuthHeader::scheme),
            "FHIR client ready"
        );

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{ResourceType}?_count={count}`
    pub fn search_url(&self, kind: ResourceKind, count: u32) -> Result<Url, FetchError> {
        let raw = format!("{}/{}", self.base_url, kind.resource_type());
        let mut url = Url::parse(&raw).map_err(|e| FetchError::invalid_url(raw, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("_count", &count.to_string());
        Ok(url)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(auth) = &self.auth {
            req = auth.apply(req);
        }
        req.header(reqwest::header::ACCEPT, FHIR_JSON)
    }

    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let resp = self
            .request(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let page = handle_response(url, resp).await?;
        debug!(
            entries = page.len(),
            has_next = page.next_url().is_some(),
            "Page fetched"
        );
        Ok(page)
    }
}

#[async_trait]
impl PageSource for FhirClient {
    #[instrument(skip(self), fields(kind = %kind))]
    async fn first_page(&self, kind: ResourceKind, count: u32) -> Result<Page, FetchError> {
        let url = self.search_url(kind, count)?;
        self.fetch(url.as_str()).await
    }

    #[instrument(skip(self))]
    async fn next_page(&self, url: &str) -> Result<Page, FetchError> {
        self.fetch(url).await
    }
}

async fn handle_response(url: &str, resp: reqwest::Response) -> Result<Page, FetchError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), "Upstream rejected credentials");
        return Err(FetchError::Unauthorized {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    decode_bundle(url, &body)
}

/// Prefers OperationOutcome diagnostics over the raw body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && json.get("resourceType").and_then(|v| v.as_str()) == Some("OperationOutcome")
        && let Some(issues) = json.get("issue").and_then(|v| v.as_array())
    {
        let msgs: Vec<&str> = issues
            .iter()
            .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
            .collect();
        if !msgs.is_empty() {
            return msgs.join("; ");
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.to_string()
    }
}

fn decode_bundle(url: &str, body: &str) -> Result<Page, FetchError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| FetchError::decode(url, e.to_string()))?;

    if !json.is_object() {
        return Err(FetchError::decode(url, "response is not a JSON object"));
    }
    if let Some(other) = json.get("resourceType").and_then(|v| v.as_str())
        && other != "Bundle"
    {
        return Err(FetchError::decode(
            url,
            format!("expected Bundle, got {other}"),
        ));
    }

    let bundle: Bundle =
        serde_json::from_value(json).map_err(|e| FetchError::decode(url, e.to_string()))?;
    Ok(Page::from(bundle))
}
