//! HTTP client for uploads and remote sources.
//!
//! Thin layer over `reqwest` (rustls) that applies the configured
//! credentials, a whole-request timeout and a cap on response bodies.

use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, Response};
use url::Url;

use teaser_common::config::UploadConfig;
use teaser_common::error::{TeaserError, TeaserResult};

use crate::export::{UploadRequest, UploadResponse, UploadTransport};

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    authorization: Option<HeaderValue>,
    cookie: Option<HeaderValue>,
    max_body_bytes: u64,
}

impl HttpTransport {
    /// Transport with default limits and no credentials.
    pub fn new() -> TeaserResult<Self> {
        Self::from_config(&UploadConfig::default())
    }

    /// Transport using the credentials and limits in `config`. Credentials
    /// that cannot be sent as header values are rejected here.
    pub fn from_config(config: &UploadConfig) -> TeaserResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TeaserError::transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            authorization: credential("authorization", config.authorization.as_deref())?,
            cookie: credential("cookie", config.cookie.as_deref())?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `url`, failing on any non-2xx status.
    pub async fn get(&self, url: &str) -> TeaserResult<Vec<u8>> {
        let response = self.send(Method::GET, url, None, Vec::new(), false).await?;
        if !(200..300).contains(&response.status) {
            return Err(TeaserError::load(format!(
                "{url}: {}: {}",
                response.status, response.status_text
            )));
        }
        Ok(response.body)
    }

    /// Issue a single request and read the full response.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
        include_credentials: bool,
    ) -> TeaserResult<HttpResponse> {
        let parsed =
            Url::parse(url).map_err(|e| TeaserError::transport(format!("invalid URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TeaserError::transport(format!(
                "{url}: scheme {:?} is not supported",
                parsed.scheme()
            )));
        }

        tracing::debug!(%method, url, bytes = body.len(), "Sending HTTP request");
        let mut request = self.client.request(method.clone(), parsed);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if include_credentials {
            if let Some(value) = &self.authorization {
                request = request.header(AUTHORIZATION, value.clone());
            }
            if let Some(value) = &self.cookie {
                request = request.header(COOKIE, value.clone());
            }
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;
        let status = response.status().as_u16();
        let status_text = reason_phrase(&response);
        let body = self.read_body(url, response).await?;

        tracing::debug!(
            %method,
            url,
            status,
            bytes = body.len(),
            "HTTP response received"
        );
        Ok(HttpResponse {
            status,
            status_text,
            body,
        })
    }

    async fn read_body(&self, url: &str, mut response: Response) -> TeaserResult<Vec<u8>> {
        let limit = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > limit {
                return Err(TeaserError::transport(format!(
                    "{url}: body of {len} bytes exceeds the {limit} byte limit"
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| request_error(url, e))? {
            let total = (body.len() as u64).checked_add(chunk.len() as u64);
            if total.map_or(true, |total| total > limit) {
                return Err(TeaserError::transport(format!(
                    "{url}: body exceeds the {limit} byte limit"
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl UploadTransport for HttpTransport {
    async fn put(&self, request: UploadRequest) -> TeaserResult<UploadResponse> {
        let response = self
            .send(
                Method::PUT,
                &request.url,
                Some(request.content_type),
                request.body,
                request.include_credentials,
            )
            .await?;
        Ok(UploadResponse {
            status: response.status,
            status_text: response.status_text,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn credential(name: &str, value: Option<&str>) -> TeaserResult<Option<HeaderValue>> {
    value
        .map(|value| {
            let mut header = HeaderValue::from_str(value).map_err(|_| {
                TeaserError::transport(format!("{name} credential contains invalid characters"))
            })?;
            header.set_sensitive(true);
            Ok(header)
        })
        .transpose()
}

/// The server's reason phrase, or the canonical one for the status.
fn reason_phrase(response: &Response) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn request_error(url: &str, err: reqwest::Error) -> TeaserError {
    if err.is_timeout() {
        return TeaserError::transport(format!("{url}: timed out"));
    }
    let mut message = format!("{url}: {err}");
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TeaserError::transport(message)
}
