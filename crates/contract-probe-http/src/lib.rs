#![warn(missing_docs)]
//! # contract-probe-http
//!
//! ## Purpose
//! Issues contract requests against the configured base URL and classifies the
//! replies.
//!
//! ## Responsibilities
//! - Join the base URL and request path without dropping a base path prefix.
//! - Merge default headers with per-call headers (per-call wins).
//! - Encode JSON and form payloads.
//! - Execute requests through an injectable [`HttpTransport`].
//! - Classify bodies into [`ResponseBody`] variants instead of failing on
//!   empty or non-JSON replies.
//!
//! ## Data flow
//! Runner -> [`HttpClient::send`] -> [`PreparedRequest`] -> [`HttpTransport`]
//! -> [`RawResponse`] -> [`HttpResponse`].
//!
//! ## Error model
//! Only failures to obtain a response are errors ([`HttpError`]). Any status
//! code, including 4xx/5xx, is a normal [`HttpResponse`].
//!
//! ## Security and privacy notes
//! Header values are never logged verbatim; see [`redact_header`].

use std::sync::Arc;
use std::time::Duration;

use contract_probe_core::{HttpMethod, RequestBody, ResponseBody, RunConfig};
use thiserror::Error;
use tracing::debug;
use url::Url;
use url::form_urlencoded;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
const USER_AGENT: &str = concat!("contract-probe/", env!("CARGO_PKG_VERSION"));

/// Per-call request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Query parameters appended in order.
    pub query: Vec<(String, String)>,
    /// Optional payload.
    pub body: Option<RequestBody>,
    /// Per-call headers, overriding defaults of the same name.
    pub headers: Vec<(String, String)>,
}

/// Fully resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute request URL including query.
    pub url: Url,
    /// Final header set after merging.
    pub headers: Vec<(String, String)>,
    /// Encoded payload bytes, if any.
    pub body: Option<Vec<u8>>,
    /// Per-call timeout.
    pub timeout: Duration,
}

/// Status and text returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body decoded as UTF-8 text.
    pub text: String,
}

/// Classified response returned by [`HttpClient::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Tagged body.
    pub body: ResponseBody,
    /// Raw body text.
    pub raw_text: String,
}

/// Network seam used by [`HttpClient`].
pub trait HttpTransport: Send + Sync {
    /// Executes one request and returns its status and body text.
    fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, HttpError>;
}

/// Blocking transport backed by a shared `ureq` agent.
///
/// Each request carries its own [`PreparedRequest::timeout`]; the agent only
/// fixes that non-2xx statuses are returned as responses.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Creates a transport over a fresh agent.
    pub fn new() -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build(),
        );
        Self { agent }
    }
}

fn apply_request<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &PreparedRequest,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .config()
        .timeout_global(Some(request.timeout))
        .build()
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, HttpError> {
        let url = request.url.as_str();
        let payload = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => apply_request(self.agent.get(url), request).call(),
            HttpMethod::Delete => apply_request(self.agent.delete(url), request).call(),
            HttpMethod::Post => apply_request(self.agent.post(url), request).send(payload),
            HttpMethod::Put => apply_request(self.agent.put(url), request).send(payload),
        };

        let response = result.map_err(|error| classify_ureq_error(url, error))?;
        let status = response.status().as_u16();

        let mut text = String::new();
        std::io::Read::read_to_string(&mut response.into_body().into_reader(), &mut text)
            .map_err(|error| HttpError::Transport(format!("{url}: failed to read body: {error}")))?;

        Ok(RawResponse { status, text })
    }
}

fn classify_ureq_error(url: &str, error: ureq::Error) -> HttpError {
    match error {
        ureq::Error::Timeout(_) => HttpError::Timeout(format!("{url}: {error}")),
        ureq::Error::HostNotFound => HttpError::Dns(format!("{url}: {error}")),
        ureq::Error::ConnectionFailed => HttpError::Connect(format!("{url}: {error}")),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            HttpError::Timeout(format!("{url}: {io}"))
        }
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            HttpError::Connect(format!("{url}: {io}"))
        }
        other => HttpError::Transport(format!("{url}: {other}")),
    }
}

/// Contract-facing HTTP client bound to one run configuration.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<RunConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl HttpClient {
    /// Creates a client over an arbitrary transport.
    pub fn new(config: Arc<RunConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Creates a client backed by [`UreqTransport`].
    pub fn with_ureq(config: Arc<RunConfig>) -> Self {
        Self::new(config, Arc::new(UreqTransport::new()))
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolves URL, headers, and payload without sending.
    ///
    /// # Errors
    /// Returns [`HttpError::InvalidUrl`] when the joined URL does not parse.
    pub fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<PreparedRequest, HttpError> {
        let mut url = join_url(self.config.base_url(), path)?;
        if !options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &options.query {
                pairs.append_pair(name, value);
            }
        }

        let (body, content_type) = match &options.body {
            Some(RequestBody::Json(value)) => (
                Some(serde_json::to_vec(value).map_err(|error| {
                    HttpError::Encode(format!("json payload: {error}"))
                })?),
                Some(CONTENT_TYPE_JSON),
            ),
            Some(RequestBody::Form(pairs)) => {
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                (Some(encoded.into_bytes()), Some(CONTENT_TYPE_FORM))
            }
            None => (None, None),
        };

        let mut base = vec![("user-agent".to_string(), USER_AGENT.to_string())];
        if let Some(content_type) = content_type {
            base.push(("content-type".to_string(), content_type.to_string()));
        }
        let headers = merge_headers(
            &merge_headers(&base, self.config.default_headers()),
            &options.headers,
        );

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
            timeout: self.config.timeout(),
        })
    }

    /// Sends a request and classifies the reply.
    ///
    /// # Errors
    /// Returns [`HttpError`] when no response was obtained (bad URL, timeout,
    /// connection or DNS failure).
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let request = self.prepare(method, path, options)?;
        debug!(
            method = %request.method,
            url = %request.url,
            headers = ?request
                .headers
                .iter()
                .map(|(name, value)| format!("{name}: {}", redact_header(name, value)))
                .collect::<Vec<_>>(),
            "sending request"
        );

        let raw = self.transport.execute(&request)?;
        debug!(status = raw.status, bytes = raw.text.len(), "response received");

        Ok(HttpResponse {
            status_code: raw.status,
            body: ResponseBody::parse(&raw.text),
            raw_text: raw.text,
        })
    }
}

/// Concatenates `path` onto the base URL, normalising the joining slash.
///
/// Unlike `Url::join`, a path prefix on the base (`https://host/v1/`) is kept.
///
/// # Errors
/// Returns [`HttpError::InvalidUrl`] when the result does not parse.
pub fn join_url(base: &Url, path: &str) -> Result<Url, HttpError> {
    let mut joined = base.clone();
    joined.set_query(None);
    joined.set_fragment(None);

    let (path_part, query_part) = match path.split_once('?') {
        Some((path_part, query_part)) => (path_part, Some(query_part)),
        None => (path, None),
    };

    let prefix = joined.path().trim_end_matches('/').to_string();
    let suffix = path_part.trim_start_matches('/');
    joined.set_path(&format!("{prefix}/{suffix}"));
    joined.set_query(query_part);

    if joined.cannot_be_a_base() {
        return Err(HttpError::InvalidUrl(format!("{base} + {path}")));
    }
    Ok(joined)
}

/// Merges two header lists; names compare case-insensitively and `overrides`
/// win. Order follows first appearance.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(defaults.len() + overrides.len());
    for (name, value) in defaults.iter().chain(overrides) {
        match merged
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => *slot = (name.clone(), value.clone()),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

/// Returns a log-safe rendering of a header value.
///
/// Credential-bearing headers are replaced with `<redacted>`.
pub fn redact_header(name: &str, value: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let sensitive = matches!(
        lower.as_str(),
        "authorization" | "proxy-authorization" | "cookie" | "set-cookie" | "x-api-key"
    ) || lower.contains("token")
        || lower.contains("secret");

    if sensitive {
        "<redacted>".to_string()
    } else {
        value.to_string()
    }
}

/// Failures to obtain a response.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Base URL and path did not form a valid URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// Payload could not be encoded.
    #[error("request encoding failure: {0}")]
    Encode(String),
    /// Call exceeded the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Host name did not resolve.
    #[error("host not found: {0}")]
    Dns(String),
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Transport(String),
}
