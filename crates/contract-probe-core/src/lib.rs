#![warn(missing_docs)]
//! # contract-probe-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `contract-probe` workspace.
//!
//! ## Responsibilities
//! - Represent the immutable per-run configuration (base URL, headers, timeout).
//! - Describe endpoint contracts: request shape, expected status, body
//!   expectation, and field assertions.
//! - Represent tagged response bodies so callers never index into an unknown
//!   JSON shape.
//! - Represent per-case outcomes ([`TestResult`]) and the mismatches they carry.
//!
//! ## Data flow
//! Suites declare [`EndpointContract`] values. The HTTP layer renders them into
//! requests against [`RunConfig`], parses replies into [`ResponseBody`], and the
//! runner compares them, collecting [`Mismatch`] values into a [`TestResult`].
//!
//! ## Ownership and lifetimes
//! Contracts and results own their strings and JSON values so they can be moved
//! between runner stages and serialized into reports without borrowing from
//! transient response buffers.
//!
//! ## Error model
//! Construction failures (bad base URL, bad header name, unrenderable path
//! template) return [`CoreError`]. Assertion outcomes are data ([`Mismatch`]),
//! never errors.
//!
//! ## Example
//! ```rust
//! use contract_probe_core::{EndpointContract, HttpMethod};
//!
//! let contract = EndpointContract::new(HttpMethod::Get, "/api/users/{id}", 200)
//!     .path_param("id", "9")
//!     .expect_schema("get_single_user");
//! assert_eq!(contract.render_path().unwrap(), "/api/users/9");
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Default per-call timeout applied when the caller does not configure one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Immutable configuration shared by every case of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    base_url: Url,
    default_headers: Vec<(String, String)>,
    timeout: Duration,
}

impl RunConfig {
    /// Creates a validated run configuration with no default headers.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidBaseUrl`] when the URL does not parse, is not
    /// `http`/`https`, or has no host.
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|error| CoreError::InvalidBaseUrl(format!("{base_url}: {error}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(CoreError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        if parsed.host_str().is_none() {
            return Err(CoreError::InvalidBaseUrl(format!(
                "{base_url}: host is missing"
            )));
        }

        Ok(Self {
            base_url: parsed,
            default_headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Adds one default header sent with every request.
    ///
    /// A later header with the same (case-insensitive) name replaces the
    /// earlier one.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidHeader`] for blank or non-token names.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        validate_header_name(&name)?;
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        Ok(self)
    }

    /// Sets the per-call timeout.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTimeout`] when `timeout` is zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CoreError> {
        if timeout.is_zero() {
            return Err(CoreError::InvalidTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Returns the validated base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns default headers in insertion order.
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Validates an HTTP header name (RFC 7230 token characters).
///
/// # Errors
/// Returns [`CoreError::InvalidHeader`] when the name is empty or contains
/// separators, whitespace, or control characters.
pub fn validate_header_name(name: &str) -> Result<(), CoreError> {
    let is_token = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
    if name.is_empty() || !name.chars().all(is_token) {
        return Err(CoreError::InvalidHeader(name.to_string()));
    }
    Ok(())
}

/// HTTP methods exercised by contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case method token.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Request payload attached to a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
    /// Sent as `application/json`.
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Returns the top-level fields of the payload as JSON values.
    ///
    /// Form fields are always strings; JSON payloads that are not objects
    /// have no fields.
    pub fn fields(&self) -> Vec<(String, Value)> {
        match self {
            RequestBody::Json(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            RequestBody::Json(_) => Vec::new(),
            RequestBody::Form(pairs) => pairs
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
        }
    }
}

/// One field-level expectation evaluated against a JSON response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldAssertion {
    /// Value at `pointer` must equal `expected` exactly.
    Equals {
        /// RFC 6901 pointer into the body.
        pointer: String,
        /// Expected JSON value.
        expected: Value,
    },
    /// Value at `pointer` must exist and not be `null`.
    Present {
        /// RFC 6901 pointer into the body.
        pointer: String,
    },
}

impl FieldAssertion {
    /// Evaluates the assertion, returning a mismatch when it does not hold.
    pub fn check(&self, body: &Value) -> Option<Mismatch> {
        match self {
            FieldAssertion::Equals { pointer, expected } => {
                let actual = body.pointer(pointer);
                if actual == Some(expected) {
                    return None;
                }
                Some(Mismatch::Field {
                    pointer: pointer.clone(),
                    expected: expected.clone(),
                    actual: actual.cloned(),
                })
            }
            FieldAssertion::Present { pointer } => match body.pointer(pointer) {
                Some(value) if !value.is_null() => None,
                actual => Some(Mismatch::Field {
                    pointer: pointer.clone(),
                    expected: Value::String("<present>".to_string()),
                    actual: actual.cloned(),
                }),
            },
        }
    }
}

/// Builds `Equals` assertions that expect every request field echoed back at
/// the top level of the response.
pub fn echo_fields(body: &RequestBody) -> Vec<FieldAssertion> {
    body.fields()
        .into_iter()
        .map(|(key, expected)| FieldAssertion::Equals {
            pointer: format!("/{}", escape_pointer_token(&key)),
            expected,
        })
        .collect()
}

/// What the response body must look like, beyond field assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "schema", rename_all = "snake_case")]
pub enum BodyExpectation {
    /// JSON body validated against the named registered schema.
    Schema(String),
    /// Body must decode to exactly `{}`; no schema check runs.
    EmptyObject,
    /// Raw text must be empty; the body is never JSON-decoded.
    EmptyText,
    /// No structural check.
    Unchecked,
}

/// Declared expectation for one endpoint interaction.
///
/// Expected status and body expectation are fixed when the contract is built
/// and never derived from a server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointContract {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template with `{name}` placeholders.
    pub path_template: String,
    /// Values substituted into the path template.
    pub path_params: Vec<(String, String)>,
    /// Query parameters in send order.
    pub query: Vec<(String, String)>,
    /// Optional request payload.
    pub body: Option<RequestBody>,
    /// Per-call headers; these win over configured defaults.
    pub headers: Vec<(String, String)>,
    /// Expected HTTP status code.
    pub expected_status: u16,
    /// Structural expectation on the body.
    pub body_expectation: BodyExpectation,
    /// Field assertions evaluated against JSON bodies.
    pub assertions: Vec<FieldAssertion>,
}

impl EndpointContract {
    /// Starts a contract with no body, no assertions, and an unchecked body.
    pub fn new(method: HttpMethod, path_template: impl Into<String>, expected_status: u16) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_params: Vec::new(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            expected_status,
            body_expectation: BodyExpectation::Unchecked,
            assertions: Vec::new(),
        }
    }

    /// Binds a `{name}` placeholder in the path template.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON request payload.
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Sets a form-encoded request payload.
    pub fn form_body<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(RequestBody::Form(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ));
        self
    }

    /// Adds a per-call header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Requires the JSON body to conform to a registered schema.
    pub fn expect_schema(mut self, name: impl Into<String>) -> Self {
        self.body_expectation = BodyExpectation::Schema(name.into());
        self
    }

    /// Requires the body to be exactly `{}`.
    pub fn expect_empty_object(mut self) -> Self {
        self.body_expectation = BodyExpectation::EmptyObject;
        self
    }

    /// Requires an empty raw body.
    pub fn expect_empty_text(mut self) -> Self {
        self.body_expectation = BodyExpectation::EmptyText;
        self
    }

    /// Requires the value at `pointer` to equal `expected`.
    pub fn assert_eq(mut self, pointer: impl Into<String>, expected: Value) -> Self {
        self.assertions.push(FieldAssertion::Equals {
            pointer: pointer.into(),
            expected,
        });
        self
    }

    /// Requires a non-null value at `pointer`.
    pub fn assert_present(mut self, pointer: impl Into<String>) -> Self {
        self.assertions.push(FieldAssertion::Present {
            pointer: pointer.into(),
        });
        self
    }

    /// Requires every request payload field to be echoed in the response.
    ///
    /// Call after setting the body; without a body this adds nothing.
    pub fn expect_echo(mut self) -> Self {
        if let Some(body) = &self.body {
            let echoed = echo_fields(body);
            self.assertions.extend(echoed);
        }
        self
    }

    /// Substitutes path parameters into the template.
    ///
    /// # Errors
    /// Returns [`CoreError::MissingPathParam`] for an unbound placeholder and
    /// [`CoreError::MalformedPathTemplate`] for an unterminated `{`.
    pub fn render_path(&self) -> Result<String, CoreError> {
        let mut rendered = String::with_capacity(self.path_template.len());
        let mut rest = self.path_template.as_str();

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                CoreError::MalformedPathTemplate(self.path_template.clone())
            })?;
            let name = &after[..close];
            let value = self
                .path_params
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
                .ok_or_else(|| CoreError::MissingPathParam(name.to_string()))?;
            rendered.push_str(value);
            rest = &after[close + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

/// Response body classified before any field access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Body decoded as JSON.
    Json(Value),
    /// Body was empty or whitespace only.
    Empty,
    /// Body was present but not valid JSON.
    Malformed {
        /// Decoder error text.
        reason: String,
    },
}

impl ResponseBody {
    /// Classifies raw response text.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return ResponseBody::Empty;
        }

        match serde_json::from_str(raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(error) => ResponseBody::Malformed {
                reason: error.to_string(),
            },
        }
    }

    /// Returns the decoded JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Short label used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseBody::Json(_) => "json",
            ResponseBody::Empty => "empty",
            ResponseBody::Malformed { .. } => "malformed",
        }
    }
}

/// One structural schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// RFC 6901 pointer to the offending location (`""` is the root).
    pub pointer: String,
    /// What the schema declared.
    pub expected: String,
    /// What the body contained.
    pub actual: String,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        pointer: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            pointer: pointer.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = if self.pointer.is_empty() {
            "<root>"
        } else {
            &self.pointer
        };
        write!(
            f,
            "{pointer}: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

/// One failed check recorded against a received response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// Status code differs from the contract.
    Status {
        /// Declared status.
        expected: u16,
        /// Received status.
        actual: u16,
    },
    /// A field assertion did not hold.
    Field {
        /// Pointer into the body.
        pointer: String,
        /// Expected value.
        expected: Value,
        /// Actual value, `None` when absent.
        actual: Option<Value>,
    },
    /// Schema validation reported a violation.
    Schema(Violation),
    /// Body shape differs from the expectation (e.g. non-empty on 204).
    Body {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },
    /// JSON was required but the body did not decode.
    Malformed {
        /// Decoder error text.
        reason: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Status { expected, actual } => {
                write!(f, "status: expected {expected}, got {actual}")
            }
            Mismatch::Field {
                pointer,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "field {pointer}: expected {expected}, got {actual}"),
                None => write!(f, "field {pointer}: expected {expected}, got <absent>"),
            },
            Mismatch::Schema(violation) => write!(f, "schema {violation}"),
            Mismatch::Body { expected, actual } => {
                write!(f, "body: expected {expected}, got {actual}")
            }
            Mismatch::Malformed { reason } => write!(f, "malformed response: {reason}"),
        }
    }
}

/// Lifecycle state of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    /// Declared, not yet dispatched.
    Pending,
    /// Request dispatched, awaiting evaluation.
    Executing,
    /// Every check succeeded.
    Passed,
    /// Response received but at least one check failed.
    Failed,
    /// Transport or harness failure; no verdict on the contract.
    Errored,
}

impl CaseState {
    /// Returns `true` for `Passed`, `Failed`, and `Errored`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CaseState::Passed | CaseState::Failed | CaseState::Errored
        )
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaseState::Pending => "PENDING",
            CaseState::Executing => "EXECUTING",
            CaseState::Passed => "PASSED",
            CaseState::Failed => "FAILED",
            CaseState::Errored => "ERRORED",
        };
        f.pad(label)
    }
}

/// Outcome of executing one contract against a live server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Case name.
    pub name: String,
    /// Terminal state.
    pub state: CaseState,
    /// Received status, if a response arrived.
    pub status: Option<u16>,
    /// Every mismatch found (empty unless `Failed`).
    pub mismatches: Vec<Mismatch>,
    /// Error text when `Errored`.
    pub error: Option<String>,
    /// Raw response text, if a response arrived.
    pub raw_body: Option<String>,
    /// Wall-clock time spent on the case.
    pub elapsed_ms: u64,
}

impl TestResult {
    /// Returns `true` when the case passed.
    pub fn passed(&self) -> bool {
        self.state == CaseState::Passed
    }
}

/// Escapes one RFC 6901 reference token.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Appends a reference token to a JSON pointer.
pub fn join_pointer(base: &str, token: &str) -> String {
    format!("{base}/{}", escape_pointer_token(token))
}

/// Error type for configuration and contract construction failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Base URL failed validation.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Header name is not a valid HTTP token.
    #[error("invalid header name: {0:?}")]
    InvalidHeader(String),
    /// Timeout must be positive.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
    /// Path template references a parameter that was not bound.
    #[error("path parameter `{0}` is not bound")]
    MissingPathParam(String),
    /// Path template has an unterminated placeholder.
    #[error("malformed path template: {0}")]
    MalformedPathTemplate(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for contract rendering and body classification.

    use serde_json::json;

    use super::*;

    #[test]
    fn render_path_substitutes_every_placeholder() {
        let contract = EndpointContract::new(HttpMethod::Get, "/api/{kind}/{id}", 200)
            .path_param("kind", "users")
            .path_param("id", "7");
        assert_eq!(contract.render_path().unwrap(), "/api/users/7");
    }

    #[test]
    fn render_path_rejects_unbound_and_unterminated() {
        let missing = EndpointContract::new(HttpMethod::Get, "/api/users/{id}", 200);
        assert!(matches!(
            missing.render_path(),
            Err(CoreError::MissingPathParam(name)) if name == "id"
        ));

        let open = EndpointContract::new(HttpMethod::Get, "/api/users/{id", 200);
        assert!(matches!(
            open.render_path(),
            Err(CoreError::MalformedPathTemplate(_))
        ));
    }

    #[test]
    fn response_body_classifies_empty_and_malformed() {
        assert_eq!(ResponseBody::parse(""), ResponseBody::Empty);
        assert_eq!(ResponseBody::parse("  \n"), ResponseBody::Empty);
        assert_eq!(ResponseBody::parse("{}"), ResponseBody::Json(json!({})));
        assert!(matches!(
            ResponseBody::parse("<html>"),
            ResponseBody::Malformed { .. }
        ));
    }

    #[test]
    fn echo_fields_use_form_values_as_strings() {
        let body = RequestBody::Form(vec![("name".to_string(), "Batman".to_string())]);
        let assertions = echo_fields(&body);
        assert_eq!(
            assertions,
            vec![FieldAssertion::Equals {
                pointer: "/name".to_string(),
                expected: json!("Batman"),
            }]
        );
    }

    #[test]
    fn present_assertion_rejects_null() {
        let assertion = FieldAssertion::Present {
            pointer: "/token".to_string(),
        };
        assert!(assertion.check(&json!({"token": "abc"})).is_none());
        assert!(assertion.check(&json!({"token": null})).is_some());
        assert!(assertion.check(&json!({})).is_some());
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        assert_eq!(join_pointer("/data", "a/b~c"), "/data/a~1b~0c");
    }

    #[test]
    fn config_rejects_non_http_schemes() {
        assert!(RunConfig::new("ftp://example.test/").is_err());
        assert!(RunConfig::new("not a url").is_err());
        assert!(RunConfig::new("https://example.test/").is_ok());
    }
}
