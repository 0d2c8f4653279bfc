#![warn(missing_docs)]
//! # contract-probe-app
//!
//! ## Purpose
//! Wires configuration, the bundled users-API suite, the runner, and report
//! rendering for the `contract-probe` binary.
//!
//! ## Responsibilities
//! - Turn CLI/env inputs into one immutable [`RunConfig`].
//! - Declare the bundled `reqres` users suite, including its destructive
//!   create -> update -> delete -> fetch sequence.
//! - Render per-case lines, response bodies, and the final summary as human
//!   text or JSON.
//!
//! ## Data flow
//! [`ConfigInputs`] -> [`build_run_config`] -> `HttpClient` + bundled schemas
//! -> `Runner::run_suite_with` -> [`render_case`] / [`render_summary`].
//!
//! ## Error model
//! Configuration and suite-definition problems are [`AppError`] values and map
//! to exit code `2`. Case failures never surface as errors; they only move the
//! exit code to `1`.
//!
//! ## Security and privacy notes
//! The API key is sent as a header and never rendered in reports.

use std::fmt::Write as _;
use std::time::Duration;

use contract_probe_core::{CaseState, CoreError, EndpointContract, HttpMethod, RunConfig, TestResult};
use contract_probe_runner::{RunnerError, Suite, SuiteReport, TestCase};
use contract_probe_schema::{
    GET_ALL_USERS, GET_CREATED_USER, GET_SINGLE_USER, POST_USER, PUT_USER,
    REGISTER_USER_SUCCESSFUL, REGISTER_USER_UNSUCCESSFUL, SchemaError,
};
use serde_json::json;
use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("CONTRACT_PROBE_VERSION");

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://reqres.in/";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Name of the bundled suite.
pub const REQRES_SUITE: &str = "reqres-users";

/// Exit code for configuration or suite-definition errors.
pub const EXIT_CONFIG_ERROR: i32 = 2;

const USERS_PATH: &str = "/api/users";
const USER_PATH: &str = "/api/users/{id}";
const REGISTER_PATH: &str = "/api/register";

/// Expected `error` text for rejected registrations.
pub const REGISTRATION_REJECTED: &str = "Note: Only defined users succeed registration";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Raw configuration values gathered from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInputs {
    /// Base URL of the service under test.
    pub base_url: String,
    /// Optional API key sent as [`API_KEY_HEADER`].
    pub api_key: Option<String>,
    /// Extra default headers as `NAME:VALUE`.
    pub headers: Vec<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ConfigInputs {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            headers: Vec::new(),
            timeout_secs: contract_probe_core::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Splits a `NAME:VALUE` header argument.
///
/// # Errors
/// Returns [`AppError::HeaderArgument`] when the colon is missing or the name
/// is blank.
pub fn parse_header_arg(raw: &str) -> Result<(String, String), AppError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| AppError::HeaderArgument(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::HeaderArgument(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Builds the immutable run configuration.
///
/// Explicit `--header` values are applied after the API key, so a header
/// named `x-api-key` overrides `--api-key`.
///
/// # Errors
/// Returns [`AppError::Config`] for an invalid base URL, header, or timeout.
pub fn build_run_config(inputs: &ConfigInputs) -> Result<RunConfig, AppError> {
    let mut config = RunConfig::new(&inputs.base_url)?
        .with_timeout(Duration::from_secs(inputs.timeout_secs))?;

    if let Some(api_key) = inputs.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
        config = config.with_default_header(API_KEY_HEADER, api_key.trim())?;
    }

    for raw in &inputs.headers {
        let (name, value) = parse_header_arg(raw)?;
        config = config.with_default_header(name, value)?;
    }

    Ok(config)
}

/// Declares the bundled `reqres` users-API suite.
///
/// `update_user_successful`, `delete_user`, and
/// `get_deleted_user_by_id_not_found` form a dependent sequence on user `45`
/// and always run in that order after `create_user`.
///
/// # Errors
/// Returns [`AppError::Suite`] if the declaration is inconsistent.
pub fn reqres_suite() -> Result<Suite, AppError> {
    let cases = vec![
        TestCase::new(
            "get_users_list_on_page",
            EndpointContract::new(HttpMethod::Get, USERS_PATH, 200)
                .query("page", "1")
                .assert_eq("/per_page", json!(6))
                .expect_schema(GET_ALL_USERS),
        ),
        TestCase::new(
            "get_single_user_by_id",
            EndpointContract::new(HttpMethod::Get, USER_PATH, 200)
                .path_param("id", "9")
                .assert_eq("/data/id", json!(9))
                .expect_schema(GET_SINGLE_USER),
        ),
        TestCase::new(
            "get_single_user_by_id_not_found",
            EndpointContract::new(HttpMethod::Get, USER_PATH, 404)
                .path_param("id", "99")
                .expect_empty_object(),
        ),
        TestCase::new(
            "create_user",
            EndpointContract::new(HttpMethod::Post, USERS_PATH, 201)
                .form_body([("name", "Batman"), ("job", "batman")])
                .expect_echo()
                .expect_schema(POST_USER),
        ),
        TestCase::new(
            "create_user_and_compare_request_vs_response_params",
            EndpointContract::new(HttpMethod::Post, USERS_PATH, 201)
                .form_body([
                    ("email", "Batman@bat.man"),
                    ("first_name", "Bat"),
                    ("last_name", "man"),
                    ("avatar", "Batvatar"),
                ])
                .expect_echo()
                .expect_schema(GET_CREATED_USER),
        ),
        TestCase::new(
            "update_user_successful",
            EndpointContract::new(HttpMethod::Put, USER_PATH, 200)
                .path_param("id", "45")
                .json_body(json!({"name": "Superman", "job": "superman"}))
                .expect_echo()
                .expect_schema(PUT_USER),
        )
        .depends_on("create_user"),
        TestCase::new(
            "delete_user",
            EndpointContract::new(HttpMethod::Delete, USER_PATH, 204)
                .path_param("id", "45")
                .expect_empty_text(),
        )
        .depends_on("update_user_successful"),
        TestCase::new(
            "get_deleted_user_by_id_not_found",
            EndpointContract::new(HttpMethod::Get, USER_PATH, 404)
                .path_param("id", "45")
                .expect_empty_object(),
        )
        .depends_on("delete_user"),
        TestCase::new(
            "register_user_successful",
            EndpointContract::new(HttpMethod::Post, REGISTER_PATH, 200)
                .form_body([("email", "eve.holt@reqres.in"), ("password", "pistol")])
                .assert_present("/token")
                .expect_schema(REGISTER_USER_SUCCESSFUL),
        ),
        TestCase::new(
            "register_user_unsuccessful",
            EndpointContract::new(HttpMethod::Post, REGISTER_PATH, 400)
                .json_body(json!({"email": "Batman@bat.man", "password": "joker_lox"}))
                .assert_eq("/error", json!(REGISTRATION_REJECTED))
                .expect_schema(REGISTER_USER_UNSUCCESSFUL),
        ),
    ];

    Ok(Suite::new(REQRES_SUITE, cases)?)
}

/// Narrows `suite` to `selected` cases (plus dependencies); empty keeps all.
///
/// # Errors
/// Returns [`AppError::Suite`] for unknown case names.
pub fn select_cases(suite: Suite, selected: &[String]) -> Result<Suite, AppError> {
    if selected.is_empty() {
        return Ok(suite);
    }
    Ok(suite.select(selected)?)
}

/// One line per case in execution order, with its dependencies.
pub fn render_case_list(suite: &Suite) -> String {
    let mut out = String::new();
    for case in suite.cases() {
        let contract = &case.contract;
        let _ = write!(
            out,
            "{:<52} {:<6} {} -> {}",
            case.name, contract.method, contract.path_template, contract.expected_status
        );
        if !case.depends_on.is_empty() {
            let _ = write!(out, " (after {})", case.depends_on.join(", "));
        }
        out.push('\n');
    }
    out
}

/// Human-readable block for one finished case, including its response body.
pub fn render_case(result: &TestResult) -> String {
    let mut out = String::new();
    let status = result
        .status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "---".to_string());
    let _ = writeln!(
        out,
        "{:<8} {} [{status}] {} ms",
        result.state, result.name, result.elapsed_ms
    );

    for mismatch in &result.mismatches {
        let _ = writeln!(out, "    - {mismatch}");
    }
    if let Some(error) = &result.error {
        let _ = writeln!(out, "    ! {error}");
    }
    match result.raw_body.as_deref() {
        Some("") => {
            let _ = writeln!(out, "    body: <empty>");
        }
        Some(body) => {
            let _ = writeln!(out, "    body: {}", body.trim());
        }
        None => {}
    }
    out
}

/// Final summary line.
pub fn render_summary(report: &SuiteReport) -> String {
    format!(
        "{}: {} passed, {} failed, {} errored ({} cases, {} ms)\n",
        report.suite,
        report.count(CaseState::Passed),
        report.count(CaseState::Failed),
        report.count(CaseState::Errored),
        report.results.len(),
        report.elapsed_ms
    )
}

/// Pretty JSON rendering of the whole report.
///
/// # Errors
/// Returns [`AppError::Render`] if serialization fails.
pub fn render_report_json(report: &SuiteReport) -> Result<String, AppError> {
    serde_json::to_string_pretty(report).map_err(AppError::Render)
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Run configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),
    /// A `--header` argument was not `NAME:VALUE`.
    #[error("invalid header argument {0:?}: expected NAME:VALUE")]
    HeaderArgument(String),
    /// Suite declaration or selection failed.
    #[error("suite error: {0}")]
    Suite(#[from] RunnerError),
    /// Bundled schemas failed to load.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Report could not be serialized.
    #[error("render error: {0}")]
    Render(serde_json::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_CONFIG_ERROR
    }
}
