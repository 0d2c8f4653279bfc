#![warn(missing_docs)]
//! # contract-probe-runner
//!
//! ## Purpose
//! Executes declared test cases against a live server and records one
//! [`TestResult`] per case.
//!
//! ## Responsibilities
//! - Order cases so declared dependencies always run first.
//! - Drive each case through `PENDING -> EXECUTING -> {PASSED, FAILED, ERRORED}`.
//! - Collect every status, field, body-shape, and schema mismatch without
//!   stopping at the first one.
//! - Keep one case's transport or harness failure from aborting the suite.
//!
//! ## Data flow
//! [`Suite`] -> [`Runner::run_suite`] -> per case: [`HttpClient::send`] ->
//! [`evaluate`] -> [`TestResult`] -> [`SuiteReport`].
//!
//! ## Sequencing
//! Destructive sequences (create -> update -> delete -> fetch-deleted) share
//! remote state. They are declared with [`TestCase::depends_on`]; a dependent
//! case never runs before its dependencies, and is ERRORED without sending
//! anything when a dependency did not pass. Running such a case standalone
//! against a stateless server is undefined; [`Suite::select`] therefore always
//! pulls dependencies in.
//!
//! ## Error model
//! Suite construction problems return [`RunnerError`]. Per-case failures are
//! data: FAILED carries [`Mismatch`] values, ERRORED carries the
//! [`CaseError`] text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use contract_probe_core::{
    BodyExpectation, CaseState, CoreError, EndpointContract, Mismatch, ResponseBody, TestResult,
};
use contract_probe_http::{HttpClient, HttpError, HttpResponse, RequestOptions};
use contract_probe_schema::{SchemaError, SchemaRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One named contract plus its sequencing constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Unique case name within a suite.
    pub name: String,
    /// Contract exercised by the case.
    pub contract: EndpointContract,
    /// Cases that must PASS earlier in the same run.
    pub depends_on: Vec<String>,
}

impl TestCase {
    /// Creates an independent case.
    pub fn new(name: impl Into<String>, contract: EndpointContract) -> Self {
        Self {
            name: name.into(),
            contract,
            depends_on: Vec::new(),
        }
    }

    /// Declares that `dependency` must run and pass before this case.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }
}

/// Validated, dependency-ordered collection of cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    name: String,
    cases: Vec<TestCase>,
}

impl Suite {
    /// Validates cases and orders them so dependencies come first.
    ///
    /// Declaration order is preserved wherever dependencies do not force a
    /// change.
    ///
    /// # Errors
    /// Returns [`RunnerError::DuplicateCase`], [`RunnerError::UnknownDependency`],
    /// or [`RunnerError::DependencyCycle`].
    pub fn new(name: impl Into<String>, cases: Vec<TestCase>) -> Result<Self, RunnerError> {
        let mut names = HashSet::new();
        for case in &cases {
            if !names.insert(case.name.as_str()) {
                return Err(RunnerError::DuplicateCase(case.name.clone()));
            }
        }

        for case in &cases {
            if let Some(missing) = case
                .depends_on
                .iter()
                .find(|dependency| !names.contains(dependency.as_str()))
            {
                return Err(RunnerError::UnknownDependency {
                    case: case.name.clone(),
                    dependency: missing.clone(),
                });
            }
        }

        let cases = order_by_dependencies(cases)?;
        Ok(Self {
            name: name.into(),
            cases,
        })
    }

    /// Suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cases in execution order.
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Number of cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns `true` when the suite has no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Narrows the suite to `names` plus their transitive dependencies.
    ///
    /// # Errors
    /// Returns [`RunnerError::UnknownCase`] for a name not in the suite.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Suite, RunnerError> {
        let by_name: HashMap<&str, &TestCase> = self
            .cases
            .iter()
            .map(|case| (case.name.as_str(), case))
            .collect();

        let mut wanted: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let case = by_name
                .get(name)
                .ok_or_else(|| RunnerError::UnknownCase(name.to_string()))?;
            stack.push(case.name.as_str());
        }

        while let Some(name) = stack.pop() {
            if wanted.insert(name)
                && let Some(case) = by_name.get(name)
            {
                stack.extend(case.depends_on.iter().map(String::as_str));
            }
        }

        Ok(Suite {
            name: self.name.clone(),
            cases: self
                .cases
                .iter()
                .filter(|case| wanted.contains(case.name.as_str()))
                .cloned()
                .collect(),
        })
    }
}

fn order_by_dependencies(mut pending: Vec<TestCase>) -> Result<Vec<TestCase>, RunnerError> {
    let mut ordered: Vec<TestCase> = Vec::with_capacity(pending.len());
    let mut placed: HashSet<String> = HashSet::new();

    while !pending.is_empty() {
        let ready = pending.iter().position(|case| {
            case.depends_on
                .iter()
                .all(|dependency| placed.contains(dependency))
        });

        match ready {
            Some(index) => {
                let case = pending.remove(index);
                placed.insert(case.name.clone());
                ordered.push(case);
            }
            None => {
                return Err(RunnerError::DependencyCycle(
                    pending.into_iter().map(|case| case.name).collect(),
                ));
            }
        }
    }

    Ok(ordered)
}

/// Per-case state machine with explicit legal transitions.
///
/// `Pending -> Errored` is allowed for cases rejected before dispatch
/// (unmet dependency, unknown schema, unrenderable path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLifecycle {
    state: CaseState,
}

impl CaseLifecycle {
    /// Creates a lifecycle in `Pending`.
    pub fn new() -> Self {
        Self {
            state: CaseState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaseState {
        self.state
    }

    /// Applies a transition.
    ///
    /// # Errors
    /// Returns [`RunnerError::IllegalTransition`] and leaves the state
    /// unchanged when `next` is not reachable from the current state.
    pub fn transition(&mut self, next: CaseState) -> Result<(), RunnerError> {
        let legal = matches!(
            (self.state, next),
            (CaseState::Pending, CaseState::Executing)
                | (CaseState::Pending, CaseState::Errored)
                | (CaseState::Executing, CaseState::Passed)
                | (CaseState::Executing, CaseState::Failed)
                | (CaseState::Executing, CaseState::Errored)
        );

        if !legal {
            return Err(RunnerError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        Ok(())
    }
}

impl Default for CaseLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons a case ends ERRORED.
#[derive(Debug, Error)]
pub enum CaseError {
    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] HttpError),
    /// Contract references an unregistered schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Contract could not be turned into a request.
    #[error(transparent)]
    Contract(#[from] CoreError),
    /// A declared dependency did not pass earlier in the run.
    #[error("dependency `{dependency}` did not pass ({state})")]
    DependencyNotPassed {
        /// Dependency name.
        dependency: String,
        /// State the dependency ended in.
        state: CaseState,
    },
}

/// Compares a received response with its contract.
///
/// Every mismatch is returned; nothing short-circuits. Field assertions and
/// schema checks only run on JSON bodies. `EmptyText` bodies are never
/// decoded.
///
/// # Errors
/// Returns [`SchemaError::NotFound`] when the contract names an unregistered
/// schema.
pub fn evaluate(
    contract: &EndpointContract,
    response: &HttpResponse,
    registry: &SchemaRegistry,
    strict: bool,
) -> Result<Vec<Mismatch>, SchemaError> {
    let mut mismatches = Vec::new();

    if response.status_code != contract.expected_status {
        mismatches.push(Mismatch::Status {
            expected: contract.expected_status,
            actual: response.status_code,
        });
    }

    let schema = match &contract.body_expectation {
        BodyExpectation::Schema(name) => Some(registry.get(name)?),
        _ => None,
    };

    if contract.body_expectation == BodyExpectation::EmptyText && !response.raw_text.is_empty() {
        mismatches.push(Mismatch::Body {
            expected: "empty body".to_string(),
            actual: format!("{} bytes", response.raw_text.len()),
        });
    }

    let needs_json = matches!(
        contract.body_expectation,
        BodyExpectation::Schema(_) | BodyExpectation::EmptyObject
    ) || !contract.assertions.is_empty();
    if !needs_json {
        return Ok(mismatches);
    }

    match &response.body {
        ResponseBody::Json(value) => {
            if contract.body_expectation == BodyExpectation::EmptyObject
                && value.as_object().is_none_or(|map| !map.is_empty())
            {
                mismatches.push(Mismatch::Body {
                    expected: "{}".to_string(),
                    actual: preview(value),
                });
            }

            if let Some(schema) = schema {
                let mut violations = schema.violations(value);
                if strict {
                    for extra in schema.strict_violations(value) {
                        if !violations.contains(&extra) {
                            violations.push(extra);
                        }
                    }
                }
                mismatches.extend(violations.into_iter().map(Mismatch::Schema));
            }

            mismatches.extend(
                contract
                    .assertions
                    .iter()
                    .filter_map(|assertion| assertion.check(value)),
            );
        }
        ResponseBody::Empty => mismatches.push(Mismatch::Body {
            expected: "json body".to_string(),
            actual: "empty body".to_string(),
        }),
        ResponseBody::Malformed { reason } => mismatches.push(Mismatch::Malformed {
            reason: reason.clone(),
        }),
    }

    Ok(mismatches)
}

fn preview(value: &Value) -> String {
    const LIMIT: usize = 120;
    let text = value.to_string();
    if text.len() <= LIMIT {
        return text;
    }
    let cut = (0..=LIMIT)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

/// Sequential executor for suites.
#[derive(Clone)]
pub struct Runner {
    client: HttpClient,
    registry: Arc<SchemaRegistry>,
    strict: bool,
}

impl Runner {
    /// Creates a runner using structural schema validation only.
    pub fn new(client: HttpClient, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            client,
            registry,
            strict: false,
        }
    }

    /// Enables full-draft schema checks on top of structural validation.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Runs one case exactly once.
    pub fn run_case(&self, case: &TestCase) -> TestResult {
        let started = Instant::now();
        let mut lifecycle = CaseLifecycle::new();
        let contract = &case.contract;

        let prepared = contract
            .render_path()
            .map_err(CaseError::from)
            .and_then(|path| {
                if let BodyExpectation::Schema(name) = &contract.body_expectation {
                    self.registry.get(name)?;
                }
                Ok(path)
            });
        let path = match prepared {
            Ok(path) => path,
            Err(error) => {
                return self.errored(case, &mut lifecycle, error, None, started);
            }
        };

        self.advance(&mut lifecycle, CaseState::Executing);
        let options = RequestOptions {
            query: contract.query.clone(),
            body: contract.body.clone(),
            headers: contract.headers.clone(),
        };

        let response = match self.client.send(contract.method, &path, &options) {
            Ok(response) => response,
            Err(error) => {
                return self.errored(case, &mut lifecycle, error.into(), None, started);
            }
        };

        let mismatches = match evaluate(contract, &response, &self.registry, self.strict) {
            Ok(mismatches) => mismatches,
            Err(error) => {
                return self.errored(case, &mut lifecycle, error.into(), Some(response), started);
            }
        };

        let verdict = if mismatches.is_empty() {
            CaseState::Passed
        } else {
            CaseState::Failed
        };
        self.advance(&mut lifecycle, verdict);

        if verdict == CaseState::Passed {
            info!(case = %case.name, status = response.status_code, "case passed");
        } else {
            warn!(
                case = %case.name,
                status = response.status_code,
                mismatches = mismatches.len(),
                "case failed"
            );
        }

        TestResult {
            name: case.name.clone(),
            state: lifecycle.state(),
            status: Some(response.status_code),
            mismatches,
            error: None,
            raw_body: Some(response.raw_text),
            elapsed_ms: elapsed_ms(started),
        }
    }

    /// Runs every case in suite order.
    pub fn run_suite(&self, suite: &Suite) -> SuiteReport {
        self.run_suite_with(suite, |_| {})
    }

    /// Runs every case in suite order, handing each result to `on_result` as
    /// soon as it is final.
    pub fn run_suite_with(
        &self,
        suite: &Suite,
        mut on_result: impl FnMut(&TestResult),
    ) -> SuiteReport {
        let started = Instant::now();
        let mut outcomes: HashMap<String, CaseState> = HashMap::new();
        let mut results = Vec::with_capacity(suite.len());

        for case in suite.cases() {
            let unmet = case.depends_on.iter().find_map(|dependency| {
                let state = outcomes
                    .get(dependency)
                    .copied()
                    .unwrap_or(CaseState::Pending);
                (state != CaseState::Passed).then(|| (dependency.clone(), state))
            });

            let result = match unmet {
                Some((dependency, state)) => {
                    let mut lifecycle = CaseLifecycle::new();
                    self.errored(
                        case,
                        &mut lifecycle,
                        CaseError::DependencyNotPassed { dependency, state },
                        None,
                        Instant::now(),
                    )
                }
                None => self.run_case(case),
            };

            outcomes.insert(result.name.clone(), result.state);
            on_result(&result);
            results.push(result);
        }

        let report = SuiteReport {
            suite: suite.name().to_string(),
            results,
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            suite = %report.suite,
            passed = report.count(CaseState::Passed),
            failed = report.count(CaseState::Failed),
            errored = report.count(CaseState::Errored),
            "suite finished"
        );
        report
    }

    fn advance(&self, lifecycle: &mut CaseLifecycle, next: CaseState) {
        if let Err(error) = lifecycle.transition(next) {
            debug!(%error, "ignored lifecycle transition");
        }
    }

    fn errored(
        &self,
        case: &TestCase,
        lifecycle: &mut CaseLifecycle,
        error: CaseError,
        response: Option<HttpResponse>,
        started: Instant,
    ) -> TestResult {
        self.advance(lifecycle, CaseState::Errored);
        warn!(case = %case.name, %error, "case errored");

        TestResult {
            name: case.name.clone(),
            state: lifecycle.state(),
            status: response.as_ref().map(|response| response.status_code),
            mismatches: Vec::new(),
            error: Some(error.to_string()),
            raw_body: response.map(|response| response.raw_text),
            elapsed_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Results of one suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: String,
    /// Results in execution order.
    pub results: Vec<TestResult>,
    /// Wall-clock time for the whole run.
    pub elapsed_ms: u64,
}

impl SuiteReport {
    /// Number of results in `state`.
    pub fn count(&self, state: CaseState) -> usize {
        self.results
            .iter()
            .filter(|result| result.state == state)
            .count()
    }

    /// Returns `true` when every case passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    /// Process exit code: `0` when every case passed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() { 0 } else { 1 }
    }
}

/// Suite construction and lifecycle errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Two cases share a name.
    #[error("duplicate case name: {0}")]
    DuplicateCase(String),
    /// A case depends on a name that is not in the suite.
    #[error("case `{case}` depends on unknown case `{dependency}`")]
    UnknownDependency {
        /// Declaring case.
        case: String,
        /// Missing dependency.
        dependency: String,
    },
    /// Dependencies form a cycle among the listed cases.
    #[error("dependency cycle among: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
    /// Selection named a case that is not in the suite.
    #[error("unknown case: {0}")]
    UnknownCase(String),
    /// Lifecycle transition is not allowed.
    #[error("illegal case transition {from} -> {to}")]
    IllegalTransition {
        /// Current state.
        from: CaseState,
        /// Requested state.
        to: CaseState,
    },
}

#[cfg(test)]
mod tests {
    //! Unit tests for suite ordering and lifecycle transitions.

    use contract_probe_core::HttpMethod;

    use super::*;

    fn case(name: &str) -> TestCase {
        TestCase::new(name, EndpointContract::new(HttpMethod::Get, "/", 200))
    }

    fn names(suite: &Suite) -> Vec<&str> {
        suite.cases().iter().map(|case| case.name.as_str()).collect()
    }

    #[test]
    fn dependencies_move_ahead_of_dependents() {
        let suite = Suite::new(
            "s",
            vec![
                case("fetch_deleted").depends_on("delete"),
                case("list"),
                case("delete").depends_on("create"),
                case("create"),
            ],
        )
        .unwrap();
        assert_eq!(names(&suite), vec!["list", "create", "delete", "fetch_deleted"]);
    }

    #[test]
    fn rejects_cycles_duplicates_and_unknown_dependencies() {
        assert!(matches!(
            Suite::new("s", vec![case("a").depends_on("b"), case("b").depends_on("a")]),
            Err(RunnerError::DependencyCycle(_))
        ));
        assert!(matches!(
            Suite::new("s", vec![case("a"), case("a")]),
            Err(RunnerError::DuplicateCase(_))
        ));
        assert!(matches!(
            Suite::new("s", vec![case("a").depends_on("ghost")]),
            Err(RunnerError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn select_pulls_in_transitive_dependencies() {
        let suite = Suite::new(
            "s",
            vec![
                case("create"),
                case("list"),
                case("delete").depends_on("create"),
                case("fetch_deleted").depends_on("delete"),
            ],
        )
        .unwrap();
        let selected = suite.select(&["fetch_deleted"]).unwrap();
        assert_eq!(names(&selected), vec!["create", "delete", "fetch_deleted"]);
        assert!(matches!(
            suite.select(&["nope"]),
            Err(RunnerError::UnknownCase(_))
        ));
    }

    #[test]
    fn lifecycle_rejects_leaving_terminal_states() {
        let mut lifecycle = CaseLifecycle::new();
        lifecycle.transition(CaseState::Executing).unwrap();
        lifecycle.transition(CaseState::Failed).unwrap();
        assert!(lifecycle.transition(CaseState::Passed).is_err());
        assert!(lifecycle.transition(CaseState::Executing).is_err());
        assert_eq!(lifecycle.state(), CaseState::Failed);
    }

    #[test]
    fn lifecycle_cannot_pass_without_executing() {
        let mut lifecycle = CaseLifecycle::new();
        assert!(lifecycle.transition(CaseState::Passed).is_err());
        assert!(lifecycle.transition(CaseState::Errored).is_ok());
    }
}
