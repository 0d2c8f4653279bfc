//! Integration tests for single-case verdicts.

mod common;

use contract_probe_core::{CaseState, EndpointContract, HttpMethod, Mismatch, Violation};
use contract_probe_http::HttpError;
use contract_probe_runner::TestCase;
use contract_probe_schema::{POST_USER, REGISTER_USER_UNSUCCESSFUL};
use serde_json::json;

use common::{ScriptedTransport, reply, runner};

fn create_user_case() -> TestCase {
    TestCase::new(
        "create_user",
        EndpointContract::new(HttpMethod::Post, "/api/users", 201)
            .form_body([("name", "Batman"), ("job", "batman")])
            .expect_echo()
            .expect_schema(POST_USER),
    )
}

#[test]
fn case_outcome_tests_create_passes_with_echo_and_schema() {
    let transport = ScriptedTransport::new(|_| {
        reply(
            201,
            r#"{"name":"Batman","job":"batman","id":"812","createdAt":"2024-05-01T10:00:00.000Z"}"#,
        )
    });
    let result = runner(transport).run_case(&create_user_case());

    assert_eq!(result.state, CaseState::Passed, "{result:?}");
    assert_eq!(result.status, Some(201));
    assert!(result.mismatches.is_empty());
}

#[test]
fn case_outcome_tests_collects_every_mismatch() {
    let transport =
        ScriptedTransport::new(|_| reply(200, r#"{"name":"Robin","job":"batman","id":"812"}"#));
    let result = runner(transport).run_case(&create_user_case());

    assert_eq!(result.state, CaseState::Failed);
    assert!(result.mismatches.contains(&Mismatch::Status {
        expected: 201,
        actual: 200
    }));
    assert!(
        result
            .mismatches
            .contains(&Mismatch::Schema(Violation::new("/createdAt", "present", "absent")))
    );
    assert!(result.mismatches.contains(&Mismatch::Field {
        pointer: "/name".to_string(),
        expected: json!("Batman"),
        actual: Some(json!("Robin")),
    }));
    assert_eq!(result.mismatches.len(), 3);
}

#[test]
fn case_outcome_tests_strict_mode_reports_each_violation_once() {
    let missing_created_at = || {
        ScriptedTransport::new(|_| reply(201, r#"{"name":"Batman","job":"batman","id":"812"}"#))
    };
    let loose = runner(missing_created_at()).run_case(&create_user_case());
    let strict = runner(missing_created_at()).strict(true).run_case(&create_user_case());

    assert_eq!(strict.state, CaseState::Failed);
    assert_eq!(
        strict.mismatches,
        vec![Mismatch::Schema(Violation::new("/createdAt", "present", "absent"))]
    );
    assert_eq!(strict.mismatches, loose.mismatches);

    let numeric_id = ScriptedTransport::new(|_| {
        reply(
            201,
            r#"{"name":"Batman","job":"batman","id":812,"createdAt":"2024-05-01T10:00:00.000Z"}"#,
        )
    });
    let result = runner(numeric_id).strict(true).run_case(&create_user_case());
    assert_eq!(
        result.mismatches,
        vec![Mismatch::Schema(Violation::new("/id", "string", "integer"))]
    );
}

#[test]
fn case_outcome_tests_not_found_expects_empty_object_without_schema() {
    let case = TestCase::new(
        "get_single_user_not_found",
        EndpointContract::new(HttpMethod::Get, "/api/users/{id}", 404)
            .path_param("id", "99")
            .expect_empty_object(),
    );

    let passing = runner(ScriptedTransport::new(|_| reply(404, "{}"))).run_case(&case);
    assert_eq!(passing.state, CaseState::Passed);

    let failing =
        runner(ScriptedTransport::new(|_| reply(404, r#"{"error":"gone"}"#))).run_case(&case);
    assert_eq!(failing.state, CaseState::Failed);
    assert!(matches!(failing.mismatches[0], Mismatch::Body { .. }));
}

#[test]
fn case_outcome_tests_delete_requires_empty_text() {
    let case = TestCase::new(
        "delete_user",
        EndpointContract::new(HttpMethod::Delete, "/api/users/{id}", 204)
            .path_param("id", "45")
            .expect_empty_text(),
    );

    let passing = runner(ScriptedTransport::new(|_| reply(204, ""))).run_case(&case);
    assert_eq!(passing.state, CaseState::Passed);
    assert_eq!(passing.raw_body.as_deref(), Some(""));

    let failing = runner(ScriptedTransport::new(|_| reply(204, "deleted"))).run_case(&case);
    assert_eq!(failing.state, CaseState::Failed);
    assert_eq!(
        failing.mismatches,
        vec![Mismatch::Body {
            expected: "empty body".to_string(),
            actual: "7 bytes".to_string(),
        }]
    );
}

#[test]
fn case_outcome_tests_registration_error_needs_exact_string() {
    let case = TestCase::new(
        "register_user_unsuccessful",
        EndpointContract::new(HttpMethod::Post, "/api/register", 400)
            .json_body(json!({"email": "Batman@bat.man", "password": "joker_lox"}))
            .assert_eq(
                "/error",
                json!("Note: Only defined users succeed registration"),
            )
            .expect_schema(REGISTER_USER_UNSUCCESSFUL),
    );

    let exact = runner(ScriptedTransport::new(|_| {
        reply(400, r#"{"error":"Note: Only defined users succeed registration"}"#)
    }))
    .run_case(&case);
    assert_eq!(exact.state, CaseState::Passed);

    let other = runner(ScriptedTransport::new(|_| {
        reply(400, r#"{"error":"Missing password"}"#)
    }))
    .run_case(&case);
    assert_eq!(other.state, CaseState::Failed);
    assert_eq!(other.mismatches.len(), 1);
}

#[test]
fn case_outcome_tests_malformed_body_fails_instead_of_erroring() {
    let transport = ScriptedTransport::new(|_| reply(201, "<html>busy</html>"));
    let result = runner(transport).run_case(&create_user_case());

    assert_eq!(result.state, CaseState::Failed);
    assert!(matches!(result.mismatches[0], Mismatch::Malformed { .. }));
}

#[test]
fn case_outcome_tests_transport_failure_errors_case() {
    let transport = ScriptedTransport::new(|_| {
        Err(HttpError::Connect("reqres.test: connection refused".to_string()))
    });
    let result = runner(transport).run_case(&create_user_case());

    assert_eq!(result.state, CaseState::Errored);
    assert_eq!(result.status, None);
    assert!(
        result
            .error
            .as_deref()
            .is_some_and(|error| error.contains("connection refused"))
    );
}

#[test]
fn case_outcome_tests_unknown_schema_errors_before_dispatch() {
    let transport = ScriptedTransport::new(|_| reply(200, "{}"));
    let case = TestCase::new(
        "typo",
        EndpointContract::new(HttpMethod::Get, "/api/users", 200).expect_schema("get_all_user"),
    );
    let result = runner(transport.clone()).run_case(&case);

    assert_eq!(result.state, CaseState::Errored);
    assert!(transport.calls().is_empty());
    assert_eq!(result.error.as_deref(), Some("schema not found: get_all_user"));
}
