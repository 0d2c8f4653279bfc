//! End-to-end runs of the bundled suite against an in-memory users API.

mod common;

use contract_probe_app::{render_report_json, render_summary, reqres_suite};
use contract_probe_core::{CaseState, Mismatch};
use serde_json::Value;

use common::{FakeUsersApi, runner_for};

#[test]
fn reqres_end_to_end_tests_faithful_service_passes_every_case() {
    let api = FakeUsersApi::faithful();
    let suite = reqres_suite().expect("bundled suite should be valid");
    let report = runner_for(api.clone()).run_suite(&suite);

    for result in &report.results {
        assert_eq!(result.state, CaseState::Passed, "{result:?}");
    }
    assert_eq!(report.exit_code(), 0);
    assert_eq!(api.requests().len(), 10);
    assert!(render_summary(&report).starts_with("reqres-users: 10 passed, 0 failed, 0 errored"));
}

#[test]
fn reqres_end_to_end_tests_changed_rejection_text_fails_only_that_case() {
    let api = FakeUsersApi::rejecting_with("Missing password");
    let suite = reqres_suite().expect("bundled suite should be valid");
    let report = runner_for(api).run_suite(&suite);

    let failed: Vec<&str> = report
        .results
        .iter()
        .filter(|result| result.state == CaseState::Failed)
        .map(|result| result.name.as_str())
        .collect();
    assert_eq!(failed, vec!["register_user_unsuccessful"]);
    assert_eq!(report.exit_code(), 1);

    let failure = report
        .results
        .iter()
        .find(|result| result.name == "register_user_unsuccessful")
        .expect("case should be reported");
    assert!(matches!(
        &failure.mismatches[..],
        [Mismatch::Field { pointer, .. }] if pointer == "/error"
    ));
}

#[test]
fn reqres_end_to_end_tests_json_report_is_machine_readable() {
    let suite = reqres_suite().expect("bundled suite should be valid");
    let report = runner_for(FakeUsersApi::faithful()).run_suite(&suite);

    let rendered = render_report_json(&report).expect("report should serialize");
    let parsed: Value = serde_json::from_str(&rendered).expect("report should be valid json");
    assert_eq!(parsed["suite"], "reqres-users");
    assert_eq!(parsed["results"].as_array().map(Vec::len), Some(10));
    assert_eq!(parsed["results"][0]["state"], "PASSED");
}
