#![warn(missing_docs)]
//! # contract-probe binary
//!
//! Runs the bundled users-API contract suite against a configured base URL.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use contract_probe_app::{
    AppError, ConfigInputs, DEFAULT_BASE_URL, app_version, build_run_config, render_case,
    render_case_list, render_report_json, render_summary, reqres_suite, select_cases,
};
use contract_probe_http::HttpClient;
use contract_probe_runner::Runner;
use contract_probe_schema::bundled_registry;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// contract-probe - HTTP contract tests for the users API
#[derive(Parser, Debug)]
#[command(name = "contract-probe")]
#[command(version = app_version(), about, long_about = None)]
struct Cli {
    /// Base URL of the service under test
    #[arg(long, env = "CONTRACT_PROBE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// API key sent as the `x-api-key` header
    #[arg(long, env = "CONTRACT_PROBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extra default header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "CONTRACT_PROBE_TIMEOUT_SECS", default_value_t = contract_probe_core::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Run only this case and its dependencies (repeatable)
    #[arg(long = "case", value_name = "NAME")]
    cases: Vec<String>,

    /// List cases in execution order and exit
    #[arg(long)]
    list: bool,

    /// Also apply full JSON Schema validation
    #[arg(long)]
    strict: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            error!(%error, "run aborted");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<u8, AppError> {
    let suite = select_cases(reqres_suite()?, &cli.cases)?;
    if cli.list {
        print!("{}", render_case_list(&suite));
        return Ok(0);
    }

    let config = Arc::new(build_run_config(&ConfigInputs {
        base_url: cli.base_url.clone(),
        api_key: cli.api_key.clone(),
        headers: cli.headers.clone(),
        timeout_secs: cli.timeout_secs,
    })?);
    info!(
        base_url = %config.base_url(),
        cases = suite.len(),
        strict = cli.strict,
        "starting run"
    );

    let registry = Arc::new(bundled_registry()?);
    let runner = Runner::new(HttpClient::with_ureq(config), registry).strict(cli.strict);

    let report = match cli.format {
        Format::Human => {
            let report = runner.run_suite_with(&suite, |result| print!("{}", render_case(result)));
            print!("{}", render_summary(&report));
            report
        }
        Format::Json => {
            let report = runner.run_suite(&suite);
            println!("{}", render_report_json(&report)?);
            report
        }
    };

    Ok(report.exit_code() as u8)
}
