#![warn(missing_docs)]
//! # contract-probe-contract-tests
//!
//! Fixture loading helpers for the frozen contracts under `contracts/`.
//! The checks themselves live in `tests/`.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Root `contracts/` directory of the workspace.
pub fn contracts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../contracts")
}

/// Path of the frozen schema named `name`.
pub fn schema_path(name: &str) -> PathBuf {
    contracts_dir()
        .join("schemas")
        .join(format!("{name}.schema.json"))
}

/// Path of fixture `<name>.<variant>.json`.
pub fn fixture_path(name: &str, variant: &str) -> PathBuf {
    contracts_dir()
        .join("fixtures")
        .join(format!("{name}.{variant}.json"))
}

/// Reads and decodes a JSON file.
///
/// # Errors
/// Returns a message naming the path when the file is unreadable or not JSON.
pub fn load_json(path: &Path) -> Result<Value, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("{} unreadable: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("{} is not json: {err}", path.display()))
}
