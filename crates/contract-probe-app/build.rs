//! Stamps the binary with the workspace `VERSION` file.

use std::path::Path;

fn main() {
    let version_file = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = std::fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = contents.trim();

    let numeric_parts = version
        .split('.')
        .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        .count();
    assert!(
        numeric_parts == 3 && version.split('.').count() == 3,
        "VERSION must be MAJOR.MINOR.PATCH, found {version:?}"
    );

    println!("cargo:rustc-env=CONTRACT_PROBE_VERSION={version}");
}
