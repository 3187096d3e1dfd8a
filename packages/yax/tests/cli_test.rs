//! Tests for the `yax` binary.

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_element_format_prints_positions() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(fixture_path("plant_catalog.xml"))
        .args(["--tag", "PLANT", "--child", "PRICE"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::is_match(r"^(\d+:\d+ <PLANT>\n){4}$").unwrap());
}

#[test]
fn test_string_format_with_text_pattern() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(fixture_path("plant_catalog.xml"))
        .args(["--tag", "COMMON", "--text", "/.*a.*/", "--format", "string"]);

    cmd.assert().success().stdout(
        predicate::str::contains("<COMMON>Marsh Marigold</COMMON>")
            .and(predicate::str::contains("<COMMON>Hepatica</COMMON>"))
            .and(predicate::str::contains("Bloodroot").not())
            .and(predicate::str::contains("Columbine").not()),
    );
}

#[test]
fn test_prefixed_json_from_stdin() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.args(["-t", "lineup", "-a", r"participantFK=/\d+/", "-k", "participant"])
        .args(["-f", "prefixed"])
        .pipe_stdin(fixture_path("lineups.xml"))
        .unwrap();

    cmd.assert().success().stdout(
        predicate::str::contains(r#""-participantFK":"100612""#)
            .and(predicate::str::contains(r#""-name":"Brett Lebda""#))
            .and(predicate::str::contains("coach").not()),
    );
}

#[test]
fn test_dict_yaml_output() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(fixture_path("plant_catalog.xml"))
        .args(["--tag", "ZONE", "--text", "3", "--format", "dict", "--emit", "yaml"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("---\n").and(predicate::str::contains("tag: ZONE")));
}

#[test]
fn test_stats_on_stderr() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(fixture_path("plant_catalog.xml"))
        .args(["--tag", "nothing", "--stats", "--chunk-size", "16"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("matched=0").and(predicate::str::contains("peak_alive=3")));
}

#[test]
fn test_malformed_input_fails() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "<a><b></a>").unwrap();

    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(file.path()).args(["--tag", "b"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error: XML parsing failed"));
}

#[test]
fn test_invalid_pattern_fails() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg(fixture_path("plant_catalog.xml"))
        .args(["--tag", "/(/"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pattern"));
}

#[test]
fn test_missing_file_fails() {
    let mut cmd = cargo_bin_cmd!("yax");
    cmd.arg("/nonexistent/catalog.xml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}
