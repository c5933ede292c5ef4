use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SECRET: &str = "fixture-secret";
const COUNTER_CHECKSUM: &str = "8e682f1777f971ad6880b043c8207de478809e3916830207a9a546593e244a3e";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn checksum_prints_algorithm_and_hex() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .args(["checksum", "--secret", SECRET, path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(format!("sha256 {COUNTER_CHECKSUM}\n"));
}

#[test]
fn checksum_reads_secret_from_environment() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .env("COMPREQ_SECRET", SECRET)
        .args(["checksum", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(COUNTER_CHECKSUM));
}

#[test]
fn checksum_without_secret_fails() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .env_remove("COMPREQ_SECRET")
        .args(["checksum", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no secret given"));
}

#[test]
fn blake3_checksum_differs() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .args([
            "checksum",
            "--secret",
            SECRET,
            "--digest",
            "blake3",
            path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("blake3 "))
        .stdout(predicate::str::contains(COUNTER_CHECKSUM).not());
}

#[test]
fn decode_prints_classified_queue() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .args([
            "decode",
            "--component",
            "counter",
            "--secret",
            SECRET,
            path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            "component=counter id=c1 epoch=1700000000 key=row-1 actions=4\n\
             action=0 kind=sync_input type=syncInput\n\
             action=1 kind=call_method method=increment args=1 kwargs=1\n\
             action=2 kind=toggle method=$toggle args=1 kwargs=0\n\
             action=3 kind=generic type=unknownThing\n",
        );
}

#[test]
fn decode_rejects_tampered_data() {
    let path = fixture_path("tampered.json");
    cargo_bin_cmd!("compreq")
        .args(["decode", "--secret", SECRET, path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_CHECKSUM_MISMATCH"))
        .stderr(predicate::str::contains("Checksum does not match"));
}

#[test]
fn decode_rejects_wrong_secret() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .args(["decode", "--secret", "nope", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_CHECKSUM_MISMATCH"));
}

#[test]
fn decode_reports_missing_id_as_validation_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("body.json");
    fs::write(&path, r#"{"data": {"count": 1}}"#).unwrap();

    cargo_bin_cmd!("compreq")
        .args(["decode", "--secret", SECRET, path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_VALIDATION: Missing component id"));
}

#[test]
fn decode_enforces_body_limit() {
    let path = fixture_path("counter.json");
    cargo_bin_cmd!("compreq")
        .args([
            "decode",
            "--secret",
            SECRET,
            "--max-body-bytes",
            "16",
            path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_BODY_PARSE"));
}

#[test]
fn checksum_requires_data_member() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("body.json");
    fs::write(&path, r#"{"id": "c1"}"#).unwrap();

    cargo_bin_cmd!("compreq")
        .args(["checksum", "--secret", SECRET, path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data member"));
}
