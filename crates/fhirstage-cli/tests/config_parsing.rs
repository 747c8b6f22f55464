use std::{env, fs};

use fhirstage_cli::config::loader::load_config;
use fhirstage_core::ObservationKey;
use fhirstage_ingest::RecordPolicy;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("fhirstage.toml");

    let toml_content = r#"
[upstream]
base_url = "https://fhir.example.org/R4"
username = "etl"
password = "s3cret"
request_timeout_ms = 10000

[postgres]
host = "db.internal"
port = 5433
user = "loader"
password = "pw"
database = "dw"
pool_size = 3

[ingest]
page_size = 500
record_policy = "fail_fast"
observation_key = "patient_encounter_concept"
checkpoint = true

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.upstream.base_url, "https://fhir.example.org/R4");
    assert_eq!(cfg.ingest.page_size, 500);
    assert_eq!(cfg.ingest.record_policy, RecordPolicy::FailFast);
    assert_eq!(
        cfg.ingest.observation_key,
        ObservationKey::PatientEncounterConcept
    );
    assert!(cfg.ingest.checkpoint);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(
        cfg.postgres.connection_url(),
        "postgres://loader:pw@db.internal:5433/dw"
    );

    // 2) Env override should win over file
    unsafe {
        env::set_var("FHIRSTAGE__INGEST__PAGE_SIZE", "75");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.ingest.page_size, 75);
    unsafe {
        env::remove_var("FHIRSTAGE__INGEST__PAGE_SIZE");
    }

    // 3) Invalid config should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[upstream]
base_url = "https://fhir.example.org/R4"

[ingest]
page_size = 20000
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("ingest.page_size must be <="));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");
    let err = load_config(path.to_str()).expect_err("expected missing file error");
    assert!(err.contains("does not exist"));
}

#[test]
fn minimal_config_uses_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("fhirstage.toml");
    fs::write(
        &path,
        "[upstream]\nbase_url = \"http://localhost:8080/fhir\"\n",
    )
    .expect("write toml");

    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.postgres.pool_size, 2);
    assert_eq!(cfg.upstream.request_timeout_ms, 30_000);
    assert_eq!(cfg.ingest.record_policy, RecordPolicy::DropAndCount);
    assert!(cfg.upstream.auth().is_none());
}
