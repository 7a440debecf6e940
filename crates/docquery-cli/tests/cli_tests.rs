//! Integration tests for the docquery binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command isolated from the user's config, cache and API keys
fn docquery_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docquery").unwrap();
    cmd.env("DOCQUERY_DB", dir.path().join("cache.sqlite"))
        .env("DOCQUERY_CONFIG", dir.path().join("config.yml"))
        .env_remove("DOCQUERY_LLM_API_KEY")
        .env_remove("GROQ_API_KEY")
        .env_remove("DOCQUERY_MODEL_TIERS")
        .env_remove("DOCQUERY_CACHE_TTL_SECS")
        .env_remove("RUST_LOG");
    cmd
}

/// Point the invoker at a closed port with a minimal retry budget
fn unreachable_service(cmd: &mut Command) -> &mut Command {
    cmd.env("DOCQUERY_LLM_URL", "http://127.0.0.1:1")
        .env("DOCQUERY_RETRY_ATTEMPTS", "1")
        .env("DOCQUERY_BASE_BACKOFF_MS", "1")
}

fn write_contract(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("contract.txt");
    fs::write(
        &path,
        "EMPLOYMENT AGREEMENT\n\nThe employee may terminate with 30 days written notice.",
    )
    .unwrap();
    path
}

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().unwrap();

    docquery_cmd(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("model_tiers"))
        .stdout(predicate::str::contains("llama-3.3-70b-versatile"))
        .stdout(predicate::str::contains("api_key").not());
}

#[test]
fn test_config_reads_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.yml"),
        "engine:\n  model_tiers: [house-model]\n  max_chunk_chars: 1200\n",
    )
    .unwrap();

    docquery_cmd(&dir)
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("house-model"))
        .stdout(predicate::str::contains("1200"));
}

#[test]
fn test_invalid_env_override_is_rejected() {
    let dir = TempDir::new().unwrap();

    docquery_cmd(&dir)
        .env("DOCQUERY_RETRY_ATTEMPTS", "0")
        .arg("config")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("retry_attempts_per_tier"));
}

#[test]
fn test_cache_stats_empty() {
    let dir = TempDir::new().unwrap();

    docquery_cmd(&dir)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:         0"));

    docquery_cmd(&dir)
        .args(["cache", "stats", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_entries\": 0"));
}

#[test]
fn test_cache_evict_and_clear() {
    let dir = TempDir::new().unwrap();

    docquery_cmd(&dir)
        .args(["cache", "evict", "--older-than-secs", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Evicted 0 cache entries"));

    docquery_cmd(&dir)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 0 cache entries"));
}

#[test]
fn test_analyze_unavailable_service_prints_placeholder() {
    let dir = TempDir::new().unwrap();
    let contract = write_contract(&dir);

    let mut cmd = docquery_cmd(&dir);
    unreachable_service(&mut cmd)
        .arg("analyze")
        .arg(&contract)
        .assert()
        .code(4)
        .stdout(predicate::str::contains("No answer is available right now"))
        .stderr(predicate::str::contains("All model tiers exhausted"));

    // Failures are never cached
    docquery_cmd(&dir)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:         0"));
}

#[test]
fn test_ask_unavailable_service_json() {
    let dir = TempDir::new().unwrap();
    let contract = write_contract(&dir);

    let mut cmd = docquery_cmd(&dir);
    unreachable_service(&mut cmd)
        .args(["ask", "--format", "json"])
        .arg(&contract)
        .args(["What", "is", "the", "notice", "period?"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("\"kind\": \"fallback_placeholder\""))
        .stdout(predicate::str::contains("\"error\""));
}

#[test]
fn test_analyze_missing_file() {
    let dir = TempDir::new().unwrap();

    docquery_cmd(&dir)
        .args(["analyze", "does-not-exist.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_ask_requires_question() {
    let dir = TempDir::new().unwrap();
    let contract = write_contract(&dir);

    docquery_cmd(&dir)
        .arg("ask")
        .arg(&contract)
        .assert()
        .failure();
}

#[test]
fn test_verbose_keeps_cli_warnings() {
    let dir = TempDir::new().unwrap();
    let contract = write_contract(&dir);
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let mut cmd = docquery_cmd(&dir);
    unreachable_service(&mut cmd)
        .env("DOCQUERY_DB", blocker.join("cache.sqlite"))
        .args(["--verbose", "analyze"])
        .arg(&contract)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Cannot open cache"));
}
