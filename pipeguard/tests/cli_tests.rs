use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Abstraction for managing the PipeGuard test environment.
struct PipeguardTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl PipeguardTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/insurance_project");

        let dest = tmp.path().join("insurance_project");
        Self::copy_dir(&fixture, &dest)?;

        Ok(Self {
            _tmp: tmp,
            root: dest,
        })
    }

    fn empty() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("fresh_project");
        fs::create_dir_all(&root)?;
        Ok(Self { _tmp: tmp, root })
    }

    fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.skip_exist = true;
        options.content_only = true;

        fs::create_dir_all(dst)?;
        fs_extra::dir::copy(src, dst, &options)
            .map(|_| ())
            .map_err(|e| std::io::Error::other(e.to_string()))
    }

    fn pipeguard(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pipeguard"));
        cmd.current_dir(&self.root)
            .env_remove("RUST_LOG")
            .env_remove("PIPEGUARD_TARGET_PATH")
            .env_remove("PIPEGUARD_ENVIRONMENT")
            .env_remove("PIPEGUARD_WEBHOOK_URL")
            .env_remove("PIPEGUARD_LOG_FORMAT");
        cmd
    }

    fn write(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn read_json(&self, rel: &str) -> Result<serde_json::Value> {
        let content = fs::read_to_string(self.root.join(rel))
            .with_context(|| format!("{} not written", rel))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[test]
fn test_check_passes_on_clean_extract() -> Result<()> {
    let env = PipeguardTestEnv::new()?;

    let output = env.pipeguard().arg("check").output()?;
    assert!(output.status.success(), "check failed: {:?}", output);

    let stdout = String::from_utf8(output.stdout)?;
    let summary = stdout
        .lines()
        .find(|l| l.contains("verdict="))
        .context("no summary line")?
        .trim_start_matches(|c: char| !c.is_ascii_alphabetic());
    insta::assert_snapshot!(summary, @"policies: 5 records, 0 violations, verdict=pass");

    let report = env.read_json("target/quality/policies.json")?;
    assert_eq!(report["verdict"], "pass");
    assert_eq!(report["total_records"], 5);
    for column in report["columns"].as_array().context("columns")? {
        assert_eq!(column["completeness"], 1.0);
    }

    let results = env.read_json("target/run_results.json")?;
    assert_eq!(results["success"], true);
    assert_eq!(results["tables"][0]["table"], "policies");
    Ok(())
}

#[test]
fn test_check_fails_on_out_of_range_premium() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    let csv = fs::read_to_string(env.root.join("data/policies.csv"))?;
    env.write("data/policies.csv", &csv.replace("1500.00", "-500"))?;

    env.pipeguard()
        .args(["check", "--run-id", "nightly"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("verdict=fail"))
        .stdout(predicate::str::contains("mandatory rule 'premium_range' has 1 violation(s)"))
        .stdout(predicate::str::contains("High error rate: 20.00%"));

    let report = env.read_json("target/quality/policies.json")?;
    let premium = report["rules"]
        .as_array()
        .context("rules")?
        .iter()
        .find(|r| r["rule"] == "premium_range")
        .context("premium_range result")?;
    assert_eq!(premium["violation_count"], 1);
    assert_eq!(premium["violations"][0]["row"], 1);

    let results = env.read_json("target/run_results.json")?;
    assert_eq!(results["success"], false);
    assert_eq!(results["tables"][0]["run_id"], "nightly-policies");
    Ok(())
}

#[test]
fn test_error_rate_counts_rejected_records() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    let csv = fs::read_to_string(env.root.join("data/policies.csv"))?;
    // one record breaking two mandatory rules
    env.write(
        "data/policies.csv",
        &csv.replace("1500.00,2024-02-01,2025-01-31,HOME", "-500,2024-02-01,2025-01-31,UNKNOWN"),
    )?;

    env.pipeguard()
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("policies: 5 records, 2 violations, verdict=fail"))
        .stdout(predicate::str::contains("High error rate: 20.00%"));
    Ok(())
}

#[test]
fn test_check_unknown_table() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    env.pipeguard()
        .args(["check", "--table", "claims"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Table 'claims' is not configured"));
    Ok(())
}

#[test]
fn test_target_path_env_override() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    env.pipeguard()
        .arg("check")
        .env("PIPEGUARD_TARGET_PATH", "build")
        .assert()
        .success();

    assert!(env.root.join("build/run_results.json").exists());
    assert!(!env.root.join("target").exists());
    Ok(())
}

#[test]
fn test_alerts_from_metrics_snapshot() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    let metrics = env.write(
        "runs/claims.json",
        r#"{
  "pipeline_name": "claims_ingestion",
  "run_id": "run-001",
  "start_time": "2024-01-15T02:00:00Z",
  "end_time": "2024-01-15T03:01:40Z",
  "status": "completed",
  "records_processed": 1000,
  "errors_count": 60,
  "duration_seconds": 3700.0
}"#,
    )?;

    env.pipeguard()
        .arg("alerts")
        .arg("--metrics")
        .arg(&metrics)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WARNING [duration]: Pipeline claims_ingestion has been running for 61.7 minutes",
        ))
        .stdout(predicate::str::contains(
            "CRITICAL [error_rate]: High error rate: 6.00% in pipeline claims_ingestion",
        ));
    Ok(())
}

#[test]
fn test_health_exit_codes() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    let probes = env.write(
        "probes.json",
        r#"[
  {"service": "object_store", "status": "healthy", "response_time_ms": 42.0, "message": "reachable"},
  {"service": "data_freshness", "hours_old": 30}
]"#,
    )?;

    env.pipeguard()
        .arg("health")
        .arg("--results")
        .arg(&probes)
        .args(["--environment", "staging"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Overall Status: DEGRADED"))
        .stdout(predicate::str::contains("Data is 30.0 hours old (stale)"));

    let healthy = env.write(
        "healthy.json",
        r#"[{"service": "secrets", "status": "healthy"}]"#,
    )?;
    env.pipeguard()
        .arg("health")
        .arg("--results")
        .arg(&healthy)
        .args(["--format", "json", "--output-file", "health.json"])
        .assert()
        .success();
    let report = env.read_json("health.json")?;
    assert_eq!(report["overall_status"], "healthy");
    assert_eq!(report["total_checks"], 1);
    Ok(())
}

#[test]
fn test_init_scaffolds_project() -> Result<()> {
    let env = PipeguardTestEnv::empty()?;

    env.pipeguard().arg("init").assert().success();
    assert!(env.root.join("pipeguard.yaml").exists());
    assert!(env.root.join("data").is_dir());

    env.pipeguard().arg("init").assert().failure();
    env.pipeguard().args(["init", "--force"]).assert().success();
    Ok(())
}

#[test]
fn test_clean_removes_artifacts() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    env.pipeguard().arg("check").assert().success();
    assert!(env.root.join("target").exists());

    env.pipeguard()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Artifact removed: target"));
    assert!(!env.root.join("target").exists());
    Ok(())
}

#[test]
fn test_clean_follows_target_path_override() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    env.pipeguard()
        .arg("check")
        .env("PIPEGUARD_TARGET_PATH", "build")
        .assert()
        .success();
    assert!(env.root.join("build/run_results.json").exists());

    env.pipeguard()
        .arg("clean")
        .env("PIPEGUARD_TARGET_PATH", "build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Artifact removed: build"));
    assert!(!env.root.join("build").exists());
    Ok(())
}

#[test]
fn test_json_logs_on_stderr() -> Result<()> {
    let env = PipeguardTestEnv::new()?;
    env.pipeguard()
        .args(["--log-format", "json", "check"])
        .env("RUST_LOG", "pipeguard=info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Checking table"))
        .stderr(predicate::str::contains("\"run_id\""));
    Ok(())
}
