// pipeguard-core/src/infrastructure/config/project.rs

use serde::{Deserialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::alerting::{AlertThresholds, QualityThresholds};
use crate::domain::project::ProjectConfig;
use crate::domain::quality::QualityGateConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

pub const PROJECT_FILE_CANDIDATES: [&str; 2] = ["pipeguard.yaml", "pipeguard_project.yaml"];

pub const ENV_TARGET_PATH: &str = "PIPEGUARD_TARGET_PATH";
pub const ENV_ENVIRONMENT: &str = "PIPEGUARD_ENVIRONMENT";
pub const ENV_WEBHOOK_URL: &str = "PIPEGUARD_WEBHOOK_URL";

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    load_project_config_with_env(project_dir, |key| std::env::var(key).ok())
}

/// Same as [`load_project_config`], reading overrides through `env` instead of
/// the process environment.
pub fn load_project_config_with_env<F>(
    project_dir: &Path,
    env: F,
) -> Result<ProjectConfig, InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Découverte du fichier principal
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    // 2. Chargement YAML Base
    let mut config: ProjectConfig = load_fragment(&config_path)?;

    // 3. Hydratation des Satellites (Fail-Secure)
    for folder in config.config_paths.clone() {
        let config_dir = project_dir.join(folder);
        if config_dir.is_dir() {
            load_satellite_configs(&mut config, &config_dir)?;
        }
    }

    // 4. Override via Variables d'Environnement (Pattern 'Layering')
    // PIPEGUARD_TARGET_PATH=/tmp/build pipeguard check
    apply_env_overrides(&mut config, env);

    config.validate()?;
    Ok(config)
}

pub fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in PROJECT_FILE_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, PROJECT_FILE_CANDIDATES
    )))
}

// --- LOGIQUE GÉNÉRIQUE ---

/// Charge un fragment de configuration typé depuis un fichier.
fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path).map_err(|source| InfrastructureError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| InfrastructureError::YamlError {
        path: path.display().to_string(),
        source,
    })
}

fn load_satellite_configs(
    config: &mut ProjectConfig,
    config_dir: &Path,
) -> Result<(), InfrastructureError> {
    // A. Quality contracts, one entry per table
    let qual_path = config_dir.join("quality.yml");
    if qual_path.exists() {
        #[derive(Deserialize)]
        struct QualityWrapper {
            #[serde(default)]
            tables: Vec<QualityGateConfig>,
        }

        let wrapper: QualityWrapper = load_fragment(&qual_path)?;
        let count = wrapper.tables.len();
        for table in wrapper.tables {
            config.upsert_table(table);
        }
        info!(tables = count, "  ✅ Quality contracts loaded");
    }

    // B. Alert thresholds and channel
    let alerts_path = config_dir.join("alerts.yml");
    if alerts_path.exists() {
        #[derive(Deserialize)]
        struct AlertsWrapper {
            thresholds: Option<AlertThresholds>,
            quality: Option<QualityThresholds>,
            #[serde(rename = "webhook-url")]
            webhook_url: Option<String>,
            #[serde(rename = "timeout-secs")]
            timeout_secs: Option<u64>,
        }

        let wrapper: AlertsWrapper = load_fragment(&alerts_path)?;
        let alerts = &mut config.alerts;
        if let Some(thresholds) = wrapper.thresholds {
            alerts.thresholds = thresholds;
        }
        if let Some(quality) = wrapper.quality {
            alerts.quality = quality;
        }
        if wrapper.webhook_url.is_some() {
            alerts.webhook_url = wrapper.webhook_url;
        }
        if let Some(secs) = wrapper.timeout_secs {
            alerts.timeout_secs = secs;
        }
        info!("  🚨 Alert settings loaded");
    }

    Ok(())
}

fn apply_env_overrides<F>(config: &mut ProjectConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env(ENV_TARGET_PATH) {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
    if let Some(val) = env(ENV_ENVIRONMENT) {
        info!(old = ?config.environment, new = ?val, "Overriding environment via ENV");
        config.environment = val;
    }
    if let Some(val) = env(ENV_WEBHOOK_URL) {
        info!("Overriding webhook URL via ENV");
        config.alerts.webhook_url = Some(val);
    }
}

// --- SCAFFOLDING ---

/// Writes a starter `pipeguard.yaml` holding the insurance policies contract.
/// An existing project file is kept unless `force` is set.
pub fn scaffold_project(project_dir: &Path, force: bool) -> Result<PathBuf, InfrastructureError> {
    let path = project_dir.join(PROJECT_FILE_CANDIDATES[0]);
    if path.exists() && !force {
        return Err(InfrastructureError::ConfigError(format!(
            "{:?} already exists (use --force to overwrite)",
            path
        )));
    }

    let name = project_dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "pipeguard_project".to_string());

    let mut config = ProjectConfig::new(name);
    let mut policies = QualityGateConfig::insurance_policies();
    policies.source = Some("data/policies.csv".to_string());
    policies.dedupe_key = Some("policy_id".to_string());
    config.tables.push(policies);

    let yaml = serde_yaml::to_string(&config).map_err(|source| InfrastructureError::YamlError {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write(&path, yaml)?;
    info!(path = ?path, "Project scaffolded");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_project_file() {
        let dir = tempdir().unwrap();
        let err = load_project_config_with_env(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigNotFound(_)));
    }

    #[test]
    fn test_satellites_are_layered() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "pipeguard.yaml",
            r#"
name: claims_warehouse
tables:
  - table: claims
    unique_keys: [claim_id]
"#,
        );
        write(
            dir.path(),
            "config/quality.yml",
            r#"
tables:
  - table: claims
    schema: [claim_id, amount]
    unique_keys: [claim_id]
  - table: policies
    source: data/policies.csv
"#,
        );
        write(
            dir.path(),
            "config/alerts.yml",
            r#"
thresholds:
  max_memory_usage_mb: 2048
timeout-secs: 3
"#,
        );

        let config = load_project_config_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.tables.len(), 2);
        assert_eq!(config.table("claims").unwrap().schema, vec!["claim_id", "amount"]);
        assert_eq!(
            config.table("policies").unwrap().source.as_deref(),
            Some("data/policies.csv")
        );
        assert_eq!(config.alerts.thresholds.max_memory_usage_mb, 2048.0);
        assert_eq!(config.alerts.timeout_secs, 3);
    }

    #[test]
    fn test_env_overrides_win() {
        let dir = tempdir().unwrap();
        write(dir.path(), "pipeguard_project.yaml", "name: p\nenvironment: dev\n");

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_TARGET_PATH, "/tmp/out"),
            (ENV_ENVIRONMENT, "production"),
            (ENV_WEBHOOK_URL, "https://hooks.example.com/x"),
        ]);
        let config =
            load_project_config_with_env(dir.path(), |k| env.get(k).map(|v| v.to_string()))
                .unwrap();

        assert_eq!(config.target_path, "/tmp/out");
        assert_eq!(config.environment, "production");
        assert_eq!(
            config.alerts.webhook_url.as_deref(),
            Some("https://hooks.example.com/x")
        );
    }

    #[test]
    fn test_broken_satellite_stops_loading() {
        let dir = tempdir().unwrap();
        write(dir.path(), "pipeguard.yaml", "name: p\n");
        write(dir.path(), "config/quality.yml", "tables: [this is: not valid");

        let err = load_project_config_with_env(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::YamlError { .. }));
    }

    #[test]
    fn test_scaffold_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        scaffold_project(dir.path(), false).unwrap();

        let config = load_project_config_with_env(dir.path(), no_env).unwrap();
        let policies = config.table("policies").unwrap();
        assert_eq!(policies.source.as_deref(), Some("data/policies.csv"));
        assert_eq!(policies.rules.len(), 13);
        assert!(policies.build().is_ok());

        assert!(scaffold_project(dir.path(), false).is_err());
        assert!(scaffold_project(dir.path(), true).is_ok());
    }

    #[test]
    fn test_invalid_thresholds_are_rejected() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "pipeguard.yaml",
            "name: p\nalerts:\n  thresholds:\n    max_error_rate: 3.0\n",
        );
        let err = load_project_config_with_env(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::Validation(_)));
    }
}
