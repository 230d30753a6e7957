// pipeguard-core/src/application/clean.rs

use crate::error::PipeguardError;
use crate::infrastructure::config::load_project_config;
use std::fs;
use std::path::{Component, Path};

/// Removes the configured build artifacts. Returns the removed paths, relative
/// to the project.
pub fn clean_project(project_dir: &Path) -> Result<Vec<String>, PipeguardError> {
    tracing::info!("🧹 Initializing PipeGuard cleanup sequence...");

    let config = load_project_config(project_dir)?;

    // The target path may come from an override the listed targets don't know about.
    let mut targets = config.clean_targets;
    if !targets.contains(&config.target_path) {
        targets.push(config.target_path);
    }

    let mut removed = Vec::new();
    for target_rel_path in targets {
        // Zero-Trust Path Traversal Guard
        let rel = Path::new(&target_rel_path);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(PipeguardError::UnsafePath(target_rel_path));
        }

        let full_path = project_dir.join(rel);
        if full_path.exists() {
            if full_path.is_dir() {
                fs::remove_dir_all(&full_path)?;
            } else {
                fs::remove_file(&full_path)?;
            }
            tracing::info!(path = %target_rel_path, "Artifact removed");
            removed.push(target_rel_path);
        }
    }

    Ok(removed)
}
