// pipeguard/src/commands/init.rs
//
// USE CASE: Scaffold a new project.

use std::path::PathBuf;

use anyhow::Context;
use pipeguard_core::infrastructure::config::scaffold_project;

pub fn execute(project_dir: PathBuf, force: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(project_dir.join("data"))
        .with_context(|| format!("Failed to create data directory in {:?}", project_dir))?;

    let path = scaffold_project(&project_dir, force)
        .with_context(|| format!("Failed to scaffold project in {:?}", project_dir))?;

    println!("🌱 Project file written: {}", path.display());
    println!("   Drop your extract at data/policies.csv, then run `pipeguard check`.");
    Ok(())
}
