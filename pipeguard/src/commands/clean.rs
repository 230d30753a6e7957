// pipeguard/src/commands/clean.rs
//
// USE CASE: Clean build artifacts.

use std::path::PathBuf;

use pipeguard_core::application::clean_project;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    match clean_project(&project_dir) {
        Ok(removed) => {
            for path in &removed {
                println!("   🗑️  Artifact removed: {}", path);
            }
            println!("✨ Clean complete.");
        }
        Err(e) => {
            eprintln!("❌ Clean failed: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}
