pub mod project;

pub use crate::domain::project::ProjectConfig;
pub use project::{
    find_main_config, load_project_config, load_project_config_with_env, scaffold_project,
};
