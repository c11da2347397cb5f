//! File download configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project files served to remote agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Base directory; every served file must resolve under it
    #[serde(default = "default_projects_path")]
    pub projects_path: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        FilesConfig {
            projects_path: default_projects_path(),
        }
    }
}

fn default_projects_path() -> PathBuf {
    expand_home("~/projects")
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(raw: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => {
            let rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                home
            } else {
                home.join(Path::new(rest))
            }
        }
        _ => PathBuf::from(raw),
    }
}
