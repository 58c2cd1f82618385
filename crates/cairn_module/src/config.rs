//! Loader configuration.

use serde::{Deserialize, Serialize};

/// Default lock file path
pub const DEFAULT_LOCK_PATH: &str = "buf.lock";

/// Where the loader looks for a module's files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Lock file path
    pub lock_path: String,
    /// Documentation candidates, first present wins
    pub documentation_paths: Vec<String>,
    /// License candidates, first present wins
    pub license_paths: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            lock_path: DEFAULT_LOCK_PATH.to_string(),
            documentation_paths: vec!["buf.md".into(), "README.md".into(), "README.markdown".into()],
            license_paths: vec!["LICENSE".into(), "LICENSE.md".into(), "LICENSE.txt".into()],
        }
    }
}
