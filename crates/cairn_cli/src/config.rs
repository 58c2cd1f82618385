//! CLI configuration file and flag overrides.

use cairn_core::DigestType;
use cairn_module::LoaderConfig;
use cairn_storage::BucketPolicy;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Checks applied when building buckets
    pub policy: BucketPolicy,
    /// Module file locations
    pub loader: LoaderConfig,
    /// Maximum files hashed at once
    pub concurrency: usize,
    /// Algorithm for newly computed digests
    pub digest_type: DigestType,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            policy: BucketPolicy::complete(),
            loader: LoaderConfig::default(),
            concurrency: std::thread::available_parallelism().map_or(4, NonZeroUsize::get),
            digest_type: DigestType::default(),
        }
    }
}

/// Command-line values that override the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--concurrency`
    pub concurrency: Option<usize>,
    /// `--digest`
    pub digest_type: Option<DigestType>,
    /// `--allow-missing`
    pub allow_missing: bool,
    /// `--allow-extra`
    pub allow_extra: bool,
}

impl CliConfig {
    /// Load from a JSON file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text).wrap_err_with(|| format!("invalid config {}", path.display()))
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(digest_type) = overrides.digest_type {
            self.digest_type = digest_type;
        }
        if overrides.allow_missing {
            self.policy.all_manifest_blobs_present = false;
        }
        if overrides.allow_extra {
            self.policy.no_extra_blobs = false;
        }
        self
    }
}
