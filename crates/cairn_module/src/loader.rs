//! Module loading from read-only buckets.

use crate::config::LoaderConfig;
use crate::error::ModuleError;
use crate::lock::parse_lock;
use crate::module::Module;
use cairn_storage::ReadBucket;
use tokio_util::sync::CancellationToken;

/// Reads a module's lock file and metadata out of a bucket
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    config: LoaderConfig,
}

impl ModuleLoader {
    /// Create a loader
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Get config
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the module held by a bucket
    ///
    /// Returns `Ok(None)` for a bucket with no paths at all. A bucket with
    /// files but no lock file is a module with no pins. Missing
    /// documentation or license yields empty text.
    ///
    /// # Errors
    ///
    /// Returns error if the lock file is invalid, a text file is not UTF-8,
    /// the bucket cannot be read, or the token is cancelled before a read
    pub fn load(&self, cancel: &CancellationToken, bucket: &dyn ReadBucket) -> Result<Option<Module>, ModuleError> {
        check_cancelled(cancel)?;
        if bucket.is_empty() {
            tracing::debug!("empty bucket, no module");
            return Ok(None);
        }

        let pins = match read_text(cancel, bucket, &self.config.lock_path)? {
            Some(text) => parse_lock(&text)?,
            None => Vec::new(),
        };
        let documentation = first_text(cancel, bucket, &self.config.documentation_paths)?;
        let license = first_text(cancel, bucket, &self.config.license_paths)?;

        let module = Module::new(pins, documentation, license);
        tracing::info!(
            pins = module.pins().len(),
            documentation = module.documentation_path().unwrap_or("-"),
            license = module.license_path().unwrap_or("-"),
            "module loaded"
        );
        Ok(Some(module))
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ModuleError> {
    if cancel.is_cancelled() {
        return Err(ModuleError::Cancelled);
    }
    Ok(())
}

fn read_text(cancel: &CancellationToken, bucket: &dyn ReadBucket, path: &str) -> Result<Option<String>, ModuleError> {
    check_cancelled(cancel)?;
    let Some(bytes) = bucket.read_optional(path)? else {
        return Ok(None);
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| ModuleError::InvalidText { path: path.to_string() })
}

/// First candidate present in the bucket, as (path, text)
fn first_text(
    cancel: &CancellationToken,
    bucket: &dyn ReadBucket,
    candidates: &[String],
) -> Result<Option<(String, String)>, ModuleError> {
    for path in candidates {
        if let Some(text) = read_text(cancel, bucket, path)? {
            return Ok(Some((path.clone(), text)));
        }
    }
    Ok(None)
}
