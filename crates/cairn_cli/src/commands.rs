//! Command implementations over local directories.

use crate::config::CliConfig;
use cairn_core::{BucketPath, DigestType};
use cairn_module::{Module, ModuleLoader};
use cairn_storage::{Blob, BlobSet, Bucket, BucketPolicy, FileSource, Manifest, validate_blobs};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// A directory hashed into a manifest and its blobs
#[derive(Debug)]
pub struct IndexedDir {
    /// One entry per regular file
    pub manifest: Manifest,
    /// File-backed blobs, in manifest order
    pub blobs: Vec<Blob>,
}

/// Every regular file under `root`, as bucket path and filesystem path,
/// sorted by bucket path
pub fn walk_dir(root: &Path) -> Result<Vec<(BucketPath, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).wrap_err_with(|| format!("failed to list {}", dir.display()))?;
        for entry in entries {
            let entry = entry.wrap_err_with(|| format!("failed to list {}", dir.display()))?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push((bucket_path(root, &path)?, path));
            } else {
                tracing::debug!(path = %path.display(), "skipping non-regular file");
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn bucket_path(root: &Path, path: &Path) -> Result<BucketPath> {
    let relative = path.strip_prefix(root)?;
    let mut segments = Vec::new();
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| eyre!("path is not valid UTF-8: {}", path.display()))?;
        segments.push(segment);
    }
    Ok(BucketPath::new(segments.join("/"))?)
}

/// Hash every file under `root`
pub async fn index_dir(cancel: &CancellationToken, root: &Path, config: &CliConfig) -> Result<IndexedDir> {
    index_dir_with(cancel, root, config.digest_type, config.concurrency).await
}

async fn index_dir_with(
    cancel: &CancellationToken,
    root: &Path,
    digest_type: DigestType,
    concurrency: usize,
) -> Result<IndexedDir> {
    let files = walk_dir(root)?;
    let (paths, sources): (Vec<BucketPath>, Vec<PathBuf>) = files.into_iter().unzip();
    let blobs = validate_blobs(cancel, sources, concurrency, move |path| {
        Blob::from_source(digest_type, FileSource::new(path))
    })
    .await
    .map_err(|e| match e {
        cairn_storage::BlobSetError::InvalidBlobAt { index, source } => {
            eyre!(source).wrap_err(format!("failed to hash {}", paths[index]))
        }
        other => eyre!(other),
    })?;

    let mut manifest = Manifest::new();
    for (path, blob) in paths.iter().zip(&blobs) {
        manifest.add_entry(path.as_str(), blob.digest().clone())?;
    }
    tracing::info!(root = %root.display(), files = blobs.len(), %digest_type, "indexed directory");
    Ok(IndexedDir { manifest, blobs })
}

/// Canonical manifest text for a directory
pub async fn manifest_text(cancel: &CancellationToken, root: &Path, config: &CliConfig) -> Result<String> {
    Ok(index_dir(cancel, root, config).await?.manifest.to_text())
}

/// Check a directory against a manifest file under the configured policy
///
/// Files are hashed with the manifest's own algorithm when it has entries.
pub async fn verify(
    cancel: &CancellationToken,
    root: &Path,
    manifest_path: &Path,
    config: &CliConfig,
) -> Result<Bucket> {
    let text = std::fs::read_to_string(manifest_path)
        .wrap_err_with(|| format!("failed to read manifest {}", manifest_path.display()))?;
    let manifest =
        Manifest::parse(&text).wrap_err_with(|| format!("invalid manifest {}", manifest_path.display()))?;
    let digest_type = manifest
        .entries()
        .first()
        .map_or(config.digest_type, |entry| entry.digest.digest_type());

    let indexed = index_dir_with(cancel, root, digest_type, config.concurrency).await?;
    let blobs = BlobSet::new(indexed.blobs)?;
    Bucket::new(manifest, blobs, config.policy).wrap_err_with(|| format!("{} does not match its manifest", root.display()))
}

/// Load the module held by a directory
pub async fn load_module(cancel: &CancellationToken, root: &Path, config: &CliConfig) -> Result<Option<Module>> {
    let indexed = index_dir(cancel, root, config).await?;
    let bucket = Bucket::new(indexed.manifest, BlobSet::new(indexed.blobs)?, BucketPolicy::complete())?;
    Ok(ModuleLoader::new(config.loader.clone()).load(cancel, &bucket)?)
}
