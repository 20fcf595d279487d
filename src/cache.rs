//! Artifact memoization keyed by (stage, input fingerprint)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::corpus::Corpus;
use crate::error::{PipelineError, Result};
use crate::utils::io::ensure_dir;
use crate::vectorizer::{matrix::GroupTermMatrix, tfidf::WeightingEngine, GroupVectorizer};

/// A value that can be persisted as one file
pub trait Artifact: Sized {
    /// file name extension including the leading dot
    const EXTENSION: &'static str;

    fn save_artifact(&self, path: &Path) -> Result<()>;
    fn load_artifact(path: &Path) -> Result<Self>;
}

impl Artifact for Corpus {
    const EXTENSION: &'static str = ".bin.gz";

    fn save_artifact(&self, path: &Path) -> Result<()> {
        self.save(path)
    }

    fn load_artifact(path: &Path) -> Result<Self> {
        Corpus::load(path)
    }
}

impl<E: WeightingEngine> Artifact for GroupVectorizer<E> {
    const EXTENSION: &'static str = ".cbor.gz";

    fn save_artifact(&self, path: &Path) -> Result<()> {
        self.save(path)
    }

    fn load_artifact(path: &Path) -> Result<Self> {
        GroupVectorizer::load(path)
    }
}

impl Artifact for GroupTermMatrix {
    const EXTENSION: &'static str = ".cbor.gz";

    fn save_artifact(&self, path: &Path) -> Result<()> {
        self.save(path)
    }

    fn load_artifact(path: &Path) -> Result<Self> {
        GroupTermMatrix::load(path)
    }
}

/// xxh3 of the CBOR encoding of `value`
pub fn fingerprint<T: Serialize>(value: &T) -> Result<u64> {
    let bytes = serde_cbor::to_vec(value).map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(xxh3_64(&bytes))
}

/// Fingerprint of a file list: path, size and modification time of each file
pub fn fingerprint_files(paths: &[PathBuf]) -> Result<u64> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let meta = fs::metadata(path).map_err(|e| PipelineError::io(path, e))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        entries.push((path.to_string_lossy().into_owned(), meta.len(), mtime));
    }
    fingerprint(&entries)
}

/// Single place where "load if present, else compute and save" lives.
///
/// Files are named `{prefix}_{STAGE}.{fingerprint:016x}{ext}` inside `dir`,
/// so a changed input or config never reuses a stale artifact.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    prefix: String,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<T: Artifact>(&self, stage: &str, fingerprint: u64) -> PathBuf {
        self.dir
            .join(format!("{}_{stage}.{fingerprint:016x}{}", self.prefix, T::EXTENSION))
    }

    /// Load the stage artifact for `fingerprint`, or compute and save it.
    /// An artifact that exists but fails to load is recomputed.
    pub fn get_or_compute<T, F>(&self, stage: &str, fingerprint: u64, compute: F) -> Result<T>
    where
        T: Artifact,
        F: FnOnce() -> Result<T>,
    {
        let path = self.path_for::<T>(stage, fingerprint);
        if path.exists() {
            match T::load_artifact(&path) {
                Ok(value) => {
                    info!(stage, path = %path.display(), "cached artifact loaded");
                    return Ok(value);
                }
                Err(e) => warn!(stage, path = %path.display(), error = %e, "cached artifact unreadable, recomputing"),
            }
        }
        debug!(stage, fingerprint, "computing artifact");
        let value = compute()?;
        ensure_dir(&self.dir)?;
        value.save_artifact(&path)?;
        info!(stage, path = %path.display(), "artifact saved");
        Ok(value)
    }

    /// Delete every artifact of `stage`, whatever its fingerprint.
    /// Returns the number of removed files.
    pub fn invalidate(&self, stage: &str) -> Result<usize> {
        let head = format!("{}_{stage}.", self.prefix);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(PipelineError::io(&self.dir, e)),
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&self.dir, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&head) {
                let path = entry.path();
                fs::remove_file(&path).map_err(|e| PipelineError::io(&path, e))?;
                removed += 1;
            }
        }
        info!(stage, removed, "stage artifacts invalidated");
        Ok(removed)
    }
}
