use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::helpers::find_similar;
use crate::models::ArtifactMetadata;
use crate::sandbox::{self, ARTIFACT_EXTENSION};

const METADATA_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to list artifacts in {}: {message}", .path.display())]
    List { path: PathBuf, message: String },

    #[error("Artifact not found: {name}{}", suggestion_hint(.suggestion))]
    NotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Artifact already exists: {name} (pass --overwrite to replace it)")]
    AlreadyExists { name: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!("\nDid you mean: {s}"))
        .unwrap_or_default()
}

/// A file that `clear` could not remove.
#[derive(Debug, Clone, Serialize)]
pub struct ClearFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ClearReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<ClearFailure>,
}

/// The directory holding rendered diagrams and their metadata sidecars.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist yet. Idempotent.
    pub fn ensure_ready(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        sandbox::artifact_path(&self.dir, name)
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{METADATA_EXTENSION}"))
    }

    /// All image artifacts currently in the directory, in no particular order.
    /// A missing directory has no artifacts.
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/*.{ARTIFACT_EXTENSION}",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        let entries = glob::glob(&pattern).map_err(|e| StoreError::List {
            path: self.dir.clone(),
            message: e.to_string(),
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => artifacts.push(path),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable directory entry"),
            }
        }
        Ok(artifacts)
    }

    /// Artifact names (file stems), sorted.
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .list()?
            .iter()
            .filter_map(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Refuse to reuse the name of an existing artifact unless `overwrite`.
    pub fn check_available(&self, name: &str, overwrite: bool) -> Result<(), StoreError> {
        if !overwrite && self.artifact_path(name).exists() {
            return Err(StoreError::AlreadyExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve an artifact by name, suggesting a close match when it is missing.
    pub fn find(&self, name: &str) -> Result<PathBuf, StoreError> {
        let path = self.artifact_path(name);
        if path.is_file() {
            return Ok(path);
        }

        let names = self.names()?;
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        Err(StoreError::NotFound {
            name: name.to_string(),
            suggestion: find_similar(name, &refs),
        })
    }

    /// Delete every artifact. Files that cannot be removed are skipped and
    /// reported; the rest are still deleted.
    pub fn clear(&self) -> Result<ClearReport, StoreError> {
        self.clear_with(|path| fs::remove_file(path))
    }

    fn clear_with(
        &self,
        mut remove: impl FnMut(&Path) -> io::Result<()>,
    ) -> Result<ClearReport, StoreError> {
        let mut report = ClearReport::default();

        for path in self.list()? {
            match remove(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed artifact");
                    self.remove_sidecar(&path);
                    report.removed.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove artifact");
                    report.failed.push(ClearFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn remove_sidecar(&self, artifact: &Path) {
        let sidecar = artifact.with_extension(METADATA_EXTENSION);
        match fs::remove_file(&sidecar) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %sidecar.display(), error = %e, "failed to remove metadata"),
        }
    }

    /// Write image bytes as the artifact `name`, atomically.
    pub fn write_artifact(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.artifact_path(name);
        self.write_atomic(&path, bytes)?;
        Ok(path)
    }

    pub fn save_metadata(&self, metadata: &ArtifactMetadata) -> Result<PathBuf, StoreError> {
        let path = self.metadata_path(&metadata.name);
        let json = serde_json::to_vec_pretty(metadata).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: io::Error::other(e),
        })?;
        self.write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn load_metadata(&self, name: &str) -> Result<Option<ArtifactMetadata>, StoreError> {
        let path = self.metadata_path(name);
        if !path.is_file() {
            return Ok(None);
        }

        let read_err = |message: String| StoreError::Read {
            path: path.clone(),
            message,
        };
        let contents = fs::read_to_string(&path).map_err(|e| read_err(e.to_string()))?;
        let metadata = serde_json::from_str(&contents).map_err(|e| read_err(e.to_string()))?;
        Ok(Some(metadata))
    }

    /// Copy the artifact `name` to `dest`. A directory destination keeps the
    /// artifact's file name.
    pub fn export(&self, name: &str, dest: &Path) -> Result<PathBuf, StoreError> {
        let source = self.find(name)?;
        let target = if dest.is_dir() {
            dest.join(source.file_name().unwrap_or_default())
        } else {
            dest.to_path_buf()
        };

        fs::copy(&source, &target).map_err(|source| StoreError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    /// Temp file in the same directory, then rename over the destination.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        self.ensure_ready()?;
        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        file.write_all(bytes).map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
