use std::path::PathBuf;

use anyhow::Result;
use jiff::Timestamp;
use serde::Serialize;
use tracing::warn;

use crate::models::GenerationMode;
use crate::store::ArtifactStore;

#[derive(Debug, Serialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mode: Option<GenerationMode>,
    pub description: Option<String>,
    pub created_at: Option<Timestamp>,
}

/// Every artifact in the store, sorted by name, with whatever metadata survives.
pub fn run(store: &ArtifactStore) -> Result<Vec<ArtifactSummary>> {
    let mut summaries: Vec<ArtifactSummary> = store
        .list()?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_stem()?.to_string_lossy().into_owned();
            let size_bytes = path.metadata().map(|m| m.len()).unwrap_or(0);
            let metadata = store.load_metadata(&name).unwrap_or_else(|e| {
                warn!(name = %name, error = %e, "ignoring unreadable metadata");
                None
            });

            Some(ArtifactSummary {
                mode: metadata.as_ref().map(|m| m.mode),
                description: metadata.as_ref().map(|m| m.description.clone()),
                created_at: metadata.map(|m| m.created_at),
                name,
                path,
                size_bytes,
            })
        })
        .collect();

    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}
