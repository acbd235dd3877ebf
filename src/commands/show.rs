use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::models::{validate_output_name, ArtifactMetadata};
use crate::store::ArtifactStore;

/// Full detail view of one artifact.
#[derive(Debug, Serialize)]
pub struct ShowResult {
    pub name: String,
    pub path: PathBuf,
    pub metadata: Option<ArtifactMetadata>,
}

pub fn run(name: &str, store: &ArtifactStore) -> Result<ShowResult> {
    validate_output_name(name)?;
    let path = store.find(name)?;
    let metadata = store.load_metadata(name)?;

    Ok(ShowResult {
        name: name.to_string(),
        path,
        metadata,
    })
}
