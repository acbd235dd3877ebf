use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::models::validate_output_name;
use crate::store::ArtifactStore;

#[derive(Debug, Serialize)]
pub struct ExportOutcome {
    pub name: String,
    pub source: PathBuf,
    pub dest: PathBuf,
}

pub fn run(name: &str, dest: &Path, store: &ArtifactStore) -> Result<ExportOutcome> {
    validate_output_name(name)?;
    let source = store.find(name)?;
    let dest = store.export(name, dest)?;
    info!(name, dest = %dest.display(), "exported diagram");

    Ok(ExportOutcome {
        name: name.to_string(),
        source,
        dest,
    })
}
