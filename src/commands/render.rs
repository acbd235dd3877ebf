use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::id::{default_output_name, generate_id};
use crate::models::{validate_output_name, ExecutionResult};
use crate::pipeline::Pipeline;

#[derive(Debug, Serialize)]
pub struct RenderOutcome {
    pub request_id: String,
    pub name: String,
    pub result: ExecutionResult,
}

/// Runs a script from disk through the same patch-and-execute pipeline.
pub async fn run(
    script: &Path,
    name: Option<String>,
    overwrite: bool,
    pipeline: &Pipeline,
) -> Result<RenderOutcome> {
    let code = fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;

    let request_id = generate_id();
    let name = name.unwrap_or_else(|| default_output_name(&request_id));
    validate_output_name(&name)?;
    pipeline.store().check_available(&name, overwrite)?;

    info!(request_id = %request_id, name = %name, script = %script.display(), "rendering script");
    let result = pipeline.run(&code, &name).await?;

    Ok(RenderOutcome {
        request_id,
        name,
        result,
    })
}
