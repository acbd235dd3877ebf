use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::GenerateArgs;
use crate::id::{default_output_name, generate_id};
use crate::llm::DiagramAgent;
use crate::models::{
    validate_output_name, ArchitectureType, ArtifactMetadata, CloudProvider, DiagramResponse,
    ExecutionResult, GenerationMode, GenerationRequest, RequestError,
};
use crate::pipeline::Pipeline;
use crate::templates::get_template;

#[derive(Debug, Serialize)]
pub struct GenerateOutcome {
    pub request_id: String,
    pub name: String,
    pub mode: GenerationMode,
    pub model: String,
    pub result: ExecutionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<DiagramResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Builds the request from flags, filling anything not given from `--template`.
pub fn build_request(args: &GenerateArgs) -> Result<GenerationRequest, RequestError> {
    let template = args.template.as_deref().map(get_template).transpose()?;

    let description = args
        .description
        .clone()
        .or_else(|| template.map(|t| t.description.to_string()))
        .ok_or(RequestError::EmptyDescription)?;

    let architecture_type = match args.architecture_type.as_deref() {
        Some(value) => ArchitectureType::parse(value)?,
        None => template.map(|t| t.architecture_type).unwrap_or_default(),
    };

    let cloud_provider = match args.provider.as_deref() {
        Some(value) => CloudProvider::parse_optional(value)?,
        None => template.and_then(|t| t.cloud_provider),
    };

    let components = args
        .components
        .clone()
        .or_else(|| template.map(|t| t.components.to_string()));

    Ok(GenerationRequest::new(description, architecture_type)?
        .with_cloud_provider(cloud_provider)
        .with_components(components))
}

pub async fn run(
    args: &GenerateArgs,
    pipeline: &Pipeline,
    agent: &dyn DiagramAgent,
) -> Result<GenerateOutcome> {
    let request = build_request(args)?;
    let request_id = generate_id();
    let name = match &args.name {
        Some(name) => name.clone(),
        None => default_output_name(&request_id),
    };
    validate_output_name(&name)?;
    pipeline.store().check_available(&name, args.overwrite)?;

    info!(
        request_id = %request_id,
        name = %name,
        mode = %args.mode,
        architecture_type = %request.architecture_type(),
        "generating diagram"
    );

    let outcome = match args.mode {
        GenerationMode::Code => {
            let response = agent
                .generate_code(&request)
                .await
                .context("Failed to generate diagram code")?;
            let result = pipeline.run(&response.diagram_code, &name).await?;
            let model = agent.code_model().to_string();
            if result.is_success() {
                save_metadata(
                    pipeline,
                    &ArtifactMetadata::for_code(&name, &model, &request, &response),
                );
            }
            GenerateOutcome {
                request_id,
                name,
                mode: GenerationMode::Code,
                model,
                result,
                response: Some(response),
                caption: None,
            }
        }
        GenerationMode::Image => {
            let image = agent
                .generate_image(&request)
                .await
                .context("Failed to generate diagram image")?;
            let result = pipeline.save_image(&name, &image)?;
            let model = agent.image_model().to_string();
            if result.is_success() {
                save_metadata(
                    pipeline,
                    &ArtifactMetadata::for_image(&name, &model, &request, image.caption.as_deref()),
                );
            }
            GenerateOutcome {
                request_id,
                name,
                mode: GenerationMode::Image,
                model,
                result,
                response: None,
                caption: image.caption,
            }
        }
    };

    Ok(outcome)
}

// The artifact already exists at this point, so a sidecar failure is not fatal.
fn save_metadata(pipeline: &Pipeline, metadata: &ArtifactMetadata) {
    if let Err(e) = pipeline.store().save_metadata(metadata) {
        warn!(name = %metadata.name, error = %e, "failed to save diagram metadata");
    }
}
