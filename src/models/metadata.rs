use clap::ValueEnum;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{DiagramResponse, GenerationRequest};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationMode {
    /// Ask the model for `diagrams` code and render it locally
    #[default]
    Code,
    /// Ask an image model for the picture directly
    Image,
}

/// Sidecar record written next to an artifact after a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub mode: GenerationMode,
    pub model: String,
    pub request: GenerationRequest,
    pub description: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
    pub code: Option<String>,
    pub created_at: Timestamp,
}

impl ArtifactMetadata {
    pub fn for_code(
        name: &str,
        model: &str,
        request: &GenerationRequest,
        response: &DiagramResponse,
    ) -> Self {
        Self {
            name: name.to_string(),
            mode: GenerationMode::Code,
            model: model.to_string(),
            request: request.clone(),
            description: response.description.clone(),
            components: response.components.clone(),
            best_practices: response.best_practices.clone(),
            code: Some(response.diagram_code.clone()),
            created_at: Timestamp::now(),
        }
    }

    pub fn for_image(
        name: &str,
        model: &str,
        request: &GenerationRequest,
        caption: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mode: GenerationMode::Image,
            model: model.to_string(),
            request: request.clone(),
            description: caption.unwrap_or(request.description()).to_string(),
            components: Vec::new(),
            best_practices: Vec::new(),
            code: None,
            created_at: Timestamp::now(),
        }
    }
}
