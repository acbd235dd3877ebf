use serde::{Deserialize, Serialize};

/// Structured answer from the code-generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramResponse {
    pub diagram_code: String,
    pub description: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
}

/// Raw image returned by the image-generation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Any text the model returned alongside the image.
    pub caption: Option<String>,
}
