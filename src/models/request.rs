use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

/// Rejections raised before any LLM or execution call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("Unknown architecture type: {value} (expected one of: {expected})")]
    UnknownArchitectureType { value: String, expected: String },

    #[error("Unknown cloud provider: {value} (expected one of: {expected})")]
    UnknownCloudProvider { value: String, expected: String },

    #[error("Invalid output name {name:?}: {reason}")]
    InvalidOutputName { name: String, reason: &'static str },

    #[error("Template not found: {name}{}", suggestion_hint(.suggestion))]
    UnknownTemplate {
        name: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!("\nDid you mean: {s}"))
        .unwrap_or_default()
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ArchitectureType {
    #[default]
    Cloud,
    Microservices,
    Serverless,
    Data,
    Ml,
    EventDriven,
    Devops,
    Network,
}

impl ArchitectureType {
    pub fn parse(value: &str) -> Result<Self, RequestError> {
        value
            .trim()
            .parse()
            .map_err(|_| RequestError::UnknownArchitectureType {
                value: value.to_string(),
                expected: Self::iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "),
            })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum CloudProvider {
    #[serde(rename = "AWS")]
    #[strum(serialize = "AWS")]
    Aws,
    #[serde(rename = "GCP")]
    #[strum(serialize = "GCP")]
    Gcp,
    #[serde(rename = "Azure")]
    #[strum(serialize = "Azure")]
    Azure,
}

impl CloudProvider {
    /// Parses a provider name. `Generic` (or an empty value) means no provider.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, RequestError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("generic") {
            return Ok(None);
        }

        value
            .parse()
            .map(Some)
            .map_err(|_| RequestError::UnknownCloudProvider {
                value: value.to_string(),
                expected: Self::iter()
                    .map(|p| p.to_string())
                    .chain(std::iter::once("Generic".to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// A validated request for a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    description: String,
    architecture_type: ArchitectureType,
    cloud_provider: Option<CloudProvider>,
    components: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        description: impl Into<String>,
        architecture_type: ArchitectureType,
    ) -> Result<Self, RequestError> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(RequestError::EmptyDescription);
        }

        Ok(Self {
            description,
            architecture_type,
            cloud_provider: None,
            components: None,
        })
    }

    #[must_use]
    pub fn with_cloud_provider(mut self, cloud_provider: Option<CloudProvider>) -> Self {
        self.cloud_provider = cloud_provider;
        self
    }

    /// Blank component lists are treated as absent.
    #[must_use]
    pub fn with_components(mut self, components: Option<String>) -> Self {
        self.components = components
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn architecture_type(&self) -> ArchitectureType {
        self.architecture_type
    }

    pub fn cloud_provider(&self) -> Option<CloudProvider> {
        self.cloud_provider
    }

    pub fn components(&self) -> Option<&str> {
        self.components.as_deref()
    }
}

/// Output names become a file stem inside the artifact directory and a Python
/// string literal in the patched script, so they are restricted to a safe set.
pub fn validate_output_name(name: &str) -> Result<(), RequestError> {
    let invalid = |reason| RequestError::InvalidOutputName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > 128 {
        return Err(invalid("must be at most 128 characters"));
    }
    if name.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_description_rejected() {
        assert_eq!(
            GenerationRequest::new("   ", ArchitectureType::Cloud),
            Err(RequestError::EmptyDescription)
        );
    }

    #[test]
    fn test_request_trims_and_drops_blank_components() {
        let request = GenerationRequest::new("  three tier app ", ArchitectureType::Data)
            .unwrap()
            .with_components(Some("   ".to_string()));
        assert_eq!(request.description(), "three tier app");
        assert_eq!(request.components(), None);
    }

    #[test]
    fn test_architecture_type_parse() {
        assert_eq!(
            ArchitectureType::parse("event-driven").unwrap(),
            ArchitectureType::EventDriven
        );
        assert_eq!(ArchitectureType::parse("ML").unwrap(), ArchitectureType::Ml);
        assert_eq!(ArchitectureType::EventDriven.to_string(), "event-driven");

        let err = ArchitectureType::parse("mainframe").unwrap_err();
        assert!(err.to_string().contains("mainframe"));
        assert!(err.to_string().contains("serverless"));
    }

    #[test]
    fn test_cloud_provider_parse() {
        assert_eq!(CloudProvider::parse_optional("aws").unwrap(), Some(CloudProvider::Aws));
        assert_eq!(CloudProvider::parse_optional("Azure").unwrap(), Some(CloudProvider::Azure));
        assert_eq!(CloudProvider::parse_optional("Generic").unwrap(), None);
        assert_eq!(CloudProvider::parse_optional("").unwrap(), None);
        assert!(CloudProvider::parse_optional("oracle").is_err());
        assert_eq!(CloudProvider::Gcp.to_string(), "GCP");
    }

    #[test]
    fn test_validate_output_name() {
        assert!(validate_output_name("diagram-V1StGXR8").is_ok());
        assert!(validate_output_name("arch_v2.final").is_ok());
        assert!(validate_output_name("").is_err());
        assert!(validate_output_name("../escape").is_err());
        assert!(validate_output_name("has space").is_err());
        assert!(validate_output_name("quote\"d").is_err());
        assert!(validate_output_name(".hidden").is_err());
    }

    #[test]
    fn test_request_serializes_with_readable_enums() {
        let request = GenerationRequest::new("x", ArchitectureType::EventDriven)
            .unwrap()
            .with_cloud_provider(Some(CloudProvider::Aws));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["architecture_type"], "event-driven");
        assert_eq!(json["cloud_provider"], "AWS");
    }
}
