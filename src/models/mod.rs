mod execution;
mod metadata;
mod request;
mod response;

pub use execution::ExecutionResult;
pub use metadata::{ArtifactMetadata, GenerationMode};
pub use request::{validate_output_name, ArchitectureType, CloudProvider, GenerationRequest, RequestError};
pub use response::{DiagramResponse, GeneratedImage};
