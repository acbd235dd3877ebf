use crate::models::GenerationRequest;

pub const SYSTEM_INSTRUCTIONS: &[&str] = &[
    "You are an expert solutions architect and diagram designer.",
    "You create professional, clear, and well-structured architecture diagrams.",
    "Always follow industry best practices for architecture design.",
    "Use proper naming conventions and clear component relationships.",
    "Include security considerations, scalability patterns, and resilience.",
    "Generate Python code using the 'diagrams' library that creates professional diagrams.",
    "Ensure the diagram code is complete, runnable, and follows best practices.",
    "Include relevant components, connections, and groupings (clusters).",
    "Add appropriate labels, directions, and styling for professional appearance.",
];

const CODE_REQUIREMENTS: &[&str] = &[
    "1. Import necessary modules from diagrams library",
    "2. Create a Diagram object with appropriate name and direction",
    "3. Define all components with proper icons based on the cloud provider",
    "4. Use Cluster objects for logical groupings",
    "5. Connect components with arrows showing data/control flow",
    "6. Follow architecture best practices",
    "7. Be production-ready and professional",
];

fn requirement_lines(request: &GenerationRequest) -> Vec<String> {
    let mut lines = vec![
        format!("Description: {}", request.description()),
        format!("Architecture Type: {}", request.architecture_type()),
    ];
    if let Some(provider) = request.cloud_provider() {
        lines.push(format!("Cloud Provider: {provider}"));
    }
    if let Some(components) = request.components() {
        lines.push(format!("Specific Components: {components}"));
    }
    lines
}

/// User prompt asking for `diagrams` code plus a structured explanation.
pub fn code_prompt(request: &GenerationRequest) -> String {
    let mut out = String::from(
        "Create a professional architecture diagram with the following requirements:\n",
    );
    for line in requirement_lines(request) {
        out.push('\n');
        out.push_str(&line);
    }

    out.push_str("\n\nGenerate complete, runnable Python code using the 'diagrams' library.\n");
    out.push_str("The code should:");
    for line in CODE_REQUIREMENTS {
        out.push('\n');
        out.push_str(line);
    }

    out.push_str("\n\nProvide the response in the structured format with:");
    out.push_str("\n- diagram_code: Complete Python code");
    out.push_str("\n- description: Clear explanation of the architecture");
    out.push_str("\n- components: List of all components used");
    out.push_str("\n- best_practices: Architecture best practices applied");
    out
}

/// Prompt for an image model that draws the diagram directly.
pub fn image_prompt(request: &GenerationRequest) -> String {
    let mut out = String::from(
        "Create a professional, high-resolution software architecture diagram image.\n",
    );
    for line in requirement_lines(request) {
        out.push('\n');
        out.push_str(&line);
    }

    if let Some(provider) = request.cloud_provider() {
        out.push_str(&format!(
            "\n\nUse the official {provider} service icons for every managed service."
        ));
    } else {
        out.push_str("\n\nUse clean, generic icons for each component.");
    }
    out.push_str(
        "\nGroup related components into labeled boundaries, draw directional arrows for \
         data and control flow, label every component and connection, and use a white \
         background with a consistent color palette. Do not include any text other than \
         labels and a title.",
    );
    out
}
