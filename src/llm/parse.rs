use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use super::LlmError;
use crate::models::{DiagramResponse, GeneratedImage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Why the model produced nothing usable, for error messages.
    fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked ({reason})");
        }
        match self.candidates.first() {
            None => "no candidates returned".to_string(),
            Some(c) => match c.finish_reason.as_deref() {
                Some(reason) => format!("empty answer (finish reason {reason})"),
                None => "empty answer".to_string(),
            },
        }
    }
}

/// Extracts the structured diagram answer from a code-generation response.
pub(crate) fn diagram_response(response: &GenerateContentResponse) -> Result<DiagramResponse, LlmError> {
    let text = response.text();
    if text.trim().is_empty() {
        return Err(LlmError::Malformed(response.empty_reason()));
    }
    parse_diagram_json(&text)
}

/// Parses the model's JSON answer. Tolerates prose or fences around the
/// object and fenced code inside `diagram_code`.
pub fn parse_diagram_json(text: &str) -> Result<DiagramResponse, LlmError> {
    let mut parsed: DiagramResponse = match serde_json::from_str(text.trim()) {
        Ok(parsed) => parsed,
        Err(first) => {
            let object = extract_json_object(text)
                .ok_or_else(|| LlmError::Malformed(format!("not a JSON object: {first}")))?;
            serde_json::from_str(object).map_err(|e| LlmError::Malformed(e.to_string()))?
        }
    };

    parsed.diagram_code = strip_code_fences(&parsed.diagram_code);
    if parsed.diagram_code.trim().is_empty() {
        return Err(LlmError::Malformed("diagram_code is empty".to_string()));
    }
    Ok(parsed)
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Removes a surrounding Markdown code fence (```` ```python ... ``` ````).
pub fn strip_code_fences(code: &str) -> String {
    let trimmed = code.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return code.to_string();
    };

    // Drop the info string (e.g. "python") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    let body = body.trim_end().strip_suffix("```").unwrap_or(body);
    format!("{}\n", body.trim_end())
}

/// Extracts the first inline image from an image-generation response.
pub(crate) fn generated_image(response: &GenerateContentResponse) -> Result<GeneratedImage, LlmError> {
    let Some(inline) = response.parts().iter().find_map(|p| p.inline_data.as_ref()) else {
        return Err(LlmError::Malformed(format!(
            "No image was generated in the response ({})",
            response.empty_reason()
        )));
    };

    let data = STANDARD
        .decode(inline.data.trim())
        .map_err(|e| LlmError::Malformed(format!("invalid image data: {e}")))?;

    let caption = response.text();
    Ok(GeneratedImage {
        mime_type: inline.mime_type.clone(),
        data,
        caption: Some(caption.trim().to_string()).filter(|c| !c.is_empty()),
    })
}
