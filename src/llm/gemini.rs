use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::parse::{self, GenerateContentResponse};
use super::prompt::{code_prompt, image_prompt, SYSTEM_INSTRUCTIONS};
use super::{DiagramAgent, LlmError};
use crate::config::LlmSettings;
use crate::models::{DiagramResponse, GeneratedImage, GenerationRequest};

/// Google Gemini over the `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    code_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|source| LlmError::Transport {
                model: settings.code_model.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            code_model: settings.code_model.clone(),
            image_model: settings.image_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &Value,
    ) -> Result<GenerateContentResponse, LlmError> {
        debug!(model, "calling generateContent");

        let transport = |source| LlmError::Transport {
            model: model.to_string(),
            source,
        };
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl DiagramAgent for GeminiClient {
    fn code_model(&self) -> &str {
        &self.code_model
    }

    fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn generate_code(&self, request: &GenerationRequest) -> Result<DiagramResponse, LlmError> {
        let response = self
            .generate_content(&self.code_model, &code_request_body(request))
            .await?;
        let parsed = parse::diagram_response(&response)?;
        info!(
            model = %self.code_model,
            components = parsed.components.len(),
            "received diagram code"
        );
        Ok(parsed)
    }

    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage, LlmError> {
        let response = self
            .generate_content(&self.image_model, &image_request_body(request))
            .await?;
        let image = parse::generated_image(&response)?;
        info!(
            model = %self.image_model,
            mime_type = %image.mime_type,
            bytes = image.data.len(),
            "received diagram image"
        );
        Ok(image)
    }
}

fn response_schema() -> Value {
    let string_list = json!({"type": "ARRAY", "items": {"type": "STRING"}});
    json!({
        "type": "OBJECT",
        "properties": {
            "diagram_code": {"type": "STRING", "description": "Python code to generate the diagram"},
            "description": {"type": "STRING", "description": "Description of the diagram"},
            "components": string_list,
            "best_practices": string_list,
        },
        "required": ["diagram_code", "description", "components", "best_practices"],
    })
}

fn code_request_body(request: &GenerationRequest) -> Value {
    json!({
        "systemInstruction": {"parts": [{"text": SYSTEM_INSTRUCTIONS.join("\n")}]},
        "contents": [{"role": "user", "parts": [{"text": code_prompt(request)}]}],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        },
    })
}

fn image_request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": image_prompt(request)}]}],
        "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]},
    })
}

/// Maps a non-success HTTP status onto the upstream error taxonomy.
fn status_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(500).collect()
            }
        });

    match status {
        401 | 403 => LlmError::Auth { status, message },
        429 => LlmError::Quota { status, message },
        _ => LlmError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchitectureType, CloudProvider};

    fn settings() -> LlmSettings {
        LlmSettings {
            base_url: "https://example.test/".to_string(),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_endpoint_uses_model_and_trims_slash() {
        let client = GeminiClient::new(&settings(), "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.code_model(), LlmSettings::default().code_model);
    }

    #[test]
    fn test_code_request_body_asks_for_structured_json() {
        let request = GenerationRequest::new("A queue worker", ArchitectureType::Serverless)
            .unwrap()
            .with_cloud_provider(Some(CloudProvider::Aws));
        let body = code_request_body(&request);

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][0],
            "diagram_code"
        );
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Cloud Provider: AWS"));
        let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(system.contains("'diagrams' library"));
    }

    #[test]
    fn test_image_request_body_requests_image_modality() {
        let request = GenerationRequest::new("A queue worker", ArchitectureType::Data).unwrap();
        let body = image_request_body(&request);
        assert_eq!(body["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid"}}"#;
        match status_error(403, body) {
            LlmError::Auth { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(status_error(429, ""), LlmError::Quota { .. }));
        match status_error(500, "upstream exploded") {
            LlmError::Api { message, .. } => assert_eq!(message, "upstream exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
