//! Image analysis through an external vision-language HTTP API.


pub mod image;
pub mod retry;

pub use image::{ImageError, ImageInput};
pub use retry::RetryPolicy;

use crate::config::VisionConfig;
use crate::mcp::{Arguments, Tool, ToolError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const ANALYZE_TOOL: &str = "analyze_image";
/// Older clients send the image under this key
pub const IMAGE_ALIAS: &str = "image_data_uri";

/// Request/response dialect of the vision endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// DashScope multimodal-generation
    #[default]
    Dashscope,
    /// OpenAI-compatible chat completions
    Openai,
}

impl ApiFlavor {
    #[inline]
    pub fn request_body(self, model: &str, prompt: &str, image_url: &str) -> Value {
        let messages = json!([{
            "role": "user",
            "content": [
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": image_url}}
            ]
        }]);

        match self {
            Self::Dashscope => json!({
                "model": model,
                "input": {"messages": messages},
                "parameters": {"result_format": "message"}
            }),
            Self::Openai => json!({
                "model": model,
                "messages": messages
            }),
        }
    }

    /// Pull the reply text out of a response document. The content may be a
    /// plain string or a list of typed parts.
    #[inline]
    pub fn extract_text(self, response: &Value) -> Option<String> {
        let pointer = match self {
            Self::Dashscope => "/output/choices/0/message/content",
            Self::Openai => "/choices/0/message/content",
        };

        match response.pointer(pointer)? {
            Value::String(text) => Some(text.clone()),
            Value::Array(parts) => parts
                .iter()
                .find(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                .and_then(|part| part.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisionClient {
    api_url: Url,
    flavor: ApiFlavor,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    image_input: ImageInput,
    retry: RetryPolicy,
    agent: ureq::Agent,
}

impl VisionClient {
    #[inline]
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let api_url = config
            .api_url()
            .context("Invalid vision API configuration")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            api_url,
            flavor: config.flavor,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
            image_input: config.image_input,
            retry: RetryPolicy::new(
                config.retry.max_attempts,
                Duration::from_millis(config.retry.base_delay_ms),
            ),
            agent,
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Configured key, falling back to the environment at call time
    fn api_key(&self) -> Result<String, ToolError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ToolError::Upstream(format!(
                    "no API key configured and {} is not set",
                    self.api_key_env
                ))
            })
    }

    /// Ask the vision model `prompt` about the image at `image_ref`
    #[inline]
    pub fn analyze(&self, prompt: &str, image_ref: &str) -> Result<String, ToolError> {
        let image_url = image::resolve(self.image_input, image_ref)
            .map_err(|e| ToolError::invalid("image_url", e.to_string()))?;
        let api_key = self.api_key()?;

        let body = self.flavor.request_body(&self.model, prompt, &image_url);
        let request_json =
            serde_json::to_string(&body).context("Failed to serialize vision request")?;
        let authorization = format!("Bearer {}", api_key);

        info!(
            "Calling vision API {} with model {}",
            self.api_url, self.model
        );
        let response_text = self
            .retry
            .run(|| {
                self.agent
                    .post(self.api_url.as_str())
                    .header("Authorization", authorization.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(|e| ToolError::Upstream(format!("{:#}", e)))?;

        debug!("Vision API responded with {} bytes", response_text.len());
        let response: Value = serde_json::from_str(&response_text)
            .map_err(|e| ToolError::Upstream(format!("invalid JSON in response: {}", e)))?;

        self.flavor.extract_text(&response).ok_or_else(|| {
            ToolError::Upstream(format!(
                "could not extract text from response: {}",
                response_text
            ))
        })
    }
}

#[inline]
pub fn tool_definitions() -> Vec<Tool> {
    vec![Tool {
        name: ANALYZE_TOOL.to_string(),
        description: "Analyze and understand an image with a vision-language model. Use it to \
            describe image content, answer questions about an image or identify objects in it."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The question or instruction for the model (e.g., 'What is in this picture?')."
                },
                "image_url": {
                    "type": "string",
                    "description": "URL, data URI or local file path of the image (e.g., 'https://example.com/img.png', 'file:///tmp/image.jpg' or '/tmp/image.jpg')."
                },
                "image_data_uri": {
                    "type": "string",
                    "description": "Alternative to image_url for a base64 data URI."
                }
            },
            "required": ["prompt"]
        }),
    }]
}

#[inline]
pub fn analyze_image(client: &VisionClient, args: &Arguments) -> Result<String, ToolError> {
    let prompt = args.required_str("prompt")?;
    let image_ref = match args.optional_str("image_url")? {
        Some(reference) => reference,
        None => args
            .optional_str(IMAGE_ALIAS)?
            .ok_or_else(|| ToolError::missing("image_url"))?,
    };

    client.analyze(prompt, image_ref)
}
