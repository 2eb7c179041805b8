use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::error::GenerationError;
use crate::llm::media::ImageData;
use crate::studio::edits::retouch_instruction;
use crate::studio::types::ModelChoice;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

const PROVIDER: &str = "ai-gateway";

/// One image generation call: prompt plus positional reference images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ModelChoice,
    pub reference_images: Vec<ImageData>,
}

/// Retouch call. With a mask, only the light areas of the mask are edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetouchRequest {
    pub image_data: ImageData,
    #[serde(default)]
    pub mask_data: Option<ImageData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: ImageData,
}

pub trait ImageService {
    fn generate_image(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<ImageResponse, GenerationError>> + Send;

    fn retouch_image(
        &self,
        request: &RetouchRequest,
    ) -> impl Future<Output = Result<ImageResponse, GenerationError>> + Send;
}

/// Client for an OpenAI-compatible `chat/completions` endpoint that returns
/// generated images in `choices[0].message.images`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
    high_quality_model: String,
    fast_model: String,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = error_message(&value);
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn error_message(value: &Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .map(|v| v.to_string())
}

fn summarize_payload(payload: &Value) -> String {
    let model = payload
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let parts = payload
        .pointer("/messages/0/content")
        .and_then(|v| v.as_array())
        .map(|parts| parts.as_slice())
        .unwrap_or(&[]);
    let images = parts
        .iter()
        .filter(|part| part.get("type").and_then(|v| v.as_str()) == Some("image_url"))
        .count();
    let prompt_chars = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .map(|text| text.chars().count())
        .sum::<usize>();
    format!(
        "model={}, prompt_chars={}, images={}",
        model, prompt_chars, images
    )
}

/// Maps a non-2xx status to its failure class.
pub fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let (message, body_summary) = summarize_error_body(body);
    let detail = message.unwrap_or(body_summary);
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(detail),
        StatusCode::PAYMENT_REQUIRED => GenerationError::QuotaExhausted(detail),
        _ => GenerationError::Transport(format!("status {}: {}", status, detail)),
    }
}

/// Pulls the first generated image out of a 2xx response body.
pub fn extract_image(value: &Value) -> Result<ImageData, GenerationError> {
    if value.get("error").is_some_and(|error| !error.is_null()) {
        let message = error_message(value).unwrap_or_else(|| "Unknown error".to_string());
        return Err(GenerationError::Domain(message));
    }

    value
        .pointer("/choices/0/message/images/0/image_url/url")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(ImageData::new)
        .ok_or(GenerationError::EmptyResult)
}

pub fn build_message_content(text: &str, images: &[&ImageData]) -> Vec<Value> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(json!({
        "type": "text",
        "text": text
    }));
    for image in images {
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": image.as_str() }
        }));
    }
    parts
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        high_quality_model: impl Into<String>,
        fast_model: impl Into<String>,
    ) -> Self {
        GatewayClient {
            client: get_http_client().clone(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            high_quality_model: high_quality_model.into(),
            fast_model: fast_model.into(),
        }
    }

    pub fn from_config() -> anyhow::Result<Self> {
        let api_key = CONFIG.require_gateway_key()?;
        Ok(GatewayClient::new(
            CONFIG.gateway_base_url.clone(),
            api_key,
            CONFIG.high_quality_model.clone(),
            CONFIG.fast_model.clone(),
        ))
    }

    pub fn model_id(&self, choice: ModelChoice) -> &str {
        match choice {
            ModelChoice::HighQuality => &self.high_quality_model,
            ModelChoice::Fast => &self.fast_model,
        }
    }

    fn redact(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    pub fn build_payload(&self, model: &str, content: Vec<Value>) -> Value {
        json!({
            "model": model,
            "messages": [{ "role": "user", "content": content }],
            "modalities": ["image", "text"],
        })
    }

    async fn call_gateway(&self, payload: &Value) -> Result<ImageData, GenerationError> {
        debug!(target: "llm.gateway", "Gateway request: {}", summarize_payload(payload));

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact(&err.to_string());
                warn!(
                    "Gateway request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                GenerationError::Transport(err_text)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Gateway API error: status={}, body={}",
                status,
                truncate_for_log(&body, 2000)
            );
            return Err(classify_status(status, &body));
        }

        let value = response.json::<Value>().await.map_err(|err| {
            warn!("Gateway response was not valid JSON: {}", err);
            GenerationError::Transport(format!("malformed response: {}", err))
        })?;

        extract_image(&value).inspect_err(|err| {
            warn!("Gateway returned no usable image: {}", err);
        })
    }
}

impl ImageService for GatewayClient {
    async fn generate_image(
        &self,
        request: &GenerationRequest,
    ) -> Result<ImageResponse, GenerationError> {
        let model = self.model_id(request.model).to_string();
        let images: Vec<&ImageData> = request.reference_images.iter().collect();
        let payload = self.build_payload(&model, build_message_content(&request.prompt, &images));
        let metadata = json!({ "references": request.reference_images.len() });

        log_llm_timing(PROVIDER, &model, "generate_image", Some(metadata), || async {
            self.call_gateway(&payload).await
        })
        .await
        .map(|image_url| ImageResponse { image_url })
    }

    async fn retouch_image(
        &self,
        request: &RetouchRequest,
    ) -> Result<ImageResponse, GenerationError> {
        let model = self.model_id(ModelChoice::HighQuality).to_string();
        let mut images = vec![&request.image_data];
        images.extend(request.mask_data.as_ref());
        let instruction = retouch_instruction(request.mask_data.is_some());
        let payload = self.build_payload(&model, build_message_content(instruction, &images));
        let metadata = json!({ "masked": request.mask_data.is_some() });

        log_llm_timing(PROVIDER, &model, "retouch_image", Some(metadata), || async {
            self.call_gateway(&payload).await
        })
        .await
        .map(|image_url| ImageResponse { image_url })
    }
}
