use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::provider::ProviderError;
use super::task::InferenceTask;
use crate::config::InferenceConfig;

/// One candidate from an image-classification call.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f64,
}

/// Boundary to the external model-hosting API. Implementations return the
/// provider failure untouched; classification into user-facing errors happens
/// later.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn classify_image(
        &self,
        model: &str,
        image: Bytes,
        content_type: &str,
    ) -> Result<Vec<ScoredLabel>, ProviderError>;

    /// Free-text generation via the given task; the reply is raw model text.
    async fn generate(
        &self,
        model: &str,
        task: InferenceTask,
        req: &GenerationRequest,
    ) -> Result<String, ProviderError>;
}

/// Hugging Face inference API over reqwest. Serverless model endpoints serve
/// classification and text-generation; chat completions go through the
/// OpenAI-compatible router.
pub struct HfClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
    chat_api_base: String,
}

impl HfClient {
    pub fn new(config: &InferenceConfig, token: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            chat_api_base: config.chat_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Turns a non-2xx reply into a ProviderError carrying the status and,
    /// when the body is JSON, the parsed body.
    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).ok();
        let message = match &body {
            Some(Value::Object(map)) => map
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| text.clone()),
            _ => text.clone(),
        };
        ProviderError::http(status, message, body)
    }

    async fn send(&self, url: &str, payload: Value) -> Result<Value, ProviderError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))
    }
}

#[async_trait]
impl InferenceClient for HfClient {
    async fn classify_image(
        &self,
        model: &str,
        image: Bytes,
        content_type: &str,
    ) -> Result<Vec<ScoredLabel>, ProviderError> {
        let url = format!("{}/models/{}", self.api_base, model);
        debug!(%model, bytes = image.len(), "image classification request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        response
            .json::<Vec<ScoredLabel>>()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))
    }

    async fn generate(
        &self,
        model: &str,
        task: InferenceTask,
        req: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        match task {
            InferenceTask::Generation => {
                let url = format!("{}/models/{}", self.api_base, model);
                let payload = json!({
                    "inputs": req.prompt,
                    "parameters": {
                        "max_new_tokens": req.max_new_tokens,
                        "temperature": req.temperature,
                        "return_full_text": false,
                    },
                });
                let body = self.send(&url, payload).await?;
                // Serverless replies are a one-element array of generations.
                let text = body
                    .get(0)
                    .and_then(|g| g.get("generated_text"))
                    .or_else(|| body.get("generated_text"))
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                Ok(text.to_string())
            }
            InferenceTask::Conversational => {
                let url = format!("{}/chat/completions", self.chat_api_base);
                let payload = json!({
                    "model": model,
                    "messages": [
                        {"role": "system", "content": req.system},
                        {"role": "user", "content": req.prompt},
                    ],
                    "max_tokens": req.max_new_tokens,
                    "temperature": req.temperature,
                });
                let body = self.send(&url, payload).await?;
                let text = body
                    .pointer("/choices/0/message/content")
                    .or_else(|| body.pointer("/choices/0/delta/content"))
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                Ok(text.to_string())
            }
        }
    }
}
