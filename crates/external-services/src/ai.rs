//! AI provider abstraction: structured `{confidence_score, reasoning}` chat
//! completion, per spec.md §6.3. `AiProviderChain` implements the "try
//! primary, on any error try fallback, else none" discipline from §4.3.6.
//!
//! The hourly quota counter and 24h content-hash cache are NOT here: they are
//! process-wide admission-control state owned by the confidence scorer
//! (spec.md §6.2 `ai_usage_tracking` / `ai_analysis_cache`), not a concern of
//! the provider client itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the AI prompt needs about the candidate report and its
/// surroundings, assembled by the report service before calling enhance.
#[derive(Debug, Clone, Serialize)]
pub struct AiPromptContext {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub disaster_type: String,
    pub location_text: Option<String>,
    pub same_type_official_count: usize,
    pub nearest_official_distance_mi: Option<f64>,
    pub same_type_user_report_count: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiResult {
    pub score: f64,
    pub reasoning: String,
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("ai provider request failed: {0}")]
    RequestFailed(String),
    #[error("ai provider returned an unparsable response: {0}")]
    BadResponse(String),
    #[error("no ai provider configured")]
    NotConfigured,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn analyze(&self, ctx: &AiPromptContext) -> Result<AiResult, AiError>;
}

/// Tries `primary`, falls back to `fallback` on any error, returns `None`
/// (not an error) if both fail — matching spec.md §4.3.6's "if both fail,
/// return none" so the caller can fall back to the heuristic score.
pub struct AiProviderChain {
    pub primary: Option<Box<dyn AiProvider>>,
    pub fallback: Option<Box<dyn AiProvider>>,
}

impl AiProviderChain {
    pub fn new(primary: Option<Box<dyn AiProvider>>, fallback: Option<Box<dyn AiProvider>>) -> Self {
        Self { primary, fallback }
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    pub async fn analyze(&self, ctx: &AiPromptContext) -> Option<(AiResult, &'static str)> {
        if let Some(primary) = &self.primary {
            match primary.analyze(ctx).await {
                Ok(result) => return Some((result, primary.name())),
                Err(e) => tracing::warn!(provider = primary.name(), error = %e, "primary AI provider failed, trying fallback"),
            }
        }
        if let Some(fallback) = &self.fallback {
            match fallback.analyze(ctx).await {
                Ok(result) => return Some((result, fallback.name())),
                Err(e) => tracing::warn!(provider = fallback.name(), error = %e, "fallback AI provider failed"),
            }
        }
        None
    }
}

/// OpenAI-compatible chat-completion client requesting a structured JSON
/// response. Works against any endpoint speaking the OpenAI chat API shape
/// (OpenAI itself, or a compatible gateway).
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    name: &'static str,
}

impl OpenAiCompatibleProvider {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            name: "openai",
        }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            name: "gemini",
        }
    }

    fn prompt(ctx: &AiPromptContext) -> String {
        format!(
            "Assess the credibility of this {} report. Location: {}. \
             Nearby official sources of the same type: {} (nearest {} mi). \
             Other user reports of the same type nearby: {}. \
             Description: {}. Image: {}. \
             Respond with a JSON object {{\"confidence_score\": number between 0 and 1, \"reasoning\": string}}.",
            ctx.disaster_type,
            ctx.location_text.as_deref().unwrap_or("unknown"),
            ctx.same_type_official_count,
            ctx.nearest_official_distance_mi.map(|d| format!("{d:.1}")).unwrap_or_else(|| "n/a".into()),
            ctx.same_type_user_report_count,
            ctx.description.as_deref().unwrap_or("none"),
            ctx.image_url.as_deref().unwrap_or("none"),
        )
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct StructuredAiOutput {
    confidence_score: f64,
    reasoning: String,
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn analyze(&self, ctx: &AiPromptContext) -> Result<AiResult, AiError> {
        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": "You are a disaster-report credibility analyst. Reply with JSON only." },
                { "role": "user", "content": Self::prompt(ctx) },
            ],
        });

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AiError::RequestFailed(format!("status {}", resp.status())));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| AiError::BadResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::BadResponse("empty choices".into()))?
            .message
            .content;

        let structured: StructuredAiOutput =
            serde_json::from_str(&content).map_err(|e| AiError::BadResponse(e.to_string()))?;

        Ok(AiResult {
            score: structured.confidence_score.clamp(0.0, 1.0),
            reasoning: structured.reasoning,
        })
    }
}
