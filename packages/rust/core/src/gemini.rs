//! Google Gemini `generateContent` backend.
//!
//! Plain REST with an API key in the query string. One user turn per request,
//! no system instruction, no streaming.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use seostudio_shared::{LlmConfig, Result, SeoStudioError};

use crate::model::{self, GenerateFuture, ModelBackend, ModelHandle, TextModel};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Constructs [`GeminiModel`]s sharing one HTTP client and key.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    /// Build a backend for `base_url` with an optional per-request timeout.
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SeoStudioError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Backend configured from the `[llm]` section.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            api_key,
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }
}

impl ModelBackend for GeminiBackend {
    fn construct(&self, model_id: &str) -> Result<Arc<dyn TextModel>> {
        if self.api_key.trim().is_empty() {
            return Err(SeoStudioError::config("Gemini API key is empty"));
        }

        let name = model_id.strip_prefix("models/").unwrap_or(model_id);
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        {
            return Err(SeoStudioError::config(format!(
                "invalid Gemini model identifier: {model_id:?}"
            )));
        }

        Ok(Arc::new(GeminiModel {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            endpoint: format!("{}/models/{name}:generateContent", self.base_url),
            model_id: name.to_string(),
        }))
    }
}

/// Resolve a Gemini-backed handle from the `[llm]` section.
pub fn resolve_gemini(config: &LlmConfig, api_key: impl Into<String>) -> Result<ModelHandle> {
    let backend = Arc::new(GeminiBackend::from_config(config, api_key)?);
    model::resolve(backend, &config.models, config.fallback)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One Gemini model bound to its endpoint.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiModel {
    #[instrument(skip_all, fields(model = %self.model_id, prompt_chars = prompt.chars().count()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| SeoStudioError::Generation(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeoStudioError::Generation(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SeoStudioError::Generation(format!("malformed response: {}", e.without_url())))?;

        let text = extract_text(payload)?;
        debug!(chars = text.chars().count(), "completion received");
        Ok(text)
    }
}

impl TextModel for GeminiModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt))
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(payload: GenerateContentResponse) -> Result<String> {
    if let Some(err) = payload.error {
        return Err(SeoStudioError::Generation(format!(
            "Gemini API error: {}",
            err.message
        )));
    }

    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SeoStudioError::Generation("no response from Gemini".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seostudio_shared::FallbackPolicy;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    #[tokio::test]
    async fn generate_posts_prompt_and_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-flash-latest:generateContent"))
            .and(query_param("key", "k-123"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Привет" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Первая часть. " }, { "text": "Вторая." }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("k-123", &server.uri(), None).unwrap();
        let model = backend.construct("gemini-flash-latest").unwrap();
        let text = model.generate("Привет").await.unwrap();
        assert_eq!(text, "Первая часть. Вторая.");
    }

    #[tokio::test]
    async fn http_error_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("k", &server.uri(), None).unwrap();
        let model = backend.construct("gemini-pro").unwrap();
        let err = model.generate("x").await.unwrap_err();
        match err {
            SeoStudioError::Generation(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("RESOURCE_EXHAUSTED"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("k", &server.uri(), None).unwrap();
        let model = backend.construct("gemini-pro").unwrap();
        assert!(matches!(
            model.generate("x").await,
            Err(SeoStudioError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn timeout_applies_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let backend =
            GeminiBackend::new("k", &server.uri(), Some(Duration::from_millis(100))).unwrap();
        let model = backend.construct("gemini-pro").unwrap();
        assert!(matches!(
            model.generate("x").await,
            Err(SeoStudioError::Generation(_))
        ));
    }

    #[test]
    fn construct_rejects_bad_identifiers_and_missing_key() {
        let backend = GeminiBackend::new("k", "http://localhost", None).unwrap();
        assert!(backend.construct("").is_err());
        assert!(backend.construct("gemini pro").is_err());
        assert!(backend.construct("models/gemini-1.5-flash").is_ok());

        let keyless = GeminiBackend::new("  ", "http://localhost", None).unwrap();
        assert!(keyless.construct("gemini-pro").is_err());
    }

    #[tokio::test]
    async fn resolve_gemini_falls_through_invalid_identifiers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: server.uri(),
            models: vec!["bad id".into(), "gemini-1.5-flash".into(), "gemini-pro".into()],
            fallback: FallbackPolicy::Pinned,
            ..Default::default()
        };
        let handle = resolve_gemini(&config, "k").unwrap();
        assert_eq!(handle.model_id(), "gemini-1.5-flash");
        assert_eq!(handle.generate("x").await.unwrap(), "ok");
    }
}
