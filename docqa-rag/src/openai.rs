//! OpenAI-compatible embedding and chat-completion providers.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! providers speak the OpenAI REST dialect, so they also work against any
//! compatible server (Groq, a local sentence-transformers endpoint, ...).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::Embedding;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The OpenAI-compatible base URL of the Groq API.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// The default chat model on Groq.
const DEFAULT_GROQ_MODEL: &str = "compound-beta-mini";

/// The default chat model on OpenAI.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Instructions sent with every chat request.
const SYSTEM_PROMPT: &str = "You answer questions about the user's documents. \
Use only the context provided with the question. If the context does not contain \
the answer, say that you don't know instead of guessing.";

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Join an API path onto a base URL that may or may not carry a version.
fn endpoint(base_url: &str, path: &str) -> String {
    let base = trim_base_url(base_url);
    if base.ends_with(&format!("/{path}")) {
        return base;
    }
    if has_version_suffix(&base) {
        return format!("{base}/{path}");
    }
    format!("{base}/v1/{path}")
}

fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() { format!("request timed out: {e}") } else { format!("request failed: {e}") }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read a non-success response body into a human-readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – defaults to 1536; [`with_dimensions`](Self::with_dimensions)
///   also asks the API to truncate (Matryoshka models).
/// - `base_url` – defaults to the OpenAI API.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?
///     .with_base_url("http://localhost:8080/v1")
///     .with_model("sentence-transformers/all-MiniLM-L6-v2", 384);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingUnavailable {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::EmbeddingUnavailable {
                provider: "OpenAI".into(),
                message: "OPENAI_API_KEY environment variable not set".into(),
            }
        })?;
        Self::new(api_key)
    }

    /// Point the provider at another OpenAI-compatible server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(&url.into());
        self
    }

    /// Set the model name and the dimensionality it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self.request_dimensions = None;
        self
    }

    /// Request truncated output dimensions (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)
            .map_err(|e| self.unavailable(format!("failed to build HTTP client: {e}")))?;
        self.client = client;
        Ok(self)
    }

    fn unavailable(&self, message: String) -> RagError {
        RagError::EmbeddingUnavailable { provider: "OpenAI".into(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    /// Vectors in input order. Some servers do not preserve it; `index`
    /// restores it, and entries without one keep their position at the end.
    fn into_ordered_embeddings(mut self) -> Vec<Embedding> {
        self.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.unavailable("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "OpenAI", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "embedding request failed");
                self.unavailable(describe_request_error(&e))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "OpenAI", %message, "embedding API error");
            return Err(self.unavailable(message));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse embedding response");
            self.unavailable(format!("failed to parse response: {e}"))
        })?;

        Ok(embedding_response.into_ordered_embeddings())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`GenerationProvider`] backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// The context block and question are sent as a single user message after a
/// fixed system prompt telling the model to answer only from the context.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIChatProvider;
///
/// let llm = OpenAIChatProvider::groq_from_env()?;
/// let answer = llm.generate(&context, "What is the refund policy?").await?;
/// ```
pub struct OpenAIChatProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    provider: String,
}

impl OpenAIChatProvider {
    /// Create a provider for the OpenAI API with the given key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::compatible(api_key, OPENAI_BASE_URL, DEFAULT_CHAT_MODEL)
    }

    /// Create a provider for any OpenAI-compatible server.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::GenerationUnavailable {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: trim_base_url(&base_url.into()),
            model: model.into(),
            temperature: 0.0,
            provider: "OpenAI".into(),
        })
    }

    /// Create a provider for Groq using `compound-beta-mini`.
    pub fn groq(api_key: impl Into<String>) -> Result<Self> {
        let mut provider = Self::compatible(api_key, GROQ_BASE_URL, DEFAULT_GROQ_MODEL)?;
        provider.provider = "Groq".into();
        Ok(provider)
    }

    /// Create an OpenAI provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(Self::env_key("OPENAI_API_KEY", "OpenAI")?)
    }

    /// Create a Groq provider using the `GROQ_API_KEY` environment variable.
    pub fn groq_from_env() -> Result<Self> {
        Self::groq(Self::env_key("GROQ_API_KEY", "Groq")?)
    }

    fn env_key(var: &str, provider: &str) -> Result<String> {
        std::env::var(var).map_err(|_| RagError::GenerationUnavailable {
            provider: provider.into(),
            message: format!("{var} environment variable not set"),
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature (defaults to 0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)
            .map_err(|e| self.unavailable(format!("failed to build HTTP client: {e}")))?;
        self.client = client;
        Ok(self)
    }

    fn unavailable(&self, message: String) -> RagError {
        RagError::GenerationUnavailable { provider: self.provider.clone(), message }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Lay out the user message from the context block and the question.
fn user_message(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

#[async_trait]
impl GenerationProvider for OpenAIChatProvider {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            context_len = context.len(),
            "requesting chat completion"
        );

        let user_content = user_message(context, question);
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user_content },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.provider, error = %e, "chat request failed");
                self.unavailable(describe_request_error(&e))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = %self.provider, %message, "chat API error");
            return Err(self.unavailable(message));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "failed to parse chat response");
            self.unavailable(format!("failed to parse response: {e}"))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.unavailable("API returned no answer".into()))
    }

    fn name(&self) -> &str {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_versioned_and_bare_base_urls() {
        assert_eq!(endpoint(OPENAI_BASE_URL, "embeddings"), "https://api.openai.com/v1/embeddings");
        assert_eq!(endpoint("http://localhost:8080/", "embeddings"), "http://localhost:8080/v1/embeddings");
        assert_eq!(
            endpoint(GROQ_BASE_URL, "chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://host/v1/chat/completions", "chat/completions"),
            "http://host/v1/chat/completions"
        );
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new(""),
            Err(RagError::EmbeddingUnavailable { .. })
        ));
        assert!(matches!(OpenAIChatProvider::groq(""), Err(RagError::GenerationUnavailable { .. })));
    }

    #[test]
    fn model_override_sets_dimensions_without_truncation() {
        let provider = OpenAIEmbeddingProvider::new("key")
            .unwrap()
            .with_model("sentence-transformers/all-MiniLM-L6-v2", 384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.request_dimensions, None);
    }

    #[test]
    fn groq_preset_uses_groq_defaults() {
        let provider = OpenAIChatProvider::groq("key").unwrap();
        assert_eq!(provider.name(), "Groq");
        assert_eq!(provider.model, "compound-beta-mini");
        assert_eq!(provider.temperature, 0.0);
    }

    #[test]
    fn chat_request_serializes_system_and_user_messages() {
        let user = user_message("ctx", "why?");
        let request = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user },
            ],
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][1]["content"], "Context:\nctx\n\nQuestion: why?");
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn embedding_response_is_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":2,"embedding":[3.0]},{"embedding":[9.0]},{"index":0,"embedding":[1.0]},{"index":1,"embedding":[2.0]}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_ordered_embeddings(),
            vec![vec![1.0], vec![2.0], vec![3.0], vec![9.0]]
        );
    }
}
