//! OpenAI-compatible service clients behind the pipeline's three seams:
//! SQL generation, answer synthesis and embeddings.

use crate::config::ServiceConfig;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tabletalk_engine::{prompt, AnswerSynthesizer, CandidateSchema, EngineError, SqlGenerator};
use tabletalk_retriever::{Embedder, RetrieveError};
use tabletalk_store::QueryResult;
use tracing::debug;

fn service_client(service: &ServiceConfig) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new()
        .with_api_base(service.base_url.clone())
        .with_api_key(service.api_key.clone());
    Client::with_config(config)
}

/// Chat client used for both LLM steps. The two trait impls share one
/// connection but stay independently mockable at the trait seams.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(service: &ServiceConfig) -> Self {
        Self {
            client: service_client(service),
            model: service.model.clone(),
            timeout: service.timeout,
        }
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| e.to_string())?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| e.to_string())?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| format!("request timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| "model returned no content".to_string())
    }

    /// One trivial completion at startup, so a dead or misconfigured service
    /// fails before any data work happens.
    pub async fn verify_connectivity(&self) -> Result<(), EngineError> {
        let reply = self
            .complete(
                "You are a helpful assistant.",
                "What is the capital of France?".to_string(),
            )
            .await
            .map_err(EngineError::Service)?;
        debug!(%reply, "language model service reachable");
        Ok(())
    }
}

#[async_trait]
impl SqlGenerator for LlmClient {
    async fn generate_sql(
        &self,
        question: &str,
        candidates: &[CandidateSchema],
    ) -> Result<String, EngineError> {
        self.complete(
            prompt::SQL_SYSTEM_PROMPT,
            prompt::sql_generation_prompt(question, candidates),
        )
        .await
        .map_err(EngineError::Service)
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmClient {
    async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        rows: &QueryResult,
    ) -> Result<String, EngineError> {
        self.complete(
            prompt::ANSWER_SYSTEM_PROMPT,
            prompt::answer_synthesis_prompt(question, sql, rows),
        )
        .await
        .map_err(EngineError::Service)
    }
}

/// Embedding client for the retriever.
pub struct ApiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl ApiEmbedder {
    pub fn new(service: &ServiceConfig) -> Self {
        Self {
            client: service_client(service),
            model: service.embedding_model.clone(),
            timeout: service.timeout,
        }
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, RetrieveError> {
        let expected = input.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(input)
            .build()
            .map_err(|e| RetrieveError::Service(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                RetrieveError::Service(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| RetrieveError::Service(e.to_string()))?;

        if response.data.len() != expected {
            return Err(RetrieveError::Service(format!(
                "embedding service returned {} vectors for {} inputs",
                response.data.len(),
                expected
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrieveError> {
        let mut vectors = self.request(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RetrieveError::Service("embedding service returned no vectors".to_string()))
    }

    /// The whole catalog goes up in one request instead of one per table.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrieveError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.to_vec()).await
    }
}
