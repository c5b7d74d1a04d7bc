use std::{sync::Arc, time::Duration};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::{error::AppError, utils::config::AppConfig};

/// A single system + user exchange sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Chat completion capability the ingestion adapters depend on.
///
/// Implementations return the raw text of the first choice. They may be slow and
/// the text may not follow the requested format.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;
}

pub struct OpenAiCompletionClient {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
}

impl OpenAiCompletionClient {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let client = Arc::new(Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));

        Self::new(
            client,
            config.processing_model.clone(),
            Duration::from_secs(config.llm_timeout_secs),
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        let CompletionRequest { system, user } = request;
        let user_chars = user.chars().count();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(system.as_str()).into(),
                ChatCompletionRequestUserMessage::from(user).into(),
            ])
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::LlmTimeout(self.timeout.as_secs()))??;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LLMParsing("No content found in LLM response".into()))?;

        debug!(
            model = %self.model,
            user_chars,
            response_chars = content.chars().count(),
            "completion received"
        );

        Ok(content)
    }
}
