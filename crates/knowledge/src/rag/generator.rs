//! Answer synthesis with a generative model.
//!
//! `generate` never fails: transport errors, timeouts, bad statuses and
//! malformed or empty responses are logged and turned into a fallback answer
//! that starts with [`FALLBACK_MARKER`].

use crate::rag::prompt::PromptTemplate;
use medrag_core::config::GenerationConfig;
use medrag_core::{AppError, AppResult};
use medrag_llm::{LlmClient, LlmRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed prefix of every fallback answer.
pub const FALLBACK_MARKER: &str = "[generation-unavailable]";

/// The user-facing fallback answer.
pub fn fallback_answer() -> String {
    format!(
        "{} The answer could not be generated right now. Please try again later.",
        FALLBACK_MARKER
    )
}

/// Whether an answer is the degraded-mode fallback.
pub fn is_fallback(answer: &str) -> bool {
    answer.starts_with(FALLBACK_MARKER)
}

/// Decoding parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// Builds the prompt and calls the generative model.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    template: PromptTemplate,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        template: PromptTemplate,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            template,
            settings,
        }
    }

    /// Generator for the configured template, language and decoding parameters.
    pub fn from_config(config: &GenerationConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let template = match config.prompt_template.as_deref() {
            Some(custom) => PromptTemplate::new(custom, config.language.clone())?,
            None => PromptTemplate::default_for(config.language.clone())?,
        };

        Ok(Self::new(client, template, GenerationSettings::from(config)))
    }

    /// Override the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Answer `question` from `context`, or return the fallback answer.
    pub async fn generate(&self, question: &str, context: &[String]) -> String {
        match self.try_generate(question, context).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(
                    provider = %self.client.provider_name(),
                    model = %self.settings.model,
                    error = %e,
                    "Answer generation failed, returning fallback"
                );
                fallback_answer()
            }
        }
    }

    /// Answer `question` from `context`, reporting failures as `Generation` errors.
    pub async fn try_generate(&self, question: &str, context: &[String]) -> AppResult<String> {
        let start = Instant::now();
        let prompt = self.template.render(question, context)?;

        let request = LlmRequest::new(prompt, self.settings.model.clone())
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p)
            .with_max_tokens(self.settings.max_output_tokens);

        let response = tokio::time::timeout(self.settings.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Generation(format!(
                    "no response within {}s",
                    self.settings.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| AppError::Generation(e.to_string()))?;

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::Generation("model returned an empty answer".to_string()));
        }

        tracing::info!(
            provider = %self.client.provider_name(),
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated answer"
        );

        Ok(answer)
    }
}
