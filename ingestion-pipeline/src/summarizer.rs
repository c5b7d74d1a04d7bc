use std::sync::Arc;

use common::{error::AppError, utils::llm::CompletionClient};
use tracing::debug;

use crate::utils::{
    code_fence::strip_code_fences,
    llm_instructions::{SUMMARY_INSTRUCTIONS, SUMMARY_PREAMBLE, SUMMARY_SYSTEM_MESSAGE},
    prompt::PromptTemplate,
};

/// Turns a chunk of study text into an HTML summary fragment.
pub struct Summarizer {
    client: Arc<dyn CompletionClient>,
    template: PromptTemplate,
}

impl Summarizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            template: Self::default_template(),
        }
    }

    pub fn default_template() -> PromptTemplate {
        PromptTemplate::new(SUMMARY_SYSTEM_MESSAGE)
            .preamble(SUMMARY_PREAMBLE)
            .instructions(SUMMARY_INSTRUCTIONS)
            .input_label("Text to summarize")
    }

    /// One completion call. Errors from the client are returned as-is.
    ///
    /// The HTML is not validated; only a wrapping code fence is removed.
    pub async fn summarize(&self, text: &str) -> Result<String, AppError> {
        let raw = self.client.complete(self.template.render(text)).await?;
        let html = strip_code_fences(&raw).to_string();

        debug!(
            input_chars = text.chars().count(),
            summary_chars = html.chars().count(),
            "chunk summarized"
        );

        Ok(html)
    }
}
