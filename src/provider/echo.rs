use super::{Completion, CompletionParams, Provider, TokenUsage};
use crate::error::Result;

/// Returns the prompt unchanged. Useful for checking rendered prompts.
#[derive(Debug, Clone)]
pub struct EchoProvider {
    id: String,
}

impl EchoProvider {
    pub fn new(model: Option<&str>) -> Self {
        let id = match model {
            Some(model) => format!("echo:{model}"),
            None => "echo".to_string(),
        };
        Self { id }
    }
}

impl Provider for EchoProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn complete(&self, prompt: &str, _params: &CompletionParams) -> Result<Completion> {
        Ok(Completion {
            text: prompt.to_string(),
            usage: TokenUsage::estimate(prompt, prompt),
        })
    }
}
