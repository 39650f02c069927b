use super::{Completion, CompletionParams, Provider, TokenUsage};
use crate::error::Result;

const DEFAULT_RESPONSE: &str = "This is a mock response for testing purposes.";

/// Deterministic canned answers for demos and tests.
///
/// A `country` variable selects a capital-city answer; everything else gets
/// a fixed sentence.
#[derive(Debug, Clone)]
pub struct MockProvider {
    id: String,
}

impl MockProvider {
    pub fn new(model: Option<&str>) -> Self {
        let id = match model {
            Some(model) => format!("mock:{model}"),
            None => "mock".to_string(),
        };
        Self { id }
    }

    fn respond(params: &CompletionParams) -> String {
        match params.vars.get("country").and_then(|v| v.as_str()) {
            Some("France") => "The capital of France is Paris.".to_string(),
            Some("Japan") => "The capital of Japan is Tokyo.".to_string(),
            Some(country) => format!("The capital of {country} is [capital city name]."),
            None => DEFAULT_RESPONSE.to_string(),
        }
    }
}

impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        let text = Self::respond(params);
        let usage = TokenUsage::estimate(prompt, &text);
        Ok(Completion { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Variables;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Some("France"), "The capital of France is Paris.")]
    #[case(Some("Japan"), "The capital of Japan is Tokyo.")]
    #[case(Some("Peru"), "The capital of Peru is [capital city name].")]
    #[case(None, "This is a mock response for testing purposes.")]
    fn test_responses(#[case] country: Option<&str>, #[case] expected: &str) {
        let mut vars = Variables::new();
        if let Some(country) = country {
            vars.insert("country".into(), json!(country));
        }
        let params = CompletionParams::default().with_vars(vars);

        let completion = MockProvider::new(None)
            .complete("What is the capital?", &params)
            .unwrap();
        assert_eq!(completion.text, expected);
        assert_eq!(completion.usage.prompt, 4);
        assert_eq!(
            completion.usage.total,
            completion.usage.prompt + completion.usage.completion
        );
    }
}
