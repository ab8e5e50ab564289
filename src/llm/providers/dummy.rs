//! Dummy LLM provider: answers every prompt with one canned recommendation
//! laid out in the list template. Lets the console channel run end to end
//! without an API key.

use crate::llm::ProviderError;

const CANNED_ANSWER: &str = "Title: The Matrix
Year: 1999
Genre: Action, Sci-Fi
Rating: 8.7
Why: [dummy] canned answer, configure a real provider for live suggestions.";

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(CANNED_ANSWER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseStrategy;
    use crate::subsystems::recommend::parse;

    #[tokio::test]
    async fn answer_is_independent_of_prompt() {
        let p = DummyProvider;
        assert_eq!(p.complete("hello").await.unwrap(), p.complete("").await.unwrap());
    }

    #[tokio::test]
    async fn answer_parses_as_one_template_entry() {
        let text = DummyProvider.complete("anything").await.unwrap();
        let outcome = parse::parse(ParseStrategy::Template, &text);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].title, "The Matrix");
        assert_eq!(outcome.unparsed, 0);
    }
}
