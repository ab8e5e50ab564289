//! Prompt templates for the recommendation generator.
//!
//! Templates are plain text with `{{key}}` variables. The files under
//! `config/prompts/` are compiled in as defaults; a file of the same name in
//! the configured `prompts_dir` replaces the built-in one at runtime.
//!
//! Substitution is a single pass over the template, so a value that itself
//! contains `{{...}}` (user text included) is inserted verbatim.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ParseStrategy, RecommendConfig, RecommendMode};

const LIST_TEMPLATE: &str = include_str!("../../../config/prompts/recommend_list.txt");
const NUMBERED_TEMPLATE: &str = include_str!("../../../config/prompts/recommend_numbered.txt");
const SINGLE_TEMPLATE: &str = include_str!("../../../config/prompts/recommend_single.txt");
const LOOKUP_TEMPLATE: &str = include_str!("../../../config/prompts/recommend_lookup.txt");

/// Builds one prompt from a template and a set of variables.
///
/// ```rust,ignore
/// let prompt = PromptBuilder::new(Some(Path::new("config/prompts")))
///     .template("recommend_list.txt", LIST_TEMPLATE)
///     .var("query", "Heat")
///     .var("count", "5")
///     .build();
/// ```
pub struct PromptBuilder {
    prompts_dir: Option<PathBuf>,
    template: String,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new(prompts_dir: Option<&Path>) -> Self {
        Self {
            prompts_dir: prompts_dir.map(Path::to_path_buf),
            template: String::new(),
            vars: HashMap::new(),
        }
    }

    /// Use `filename` from the prompts directory, or `builtin` when the
    /// directory is unset or the file is missing or blank.
    pub fn template(mut self, filename: &str, builtin: &str) -> Self {
        let loaded = self.prompts_dir.as_ref().and_then(|dir| {
            let path = dir.join(filename);
            match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => Some(text),
                _ => {
                    tracing::debug!("prompt: '{}' not found, using built-in", path.display());
                    None
                }
            }
        });
        self.template = loaded.unwrap_or_else(|| builtin.to_string()).trim().to_string();
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Substitute variables. Unknown `{{keys}}` are left as written.
    pub fn build(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            match self.vars.get(after[..end].trim()) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// The generator prompt for `query` under the configured mode and parser.
pub fn recommendation_prompt(settings: &RecommendConfig, query: &str) -> String {
    let (filename, builtin) = match (settings.mode, settings.parser) {
        (RecommendMode::Single, _) => ("recommend_single.txt", SINGLE_TEMPLATE),
        (RecommendMode::Lookup, _) => ("recommend_lookup.txt", LOOKUP_TEMPLATE),
        (RecommendMode::List, ParseStrategy::Numbered) => ("recommend_numbered.txt", NUMBERED_TEMPLATE),
        (RecommendMode::List, _) => ("recommend_list.txt", LIST_TEMPLATE),
    };

    PromptBuilder::new(settings.prompts_dir.as_deref())
        .template(filename, builtin)
        .var("query", query)
        .var("count", settings.count.to_string())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: RecommendMode) -> RecommendConfig {
        RecommendConfig { mode, ..RecommendConfig::default() }
    }

    #[test]
    fn list_prompt_embeds_query_and_count() {
        let p = recommendation_prompt(&settings(RecommendMode::List), "The Godfather");
        assert!(p.contains("\"The Godfather\""));
        assert!(p.contains("Recommend 5 movies"));
        assert!(p.contains("Title: <movie title>"));
        assert!(!p.contains("{{"));
    }

    #[test]
    fn single_prompt_asks_for_details() {
        let p = recommendation_prompt(&settings(RecommendMode::Single), "Alien");
        assert!(p.starts_with("Recommend a movie similar to Alien and provide its name"));
    }

    #[test]
    fn numbered_parser_gets_numbered_prompt() {
        let s = RecommendConfig { parser: ParseStrategy::Numbered, count: 3, ..RecommendConfig::default() };
        let p = recommendation_prompt(&s, "Heat");
        assert!(p.contains("numbered list"));
        assert!(p.contains("Recommend 3 movies"));
    }

    #[test]
    fn user_text_is_not_re_expanded() {
        let p = recommendation_prompt(&settings(RecommendMode::List), "{{count}} & {{query}}");
        assert!(p.contains("\"{{count}} & {{query}}\""));
    }

    #[test]
    fn unknown_and_unclosed_placeholders_survive() {
        let p = PromptBuilder::new(None).template("x.txt", "a {{nope}} b {{open").var("x", "1").build();
        assert_eq!(p, "a {{nope}} b {{open");
    }

    #[test]
    fn prompts_dir_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("recommend_list.txt"), "Films like {{query}}, {{count}} please").unwrap();
        let s = RecommendConfig { prompts_dir: Some(dir.path().to_path_buf()), ..RecommendConfig::default() };
        assert_eq!(recommendation_prompt(&s, "Heat"), "Films like Heat, 5 please");
    }

    #[test]
    fn missing_override_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let s = RecommendConfig { prompts_dir: Some(dir.path().to_path_buf()), ..RecommendConfig::default() };
        assert!(recommendation_prompt(&s, "Heat").contains("Why: <one sentence"));
    }
}
