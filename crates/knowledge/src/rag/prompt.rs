//! Answer prompt rendering.

use handlebars::Handlebars;
use medrag_core::{AppError, AppResult};
use serde::Serialize;

/// Built-in answer prompt.
///
/// Variables: `context` (passages joined by newlines), `question`, `language`.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Medical context:
{{context}}

Question: {{question}}

Answer (precise, sourced, in {{language}}):";

const TEMPLATE_NAME: &str = "answer";

#[derive(Serialize)]
struct PromptVars<'a> {
    context: String,
    question: &'a str,
    language: &'a str,
}

/// Compiled answer prompt.
pub struct PromptTemplate {
    handlebars: Handlebars<'static>,
    language: String,
}

impl PromptTemplate {
    /// Compile a template. Errors in the template are configuration errors.
    pub fn new(template: &str, language: impl Into<String>) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Medical text is plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Config(format!("Invalid prompt template: {}", e)))?;

        Ok(Self {
            handlebars,
            language: language.into(),
        })
    }

    /// The built-in template in the given answer language.
    pub fn default_for(language: impl Into<String>) -> AppResult<Self> {
        Self::new(DEFAULT_PROMPT_TEMPLATE, language)
    }

    /// Render the prompt; identical inputs always give identical output.
    pub fn render(&self, question: &str, context: &[String]) -> AppResult<String> {
        let vars = PromptVars {
            context: context.join("\n"),
            question,
            language: &self.language,
        };

        self.handlebars
            .render(TEMPLATE_NAME, &vars)
            .map_err(|e| AppError::Generation(format!("Failed to render prompt: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt() {
        let template = PromptTemplate::default_for("English").unwrap();
        let context = vec![
            "Diabetes: high blood sugar.".to_string(),
            "Flu: fever & cough.".to_string(),
        ];

        let prompt = template.render("What is <diabetes>?", &context).unwrap();

        assert_eq!(
            prompt,
            "Medical context:\nDiabetes: high blood sugar.\nFlu: fever & cough.\n\n\
             Question: What is <diabetes>?\n\nAnswer (precise, sourced, in English):"
        );
    }

    #[test]
    fn test_custom_template() {
        let template = PromptTemplate::new("{{language}}|{{question}}|{{context}}", "French").unwrap();
        let prompt = template.render("Q", &["a".to_string()]).unwrap();
        assert_eq!(prompt, "French|Q|a");
    }

    #[test]
    fn test_invalid_template() {
        let result = PromptTemplate::new("{{#if}}unclosed", "English");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
