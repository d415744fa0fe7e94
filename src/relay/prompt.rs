//! Prompt assembly.

use crate::config::PromptConfig;

/// Wraps a user message in the instructional preamble.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    preamble: String,
    question_label: String,
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>, question_label: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
            question_label: question_label.into(),
        }
    }

    /// `"{preamble}\n\n{label}: {message}"`.
    pub fn render(&self, message: &str) -> String {
        format!("{}\n\n{}: {}", self.preamble, self.question_label, message)
    }
}

impl From<&PromptConfig> for PromptTemplate {
    fn from(config: &PromptConfig) -> Self {
        Self::new(config.preamble.clone(), config.question_label.clone())
    }
}
