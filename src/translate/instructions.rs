//! Translation instruction templates.
//!
//! The instructions sent alongside the text are rendered from a small
//! template language:
//!
//! - `{{language}}`, `{{tone}}`, `{{additional_instructions}}` are substituted;
//! - `{{#if additional_instructions}} ... {{/if}}` is kept only when
//!   additional instructions are non-blank.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// The instruction format used when no custom format is configured.
pub const DEFAULT_INSTRUCTION_FORMAT: &str = "You are a professional translator, please translate the text given to you following the below instructions. Do not use quotations or say anything else aside from the translation in your response.
Language: {{language}}
Tone: {{tone}}
{{#if additional_instructions}}
Additional instructions:
{{additional_instructions}}
{{/if}}";

fn conditional_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\{\{#if additional_instructions\}\}\n?(.*?)\{\{/if\}\}")
            .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
    })
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{(language|tone|additional_instructions)\}\}")
            .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
    })
}

/// A format string for translation instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    format: String,
}

impl Default for InstructionTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTION_FORMAT)
    }
}

impl InstructionTemplate {
    /// Creates a template from a custom format.
    #[must_use]
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Returns the raw format string.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Renders the instructions for one request.
    #[must_use]
    pub fn render(&self, language: &str, tone: &str, additional: Option<&str>) -> String {
        let additional = additional.map(str::trim).filter(|s| !s.is_empty());

        let with_blocks = conditional_block().replace_all(&self.format, |caps: &Captures| {
            if additional.is_some() {
                caps[1].to_string()
            } else {
                String::new()
            }
        });

        let rendered = placeholder().replace_all(&with_blocks, |caps: &Captures| {
            match &caps[1] {
                "language" => language.to_string(),
                "tone" => tone.to_string(),
                _ => additional.unwrap_or_default().to_string(),
            }
        });

        rendered.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_without_additional_instructions() {
        let rendered = InstructionTemplate::default().render("Spanish", "Formal", None);

        assert!(rendered.ends_with("Language: Spanish\nTone: Formal"));
        assert!(!rendered.contains("Additional instructions"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn default_format_with_additional_instructions() {
        let rendered =
            InstructionTemplate::default().render("French", "Casual", Some("Keep names as-is"));

        assert!(rendered.ends_with(
            "Language: French\nTone: Casual\nAdditional instructions:\nKeep names as-is"
        ));
    }

    #[test]
    fn blank_additional_instructions_count_as_absent() {
        let rendered = InstructionTemplate::default().render("German", "Polite", Some("   "));
        assert!(!rendered.contains("Additional instructions"));
    }

    #[test]
    fn custom_format_is_used() {
        let template = InstructionTemplate::new("Translate to {{language}} ({{tone}}).");
        assert_eq!(
            template.render("Japanese", "Polite", None),
            "Translate to Japanese (Polite)."
        );
    }

    #[test]
    fn substituted_values_are_not_reexpanded() {
        let template = InstructionTemplate::new("{{language}}|{{additional_instructions}}");
        assert_eq!(
            template.render("$1 {{tone}}", "x", Some("{{language}}")),
            "$1 {{tone}}|{{language}}"
        );
    }
}
