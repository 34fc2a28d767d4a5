//! TranslatorAgent: a fixed English phrase book for Spanish, French and German.

use crate::a2a::agent_card::{AgentCard, Skill};
use crate::a2a::handler::AgentHandler;
use crate::a2a::orchestrator::TRANSLATOR_AGENT;
use crate::a2a::types::TaskMessage;
use async_trait::async_trait;
use serde_json::json;

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["spanish", "french", "german"];

/// English phrase → translations in `SUPPORTED_LANGUAGES` order.
const PHRASE_BOOK: [(&str, [&str; 3]); 8] = [
    ("hello", ["hola", "bonjour", "hallo"]),
    ("goodbye", ["adiós", "au revoir", "auf wiedersehen"]),
    ("thank you", ["gracias", "merci", "danke"]),
    ("yes", ["sí", "oui", "ja"]),
    ("no", ["no", "non", "nein"]),
    ("please", ["por favor", "s'il vous plaît", "bitte"]),
    ("good morning", ["buenos días", "bonjour", "guten morgen"]),
    ("good night", ["buenas noches", "bonne nuit", "gute nacht"]),
];

pub const FORMAT_HINT: &str = "Please use the format: 'translate [text] to [language]'. \
     Supported languages: spanish, french, german";

pub struct TranslatorAgent {
    url: String,
}

impl TranslatorAgent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Answer a `translate <text> to <language>` request. Every outcome is a
    /// reply; the phrase book never fails a task.
    pub fn answer(&self, content: &str) -> String {
        let content = content.trim().to_lowercase();

        if content.contains("translate") {
            let parts: Vec<&str> = content.split(" to ").collect();
            if let [text, language] = parts.as_slice() {
                let text = text.replace("translate", "");
                return translate(text.trim(), language.trim());
            }
        }
        FORMAT_HINT.to_string()
    }
}

fn translate(text: &str, language: &str) -> String {
    let Some(column) = SUPPORTED_LANGUAGES.iter().position(|l| *l == language) else {
        return format!(
            "Sorry, I don't support translation to {}. Supported languages: {}",
            language,
            SUPPORTED_LANGUAGES.join(", ")
        );
    };

    if let Some((_, translations)) = PHRASE_BOOK.iter().find(|(phrase, _)| *phrase == text) {
        return format!("\"{}\" in {} is \"{}\"", text, language, translations[column]);
    }

    // Fall back to the known phrases that appear as whole words.
    let padded = format!(" {} ", text);
    let partial: Vec<String> = PHRASE_BOOK
        .iter()
        .filter(|(phrase, _)| padded.contains(&format!(" {} ", phrase)))
        .map(|(phrase, translations)| format!("{} = {}", phrase, translations[column]))
        .collect();
    if !partial.is_empty() {
        return format!("Partial translation: {}", partial.join(", "));
    }

    format!(
        "I don't have a translation for \"{}\" in {}. I know: {}",
        text,
        language,
        PHRASE_BOOK
            .iter()
            .map(|(phrase, _)| *phrase)
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[async_trait]
impl AgentHandler for TranslatorAgent {
    fn card(&self) -> AgentCard {
        AgentCard::new(
            TRANSLATOR_AGENT,
            "An agent that translates text between English and other languages",
            self.url.clone(),
            vec![
                Skill::text("translate", "Translate text from English to another language")
                    .with_parameter(
                        "text",
                        json!({"type": "string", "description": "Text to translate"}),
                    )
                    .with_parameter(
                        "target_language",
                        json!({
                            "type": "string",
                            "description": "Target language",
                            "enum": SUPPORTED_LANGUAGES
                        }),
                    ),
            ],
        )
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("translator"))
        .with_metadata("supported_languages", json!(SUPPORTED_LANGUAGES))
    }

    async fn handle(&self, task_id: &str, message: &TaskMessage) -> anyhow::Result<String> {
        tracing::debug!("TranslatorAgent: task {} asks {:?}", task_id, message.content);
        Ok(self.answer(&message.content))
    }
}
