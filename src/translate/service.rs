//! Translation Service
//!
//! Cleans OCR text, detects its language and walks the configured providers
//! until one of them answers.

use std::sync::Arc;
use std::time::Duration;

use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};

use super::{
    provider::TranslationProvider,
    types::{Translation, TranslationError, TranslationOutcome},
};
use crate::config::TranslationConfig;

/// Characters OCR engines commonly leave at the edges of a line
const EDGE_ARTIFACTS: &[char] = &['|', '_', '~', '`'];

/// Translator configuration
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub target_language: String,
    pub timeout: Duration,
    /// ISO 639-1 codes the language detector chooses between
    pub languages: Vec<String>,
}

impl TranslatorConfig {
    pub fn new(config: &TranslationConfig, languages: &[String]) -> Self {
        Self {
            target_language: config.target_language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            languages: languages.to_vec(),
        }
    }
}

/// Translates detected text to Arabic
pub struct Translator {
    config: TranslatorConfig,
    providers: Vec<Arc<dyn TranslationProvider>>,
    detector: LanguageDetector,
}

impl Translator {
    pub fn new(config: TranslatorConfig, providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        let mut languages: Vec<Language> = config
            .languages
            .iter()
            .filter_map(|code| lingua_language(code))
            .collect();
        // Arabic must be detectable for passthrough; English keeps the set
        // at two languages or more
        for required in [Language::Arabic, Language::English] {
            if !languages.contains(&required) {
                languages.push(required);
            }
        }

        let detector = LanguageDetectorBuilder::from_languages(&languages).build();

        Self {
            config,
            providers,
            detector,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// ISO 639-1 code of the detected language, if any
    pub fn detect_language(&self, text: &str) -> Option<String> {
        self.detector
            .detect_language_of(text)
            .map(|language| language.iso_code_639_1().to_string().to_lowercase())
    }

    /// Translate one text
    ///
    /// Text that is empty after cleaning, or already Arabic, comes back
    /// unchanged. Fails with [`TranslationError::Unavailable`] when every
    /// provider fails or times out.
    pub async fn translate(&self, text: &str) -> Result<Translation, TranslationError> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Ok(Translation::passthrough(text, text.to_string(), None));
        }

        let source = self.detect_language(&cleaned);
        if source.as_deref() == Some(self.config.target_language.as_str()) {
            tracing::debug!("Text already in target language, passing through");
            return Ok(Translation::passthrough(text, text.to_string(), source));
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            // Detection on short OCR fragments is unreliable, providers detect
            let call = provider.translate(&cleaned, None, &self.config.target_language);
            let result = match tokio::time::timeout(self.config.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(TranslationError::Timeout(self.config.timeout.as_secs())),
            };

            match result {
                Ok(translated) => {
                    return Ok(Translation {
                        original: text.to_string(),
                        text: translated.text,
                        source_language: source.or(translated.detected_language),
                        outcome: TranslationOutcome::Translated,
                        provider: Some(provider.name()),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Translation provider {} failed: {}, trying next",
                        provider.name(),
                        e
                    );
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no providers configured".to_string());
        }
        Err(TranslationError::Unavailable(failures.join("; ")))
    }

    /// Translate one text, substituting the cleaned original on failure
    pub async fn translate_or_original(&self, text: &str) -> Translation {
        match self.translate(text).await {
            Ok(translation) => translation,
            Err(e) => {
                tracing::warn!("Keeping original text: {}", e);
                Translation {
                    original: text.to_string(),
                    text: clean_text(text),
                    source_language: None,
                    outcome: TranslationOutcome::Fallback,
                    provider: None,
                }
            }
        }
    }
}

/// Remove control characters and OCR edge artifacts, collapse whitespace
pub fn clean_text(text: &str) -> String {
    let without_controls: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    without_controls
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| EDGE_ARTIFACTS.contains(&c) || c.is_whitespace())
        .to_string()
}

fn lingua_language(code: &str) -> Option<Language> {
    match code.to_lowercase().as_str() {
        "ar" => Some(Language::Arabic),
        "en" => Some(Language::English),
        "fr" => Some(Language::French),
        "es" => Some(Language::Spanish),
        "de" => Some(Language::German),
        "it" => Some(Language::Italian),
        "pt" => Some(Language::Portuguese),
        "ru" => Some(Language::Russian),
        "ja" => Some(Language::Japanese),
        "ko" => Some(Language::Korean),
        "zh" => Some(Language::Chinese),
        _ => None,
    }
}
